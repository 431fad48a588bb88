//! HTTP surface of the Okra experiment server.
//!
//! Researchers manage experiments and participants through session-gated
//! JSON views; participant devices use the bearer-authenticated `/api` routes.

pub mod config;
pub mod error;
pub mod session;
pub mod state;

mod routes;

pub use config::Args;
pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, SharedState};
