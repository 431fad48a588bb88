//! Domain model for experiments, participants and their assignments.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep invariant checks next to the data they protect.
//!
//! # Invariants
//! - Every row-backed object is identified by a non-nil UUID, except
//!   assignments, whose integer id doubles as hand-out order.
//! - Models never touch storage; repositories call `validate()` before writes.

pub mod assignment;
pub mod draft;
pub mod experiment;
pub mod participant;
pub mod task;
pub mod user;
pub mod validation;
