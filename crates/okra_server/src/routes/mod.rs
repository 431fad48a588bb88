//! HTTP routing.
//!
//! # Responsibility
//! - Assemble public, researcher and device routes into one `Router`.
//! - Run each use case against the shared connection via `with_*` helpers.
//!
//! # Invariants
//! - Researcher routes sit behind `require_login`; device routes take the
//!   `Device` extractor; everything else is public.

mod auth;
mod device;
mod experiments;
mod health;
mod participants;
mod registration;

use crate::error::ApiError;
use crate::session::require_login;
use crate::state::SharedState;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use okra_core::{
    AssignmentService, ExperimentService, ParticipantService, SqliteAssignmentRepository,
    SqliteExperimentRepository, SqliteParticipantRepository,
};
use std::time::Instant;

/// Builds the application router over `state`.
pub fn build_router(state: SharedState) -> Router {
    let researcher = Router::new()
        .route(
            "/experiments",
            get(experiments::list).post(experiments::create),
        )
        .route("/experiments/new", get(experiments::new_draft))
        .route(
            "/experiments/{id}",
            get(experiments::detail).post(experiments::update),
        )
        .route("/experiments/{id}/delete", post(experiments::delete))
        .route(
            "/participants",
            get(participants::list).post(participants::create),
        )
        .route(
            "/participants/{id}/unregister",
            post(participants::unregister),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let device = Router::new()
        .route("/api/register", post(device::register))
        .route("/api/experiments", get(device::experiments))
        .route("/api/experiments/{id}", get(device::experiment))
        .route("/api/experiments/{id}/start", post(device::start_task))
        .route("/api/tasks/{id}/finish", post(device::finish_task))
        .route("/api/unregister", post(device::unregister));

    Router::new()
        .route("/health", get(health::health))
        .route("/registration/{id}", get(registration::details))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .merge(researcher)
        .merge(device)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "event=http_request module=http status={} method={} path={} elapsed_ms={}",
        response.status().as_u16(),
        method,
        path,
        started.elapsed().as_millis()
    );
    response
}

type ApiResult<T> = Result<T, ApiError>;

fn with_participant_service<T>(
    state: &SharedState,
    f: impl for<'c> FnOnce(&ParticipantService<SqliteParticipantRepository<'c>>) -> ApiResult<T>,
) -> ApiResult<T> {
    state.with_db(|conn| {
        let service = ParticipantService::new(SqliteParticipantRepository::try_new(conn)?);
        f(&service)
    })
}

fn with_experiment_service<T>(
    state: &SharedState,
    f: impl for<'c> FnOnce(&mut ExperimentService<SqliteExperimentRepository<'c>>) -> ApiResult<T>,
) -> ApiResult<T> {
    state.with_db(|conn| {
        let mut service = ExperimentService::new(SqliteExperimentRepository::try_new(conn)?);
        f(&mut service)
    })
}

fn with_assignment_service<T>(
    state: &SharedState,
    f: impl for<'c> FnOnce(&mut AssignmentService<SqliteAssignmentRepository<'c>>) -> ApiResult<T>,
) -> ApiResult<T> {
    state.with_db(|conn| {
        let mut service = AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?);
        f(&mut service)
    })
}
