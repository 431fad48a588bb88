//! Researcher experiment views.

use super::{with_experiment_service, ApiResult};
use crate::session::CurrentUser;
use crate::state::SharedState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;
use okra_core::{ExperimentDetail, ExperimentDraft, ExperimentId, ExperimentListItem};
use serde_json::{json, Value};

pub(super) async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<ExperimentListItem>>> {
    with_experiment_service(&state, |service| Ok(Json(service.list_experiments()?)))
}

pub(super) async fn create(
    State(state): State<SharedState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<ExperimentDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ExperimentDetail>)> {
    let Json(draft) = payload?;
    let detail = with_experiment_service(&state, |service| Ok(service.create_experiment(&draft)?))?;
    info!(
        "event=experiment_create module=http status=ok experiment_id={} user_id={}",
        detail.id, user.id
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

pub(super) async fn new_draft(State(state): State<SharedState>) -> ApiResult<Json<ExperimentDraft>> {
    with_experiment_service(&state, |service| Ok(Json(service.new_draft()?)))
}

pub(super) async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<ExperimentId>,
) -> ApiResult<Json<ExperimentDetail>> {
    with_experiment_service(&state, |service| Ok(Json(service.experiment_detail(id)?)))
}

pub(super) async fn update(
    State(state): State<SharedState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<ExperimentId>,
    payload: Result<Json<ExperimentDraft>, JsonRejection>,
) -> ApiResult<Json<ExperimentDetail>> {
    let Json(draft) = payload?;
    let detail =
        with_experiment_service(&state, |service| Ok(service.update_experiment(id, &draft)?))?;
    info!(
        "event=experiment_update module=http status=ok experiment_id={id} user_id={}",
        user.id
    );
    Ok(Json(detail))
}

pub(super) async fn delete(
    State(state): State<SharedState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<ExperimentId>,
) -> ApiResult<Json<Value>> {
    with_experiment_service(&state, |service| Ok(service.delete_experiment(id)?))?;
    info!(
        "event=experiment_delete module=http status=ok experiment_id={id} user_id={}",
        user.id
    );
    Ok(Json(json!({ "id": id, "deleted": true })))
}
