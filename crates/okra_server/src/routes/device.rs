//! Participant device API.
//!
//! Every route except `register` authenticates with the device key.

use super::{with_assignment_service, with_participant_service, ApiResult};
use crate::session::Device;
use crate::state::SharedState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use okra_core::{
    ExperimentId, ParticipantExperiment, ParticipantExperimentDetail, ParticipantId, StartedTask,
    TaskAssignment, TaskId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterRequest {
    participant_id: ParticipantId,
    registration_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterResponse {
    participant_id: ParticipantId,
    device_key: String,
}

#[derive(Deserialize)]
pub(super) struct FinishRequest {
    #[serde(default)]
    results: Value,
}

pub(super) async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(request) = payload?;
    let device_key = with_participant_service(&state, |service| {
        Ok(service.register_device(request.participant_id, &request.registration_key)?)
    })?;
    Ok(Json(RegisterResponse {
        participant_id: request.participant_id,
        device_key,
    }))
}

pub(super) async fn experiments(
    State(state): State<SharedState>,
    Device(participant): Device,
) -> ApiResult<Json<Vec<ParticipantExperiment>>> {
    with_assignment_service(&state, |service| {
        Ok(Json(service.experiments_for(participant.id)?))
    })
}

pub(super) async fn experiment(
    State(state): State<SharedState>,
    Device(participant): Device,
    Path(id): Path<ExperimentId>,
) -> ApiResult<Json<ParticipantExperimentDetail>> {
    with_assignment_service(&state, |service| {
        Ok(Json(service.experiment_for(id, participant.id)?))
    })
}

pub(super) async fn start_task(
    State(state): State<SharedState>,
    Device(participant): Device,
    Path(id): Path<ExperimentId>,
) -> ApiResult<Json<StartedTask>> {
    with_assignment_service(&state, |service| {
        Ok(Json(service.start_task(id, participant.id)?))
    })
}

pub(super) async fn finish_task(
    State(state): State<SharedState>,
    Device(participant): Device,
    Path(id): Path<TaskId>,
    payload: Result<Json<FinishRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAssignment>> {
    let Json(request) = payload?;
    with_assignment_service(&state, |service| {
        Ok(Json(service.finish_task(id, participant.id, &request.results)?))
    })
}

/// Device signs out; the participant gets a fresh registration link.
pub(super) async fn unregister(
    State(state): State<SharedState>,
    Device(participant): Device,
) -> ApiResult<Json<Value>> {
    with_participant_service(&state, |service| {
        service.unregister(participant.id)?;
        Ok(Json(json!({ "participantId": participant.id, "registered": false })))
    })
}
