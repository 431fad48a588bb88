//! Researcher participant views.

use super::{with_participant_service, ApiResult};
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use okra_core::{ParticipantId, ParticipantSummary, RegistrationDetails};
use serde::Serialize;

/// Response for a freshly created participant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreatedParticipant {
    id: ParticipantId,
    registration_key: String,
    registration_url: String,
}

pub(super) async fn list(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<ParticipantSummary>>> {
    with_participant_service(&state, |service| Ok(Json(service.list_participants()?)))
}

pub(super) async fn create(
    State(state): State<SharedState>,
) -> ApiResult<(StatusCode, Json<CreatedParticipant>)> {
    let details = with_participant_service(&state, |service| {
        let participant = service.create_participant()?;
        Ok(service.registration_details(participant.id)?)
    })?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedParticipant {
            registration_url: format!("/registration/{}", details.participant_id),
            id: details.participant_id,
            registration_key: details.registration_key,
        }),
    ))
}

pub(super) async fn unregister(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> ApiResult<Json<RegistrationDetails>> {
    with_participant_service(&state, |service| {
        let registration_key = service.unregister(id)?;
        Ok(Json(RegistrationDetails {
            participant_id: id,
            registration_key,
        }))
    })
}
