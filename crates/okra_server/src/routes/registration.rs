//! Public registration link target.

use super::{with_participant_service, ApiResult};
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::Json;
use okra_core::{ParticipantId, RegistrationDetails};

/// Data a device needs to claim the participant; 404 once claimed.
pub(super) async fn details(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> ApiResult<Json<RegistrationDetails>> {
    with_participant_service(&state, |service| Ok(Json(service.registration_details(id)?)))
}
