//! Participant use-case service.
//!
//! # Responsibility
//! - Create participants and expose their registration links.
//! - Drive the register/unregister transitions for devices.
//!
//! # Invariants
//! - A registration link stops resolving once the participant is registered.
//! - A registration key can be exchanged for a device key exactly once.

use crate::model::experiment::ExperimentId;
use crate::model::participant::{Participant, ParticipantId};
use crate::repo::participant_repo::ParticipantRepository;
use crate::repo::RepoError;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for participant use-cases.
#[derive(Debug)]
pub enum ParticipantServiceError {
    NotFound(ParticipantId),
    /// Registration link already consumed.
    AlreadyRegistered(ParticipantId),
    /// Presented registration key is not the participant's current key.
    InvalidRegistrationKey,
    /// No participant owns the presented device key.
    UnknownDeviceKey,
    Repo(RepoError),
}

impl Display for ParticipantServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "participant not found: {id}"),
            Self::AlreadyRegistered(id) => write!(f, "participant {id} is already registered"),
            Self::InvalidRegistrationKey => write!(f, "invalid registration key"),
            Self::UnknownDeviceKey => write!(f, "unknown device key"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParticipantServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ParticipantServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ParticipantServiceResult<T> = Result<T, ParticipantServiceError>;

/// Data behind a participant's registration link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetails {
    pub participant_id: ParticipantId,
    pub registration_key: String,
}

/// Participant list row for researchers. Never carries the device key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub registered: bool,
    pub registration_key: Option<String>,
    pub experiments: Vec<ExperimentId>,
}

/// Participant service facade over repository implementations.
pub struct ParticipantService<R: ParticipantRepository> {
    repo: R,
}

impl<R: ParticipantRepository> ParticipantService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one unregistered participant.
    pub fn create_participant(&self) -> ParticipantServiceResult<Participant> {
        let participant = Participant::new();
        self.repo.create_participant(&participant)?;
        info!(
            "event=participant_create module=service status=ok participant_id={}",
            participant.id
        );
        Ok(participant)
    }

    /// Resolves the registration link of an unregistered participant.
    pub fn registration_details(
        &self,
        id: ParticipantId,
    ) -> ParticipantServiceResult<RegistrationDetails> {
        let participant = self.load(id)?;
        match participant.registration_key {
            Some(registration_key) => Ok(RegistrationDetails {
                participant_id: id,
                registration_key,
            }),
            None => Err(ParticipantServiceError::AlreadyRegistered(id)),
        }
    }

    /// Exchanges a registration key for a device key.
    pub fn register_device(
        &self,
        id: ParticipantId,
        registration_key: &str,
    ) -> ParticipantServiceResult<String> {
        let mut participant = self.load(id)?;
        let Some(current_key) = participant.registration_key.clone() else {
            return Err(ParticipantServiceError::AlreadyRegistered(id));
        };
        if current_key != registration_key {
            info!(
                "event=participant_register module=service status=error participant_id={id} error_code=invalid_registration_key"
            );
            return Err(ParticipantServiceError::InvalidRegistrationKey);
        }

        participant.register();
        if !self.repo.claim_registration(&participant, &current_key)? {
            return Err(ParticipantServiceError::AlreadyRegistered(id));
        }

        info!("event=participant_register module=service status=ok participant_id={id}");
        participant
            .device_key
            .ok_or(ParticipantServiceError::AlreadyRegistered(id))
    }

    /// Drops the device pairing; returns the fresh registration key.
    pub fn unregister(&self, id: ParticipantId) -> ParticipantServiceResult<String> {
        let mut participant = self.load(id)?;
        participant.unregister();
        self.repo.save_keys(&participant)?;
        info!("event=participant_unregister module=service status=ok participant_id={id}");
        participant
            .registration_key
            .ok_or(ParticipantServiceError::NotFound(id))
    }

    /// Resolves the participant owning a device key.
    pub fn authenticate_device(&self, device_key: &str) -> ParticipantServiceResult<Participant> {
        self.repo
            .find_by_device_key(device_key)?
            .ok_or(ParticipantServiceError::UnknownDeviceKey)
    }

    pub fn get_participant(&self, id: ParticipantId) -> ParticipantServiceResult<Participant> {
        self.load(id)
    }

    /// Lists every participant with the experiments they take part in.
    pub fn list_participants(&self) -> ParticipantServiceResult<Vec<ParticipantSummary>> {
        let participants = self.repo.list_participants()?;
        let mut summaries = Vec::with_capacity(participants.len());
        for participant in participants {
            summaries.push(ParticipantSummary {
                id: participant.id,
                registered: participant.is_registered(),
                experiments: self.repo.experiment_ids_for(participant.id)?,
                registration_key: participant.registration_key,
            });
        }
        Ok(summaries)
    }

    pub fn delete_participant(&self, id: ParticipantId) -> ParticipantServiceResult<()> {
        match self.repo.delete_participant(id) {
            Err(RepoError::NotFound { .. }) => Err(ParticipantServiceError::NotFound(id)),
            other => Ok(other?),
        }
    }

    fn load(&self, id: ParticipantId) -> ParticipantServiceResult<Participant> {
        self.repo
            .get_participant(id)?
            .ok_or(ParticipantServiceError::NotFound(id))
    }
}
