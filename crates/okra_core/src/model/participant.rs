//! Participant domain model.
//!
//! # Responsibility
//! - Hold participant identity plus device/registration key state.
//! - Provide the only two registration transitions.
//!
//! # Invariants
//! - Exactly one of `device_key` and `registration_key` is set.
//! - `register` on a registered participant keeps its device key.
//! - `unregister` always issues a fresh registration key.

use crate::keys::{random_key, KEY_LENGTH};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ParticipantId = Uuid;

/// Derived registration state of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    /// Holds a registration key waiting to be claimed by a device.
    Unregistered,
    /// Paired with a device that holds the device key.
    Registered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub device_key: Option<String>,
    pub registration_key: Option<String>,
}

impl Participant {
    /// Creates an unregistered participant with a generated id and key.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            device_key: None,
            registration_key: Some(random_key(KEY_LENGTH)),
        }
    }

    /// Pairs the participant with a device.
    pub fn register(&mut self) {
        if self.device_key.is_none() {
            self.device_key = Some(random_key(KEY_LENGTH));
        }
        self.registration_key = None;
    }

    /// Drops the device pairing and issues a new registration key.
    pub fn unregister(&mut self) {
        self.device_key = None;
        self.registration_key = Some(random_key(KEY_LENGTH));
    }

    pub fn is_registered(&self) -> bool {
        self.device_key.is_some()
    }

    pub fn state(&self) -> RegistrationState {
        if self.is_registered() {
            RegistrationState::Registered
        } else {
            RegistrationState::Unregistered
        }
    }

    /// Checks the key exclusivity invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        match (&self.device_key, &self.registration_key) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(ValidationError::ParticipantKeyState {
                participant_id: self.id,
            }),
        }
    }
}

impl Default for Participant {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.state() {
            RegistrationState::Registered => "Registered",
            RegistrationState::Unregistered => "Unregistered",
        };
        write!(f, "{label} Participant \"{}\"", self.id)
    }
}
