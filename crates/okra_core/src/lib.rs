//! Core domain logic for the Okra experiment server.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod keys;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::assignment::{AssignmentId, TaskAssignment};
pub use model::draft::{AssignedTaskDraft, AssignmentDraft, ExperimentDraft, RatingDraft, TaskDraft};
pub use model::experiment::{Experiment, ExperimentId, TaskType};
pub use model::participant::{Participant, ParticipantId, RegistrationState};
pub use model::task::{RatingId, RatingType, Task, TaskId, TaskRating};
pub use model::user::{User, UserId};
pub use model::validation::ValidationError;
pub use repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
pub use repo::experiment_repo::{ExperimentRepository, SqliteExperimentRepository, SyncReport};
pub use repo::participant_repo::{ParticipantRepository, SqliteParticipantRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::{
    AssignmentService, AssignmentServiceError, ParticipantExperiment,
    ParticipantExperimentDetail, StartedTask,
};
pub use service::auth_service::{AuthService, AuthServiceError, Session};
pub use service::experiment_service::{
    ExperimentDetail, ExperimentListItem, ExperimentService, ExperimentServiceError,
};
pub use service::participant_service::{
    ParticipantService, ParticipantServiceError, ParticipantSummary, RegistrationDetails,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
