//! Model-level invariant violations.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Invariant violation detected before a model reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Stable ids must never be the nil UUID.
    NilId,
    /// Participant carries both keys or neither key.
    ParticipantKeyState { participant_id: Uuid },
    /// Experiment title is blank after trim.
    BlankTitle,
    /// Experiment title exceeds the column limit.
    TitleTooLong { max_chars: usize },
    /// Cover image URL is not an absolute http(s) URL.
    InvalidCoverImageUrl(String),
    /// Rating question is blank after trim.
    BlankQuestion,
    /// `finished_time` is earlier than `started_time`.
    FinishedBeforeStarted,
    /// Same task id listed twice (including practice task).
    DuplicateTask(Uuid),
    /// Same rating id listed twice.
    DuplicateRating(Uuid),
    /// Same participant listed twice in assignments.
    DuplicateParticipant(Uuid),
    /// Assignment references a task outside the experiment's task list.
    UnknownAssignedTask(Uuid),
    /// Username is blank or contains whitespace.
    InvalidUsername,
    /// Password is shorter than the minimum length.
    PasswordTooShort { min_chars: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "id must not be nil"),
            Self::ParticipantKeyState { participant_id } => write!(
                f,
                "participant {participant_id} must have exactly one of device key and registration key"
            ),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "title must be at most {max_chars} characters")
            }
            Self::InvalidCoverImageUrl(url) => write!(f, "invalid cover image url `{url}`"),
            Self::BlankQuestion => write!(f, "rating question must not be blank"),
            Self::FinishedBeforeStarted => {
                write!(f, "finished_time must not be earlier than started_time")
            }
            Self::DuplicateTask(id) => write!(f, "task {id} is listed more than once"),
            Self::DuplicateRating(id) => write!(f, "rating {id} is listed more than once"),
            Self::DuplicateParticipant(id) => {
                write!(f, "participant {id} is listed more than once in assignments")
            }
            Self::UnknownAssignedTask(id) => {
                write!(f, "assigned task {id} is not in the experiment's task list")
            }
            Self::InvalidUsername => write!(f, "username must be non-blank without whitespace"),
            Self::PasswordTooShort { min_chars } => {
                write!(f, "password must be at least {min_chars} characters")
            }
        }
    }
}

impl Error for ValidationError {}
