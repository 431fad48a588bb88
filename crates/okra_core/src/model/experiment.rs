//! Experiment domain model.
//!
//! # Responsibility
//! - Define experiment scalar fields and the task-type vocabulary.
//! - Validate title and cover image URL before persistence.
//!
//! # Invariants
//! - `title` is non-blank and at most `TITLE_MAX_CHARS` characters.
//! - `cover_image_url`, when set, is an absolute http(s) URL.
//! - Child tasks/ratings are owned rows; see `repo::experiment_repo`.

use crate::model::task::TaskId;
use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ExperimentId = Uuid;

pub const TITLE_MAX_CHARS: usize = 100;

static COVER_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9.-]+(:[0-9]{1,5})?(/\S*)?$").expect("valid cover url regex")
});

/// Kind of task every item of an experiment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    Cloze,
    LexicalDecision,
    PictureNaming,
    QuestionAnswering,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Cloze,
        TaskType::LexicalDecision,
        TaskType::PictureNaming,
        TaskType::QuestionAnswering,
    ];

    /// Storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cloze => "cloze",
            Self::LexicalDecision => "lexical-decision",
            Self::PictureNaming => "picture-naming",
            Self::QuestionAnswering => "question-answering",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: ExperimentId,
    pub task_type: TaskType,
    pub title: String,
    pub cover_image_url: Option<String>,
    pub instructions: String,
    pub practice_task_id: Option<TaskId>,
}

impl Experiment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        validate_title(&self.title)?;
        validate_cover_image_url(self.cover_image_url.as_deref())
    }
}

impl std::fmt::Display for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Experiment \"{}\" ({})", self.title, self.task_type.as_str())
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max_chars: TITLE_MAX_CHARS,
        });
    }
    Ok(())
}

pub(crate) fn validate_cover_image_url(url: Option<&str>) -> Result<(), ValidationError> {
    match url {
        Some(value) if !COVER_URL_RE.is_match(value) => {
            Err(ValidationError::InvalidCoverImageUrl(value.to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_cover_image_url, TaskType};

    #[test]
    fn task_type_wire_values_roundtrip() {
        for kind in TaskType::ALL {
            assert_eq!(TaskType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TaskType::parse("essay"), None);
    }

    #[test]
    fn cover_url_accepts_http_and_rejects_other_schemes() {
        assert!(validate_cover_image_url(Some("https://cdn.example.org/a.png")).is_ok());
        assert!(validate_cover_image_url(Some("http://localhost:8000/cover.jpg")).is_ok());
        assert!(validate_cover_image_url(Some("ftp://example.org/a.png")).is_err());
        assert!(validate_cover_image_url(Some("not a url")).is_err());
        assert!(validate_cover_image_url(None).is_ok());
    }
}
