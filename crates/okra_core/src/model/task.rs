//! Task and task-rating domain models.
//!
//! Task `data` is an opaque JSON payload whose shape depends on the owning
//! experiment's task type; this layer never inspects it.

use crate::model::experiment::ExperimentId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type TaskId = Uuid;
pub type RatingId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// `None` for a practice task, which hangs off `Experiment::practice_task_id`.
    pub experiment_id: Option<ExperimentId>,
    pub label: String,
    pub data: Value,
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        Ok(())
    }
}

/// Widget used to collect a rating after each task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingType {
    Emoticon,
    Radio,
    Slider,
}

impl RatingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emoticon => "emoticon",
            Self::Radio => "radio",
            Self::Slider => "slider",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "emoticon" => Some(Self::Emoticon),
            "radio" => Some(Self::Radio),
            "slider" => Some(Self::Slider),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRating {
    pub id: RatingId,
    pub experiment_id: ExperimentId,
    pub question: String,
    pub rating_type: RatingType,
    pub low_extreme: Option<String>,
    pub high_extreme: Option<String>,
}

impl TaskRating {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.question.trim().is_empty() {
            return Err(ValidationError::BlankQuestion);
        }
        Ok(())
    }
}
