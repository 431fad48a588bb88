//! Editable experiment shape used by create, detail and synchronizing update.
//!
//! # Responsibility
//! - Carry experiment scalars plus the full target child lists.
//! - Validate everything that can be checked without storage.
//!
//! # Invariants
//! - List order is the persisted order (`position` = index).
//! - Omitted child ids are generated, so such rows are always created.
//! - Field names on the wire are camelCase; rating kind travels as `type`.

use crate::model::experiment::{validate_cover_image_url, validate_title, TaskType};
use crate::model::participant::ParticipantId;
use crate::model::task::{RatingId, RatingType, TaskId};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDraft {
    pub task_type: TaskType,
    pub title: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub practice_task: Option<TaskDraft>,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
    #[serde(default)]
    pub ratings: Vec<RatingDraft>,
    #[serde(default)]
    pub assignments: Vec<AssignmentDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default = "Uuid::new_v4")]
    pub id: TaskId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDraft {
    #[serde(default = "Uuid::new_v4")]
    pub id: RatingId,
    pub question: String,
    #[serde(rename = "type")]
    pub rating_type: RatingType,
    #[serde(default)]
    pub low_extreme: Option<String>,
    #[serde(default)]
    pub high_extreme: Option<String>,
}

/// Target task set for one participant within the experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    pub participant: ParticipantId,
    #[serde(default)]
    pub tasks: Vec<AssignedTaskDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedTaskDraft {
    pub id: TaskId,
    /// Reported on read; ignored on write, existing progress is preserved.
    #[serde(default)]
    pub started: bool,
}

impl ExperimentDraft {
    /// Blank draft used by the "new experiment" editor.
    pub fn blank() -> Self {
        Self {
            task_type: TaskType::Cloze,
            title: String::new(),
            cover_image_url: None,
            instructions: String::new(),
            practice_task: None,
            tasks: Vec::new(),
            ratings: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Ids of every task the draft wants to keep, practice task included.
    pub fn all_task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.practice_task
            .iter()
            .chain(self.tasks.iter())
            .map(|task| task.id)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_cover_image_url(self.cover_image_url.as_deref())?;

        let mut task_ids = HashSet::new();
        for id in self.all_task_ids() {
            if id.is_nil() {
                return Err(ValidationError::NilId);
            }
            if !task_ids.insert(id) {
                return Err(ValidationError::DuplicateTask(id));
            }
        }

        let mut rating_ids = HashSet::new();
        for rating in &self.ratings {
            if rating.id.is_nil() {
                return Err(ValidationError::NilId);
            }
            if !rating_ids.insert(rating.id) {
                return Err(ValidationError::DuplicateRating(rating.id));
            }
            if rating.question.trim().is_empty() {
                return Err(ValidationError::BlankQuestion);
            }
        }

        let main_task_ids: HashSet<TaskId> = self.tasks.iter().map(|task| task.id).collect();
        let mut participants = HashSet::new();
        for assignment in &self.assignments {
            if !participants.insert(assignment.participant) {
                return Err(ValidationError::DuplicateParticipant(
                    assignment.participant,
                ));
            }
            let mut assigned = HashSet::new();
            for task in &assignment.tasks {
                if !main_task_ids.contains(&task.id) {
                    return Err(ValidationError::UnknownAssignedTask(task.id));
                }
                if !assigned.insert(task.id) {
                    return Err(ValidationError::DuplicateTask(task.id));
                }
            }
        }

        Ok(())
    }
}
