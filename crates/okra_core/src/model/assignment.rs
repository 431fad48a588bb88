//! Task assignment domain model.
//!
//! # Responsibility
//! - Bind one participant to one task and track its progress.
//!
//! # Invariants
//! - `(participant_id, task_id)` is unique in storage.
//! - A task is available to its participant only while `started_time` is unset.
//! - Only a started assignment can be finished.
//! - Timestamps are Unix epoch milliseconds.

use crate::model::participant::ParticipantId;
use crate::model::task::TaskId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage-assigned, monotonically increasing id. Also the hand-out order.
pub type AssignmentId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub id: AssignmentId,
    pub participant_id: ParticipantId,
    pub task_id: TaskId,
    pub results: Option<Value>,
    pub started_time: Option<i64>,
    pub finished_time: Option<i64>,
}

impl TaskAssignment {
    /// Marks the assignment as handed out at `now_ms`.
    pub fn start(&mut self, now_ms: i64) {
        self.started_time = Some(now_ms);
    }

    /// Stores results and marks the assignment finished at `now_ms`, never
    /// earlier than its start stamp.
    pub fn finish(&mut self, results: Value, now_ms: i64) {
        self.results = Some(results);
        self.finished_time = Some(self.started_time.map_or(now_ms, |started| now_ms.max(started)));
    }

    pub fn is_available(&self) -> bool {
        self.started_time.is_none()
    }

    pub fn is_started(&self) -> bool {
        self.started_time.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_time.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(started), Some(finished)) = (self.started_time, self.finished_time) {
            if finished < started {
                return Err(ValidationError::FinishedBeforeStarted);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TaskAssignment;
    use serde_json::json;
    use uuid::Uuid;

    fn assignment() -> TaskAssignment {
        TaskAssignment {
            id: 1,
            participant_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            results: None,
            started_time: None,
            finished_time: None,
        }
    }

    #[test]
    fn finish_never_precedes_start() {
        let mut assignment = assignment();
        assignment.start(2_000);
        assignment.finish(json!({"answer": 1}), 1_500);
        assert_eq!(assignment.finished_time, Some(2_000));
        assert!(assignment.validate().is_ok());
    }

    #[test]
    fn finish_keeps_a_later_clock() {
        let mut assignment = assignment();
        assignment.start(2_000);
        assignment.finish(json!({}), 2_750);
        assert_eq!(assignment.finished_time, Some(2_750));
        assert!(assignment.is_finished());
        assert!(!assignment.is_available());
    }
}
