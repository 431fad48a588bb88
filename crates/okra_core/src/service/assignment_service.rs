//! Participant-side task workflow.
//!
//! # Responsibility
//! - Report per-experiment progress for one participant.
//! - Hand out tasks in assignment order and accept results.
//!
//! # Invariants
//! - A participant only sees experiments in which it holds assignments.
//! - `start_task` never hands out the same assignment twice.

use crate::model::assignment::TaskAssignment;
use crate::model::draft::{RatingDraft, TaskDraft};
use crate::model::experiment::{ExperimentId, TaskType};
use crate::model::participant::ParticipantId;
use crate::model::task::{Task, TaskId};
use crate::repo::assignment_repo::{AssignmentRepository, ExperimentProgress};
use crate::repo::RepoError;
use crate::service::now_epoch_ms;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for the participant task workflow.
#[derive(Debug)]
pub enum AssignmentServiceError {
    /// Experiment unknown, or the participant holds no assignments in it.
    ExperimentNotFound(ExperimentId),
    /// Every assignment of the participant in the experiment has been started.
    NoTasksAvailable(ExperimentId),
    /// No unfinished assignment of the participant for the task.
    AssignmentNotFound(TaskId),
    Repo(RepoError),
}

impl Display for AssignmentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExperimentNotFound(id) => write!(f, "experiment not found: {id}"),
            Self::NoTasksAvailable(_) => write!(f, "no tasks available"),
            Self::AssignmentNotFound(id) => write!(f, "no open assignment for task {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssignmentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignmentServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type AssignmentServiceResult<T> = Result<T, AssignmentServiceError>;

/// One experiment card on the participant's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantExperiment {
    pub id: ExperimentId,
    pub task_type: TaskType,
    pub title: String,
    pub cover_image_url: Option<String>,
    pub n_tasks: u32,
    pub n_tasks_done: u32,
}

impl From<ExperimentProgress> for ParticipantExperiment {
    fn from(value: ExperimentProgress) -> Self {
        Self {
            id: value.experiment.id,
            task_type: value.experiment.task_type,
            title: value.experiment.title,
            cover_image_url: value.experiment.cover_image_url,
            n_tasks: value.n_tasks,
            n_tasks_done: value.n_tasks_done,
        }
    }
}

/// Everything a device needs before running an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantExperimentDetail {
    #[serde(flatten)]
    pub summary: ParticipantExperiment,
    pub instructions: String,
    pub practice_task: Option<TaskDraft>,
    pub ratings: Vec<RatingDraft>,
}

/// Task handed out by `start_task`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedTask {
    pub id: TaskId,
    pub label: String,
    pub data: Value,
}

impl From<Task> for StartedTask {
    fn from(value: Task) -> Self {
        Self {
            id: value.id,
            label: value.label,
            data: value.data,
        }
    }
}

/// Assignment service facade over repository implementations.
pub struct AssignmentService<R: AssignmentRepository> {
    repo: R,
}

impl<R: AssignmentRepository> AssignmentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Number of tasks assigned to the participant within the experiment.
    pub fn n_tasks(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<u32> {
        Ok(self.repo.count_assignments(experiment_id, participant_id)?)
    }

    /// Number of those tasks already handed out.
    pub fn n_tasks_done(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<u32> {
        Ok(self.repo.count_started(experiment_id, participant_id)?)
    }

    pub fn experiments_for(
        &self,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<Vec<ParticipantExperiment>> {
        Ok(self
            .repo
            .experiments_for(participant_id)?
            .into_iter()
            .map(ParticipantExperiment::from)
            .collect())
    }

    /// Loads one experiment as the participant sees it.
    pub fn experiment_for(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<ParticipantExperimentDetail> {
        let progress = self
            .repo
            .experiments_for(participant_id)?
            .into_iter()
            .find(|progress| progress.experiment.id == experiment_id)
            .ok_or(AssignmentServiceError::ExperimentNotFound(experiment_id))?;

        let practice_task = self
            .repo
            .practice_task(experiment_id)?
            .map(|task| TaskDraft {
                id: task.id,
                label: task.label,
                data: task.data,
            });
        let ratings = self
            .repo
            .list_ratings(experiment_id)?
            .into_iter()
            .map(|rating| RatingDraft {
                id: rating.id,
                question: rating.question,
                rating_type: rating.rating_type,
                low_extreme: rating.low_extreme,
                high_extreme: rating.high_extreme,
            })
            .collect();

        Ok(ParticipantExperimentDetail {
            instructions: progress.experiment.instructions.clone(),
            summary: progress.into(),
            practice_task,
            ratings,
        })
    }

    /// Hands out the participant's next unstarted task in assignment order.
    pub fn start_task(
        &mut self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<StartedTask> {
        match self
            .repo
            .start_next(experiment_id, participant_id, now_epoch_ms())?
        {
            Some((assignment, task)) => {
                info!(
                    "event=task_start module=service status=ok experiment_id={experiment_id} participant_id={participant_id} assignment_id={}",
                    assignment.id
                );
                Ok(task.into())
            }
            None => {
                info!(
                    "event=task_start module=service status=error experiment_id={experiment_id} participant_id={participant_id} error_code=no_tasks_available"
                );
                Err(AssignmentServiceError::NoTasksAvailable(experiment_id))
            }
        }
    }

    /// Stores results on the participant's started, unfinished assignment for
    /// the task.
    pub fn finish_task(
        &mut self,
        task_id: TaskId,
        participant_id: ParticipantId,
        results: &Value,
    ) -> AssignmentServiceResult<TaskAssignment> {
        let assignment = self
            .repo
            .finish_open(task_id, participant_id, results, now_epoch_ms())?
            .ok_or(AssignmentServiceError::AssignmentNotFound(task_id))?;
        info!(
            "event=task_finish module=service status=ok participant_id={participant_id} assignment_id={}",
            assignment.id
        );
        Ok(assignment)
    }

    /// The participant's assignments within the experiment, by id.
    pub fn assignments_for(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> AssignmentServiceResult<Vec<TaskAssignment>> {
        Ok(self.repo.list_assignments(experiment_id, participant_id)?)
    }
}
