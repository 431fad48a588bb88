//! Experiment use-case service.
//!
//! # Responsibility
//! - Create, read, synchronize and delete experiments through drafts.
//! - Shape the researcher-facing detail so a read can be posted back as-is.
//!
//! # Invariants
//! - `experiment_detail` lists every participant under `assignments`, with an
//!   empty task list for participants holding nothing in this experiment.

use crate::model::draft::{AssignedTaskDraft, AssignmentDraft, ExperimentDraft, RatingDraft, TaskDraft};
use crate::model::experiment::{ExperimentId, TaskType};
use crate::model::validation::ValidationError;
use crate::repo::experiment_repo::{ExperimentRepository, SyncReport};
use crate::repo::RepoError;
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for experiment use-cases.
#[derive(Debug)]
pub enum ExperimentServiceError {
    NotFound(ExperimentId),
    Validation(ValidationError),
    /// Draft assigns tasks to a participant that does not exist.
    UnknownParticipant(String),
    /// Draft reuses a task/rating id owned elsewhere.
    Conflict(String),
    Repo(RepoError),
}

impl Display for ExperimentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "experiment not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownParticipant(id) => write!(f, "unknown participant: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExperimentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ExperimentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::NotFound {
                entity: "participant",
                id,
            } => Self::UnknownParticipant(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ExperimentServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ExperimentServiceResult<T> = Result<T, ExperimentServiceError>;

/// Full editable view of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentDetail {
    pub id: ExperimentId,
    #[serde(flatten)]
    pub draft: ExperimentDraft,
}

/// Row of the researcher experiment overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentListItem {
    pub id: ExperimentId,
    pub task_type: TaskType,
    pub title: String,
    pub cover_image_url: Option<String>,
    pub n_tasks: u32,
    pub n_participants: u32,
}

/// Experiment service facade over repository implementations.
pub struct ExperimentService<R: ExperimentRepository> {
    repo: R,
}

impl<R: ExperimentRepository> ExperimentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an experiment from a full draft and returns its detail.
    pub fn create_experiment(
        &mut self,
        draft: &ExperimentDraft,
    ) -> ExperimentServiceResult<ExperimentDetail> {
        draft.validate()?;
        let id = Uuid::new_v4();
        self.repo.create_experiment(id, draft)?;
        self.experiment_detail(id)
    }

    /// Loads one experiment in draft shape.
    pub fn experiment_detail(&self, id: ExperimentId) -> ExperimentServiceResult<ExperimentDetail> {
        let experiment = self
            .repo
            .get_experiment(id)?
            .ok_or(ExperimentServiceError::NotFound(id))?;

        let practice_task = match experiment.practice_task_id {
            Some(task_id) => self.repo.get_task(task_id)?.map(|task| TaskDraft {
                id: task.id,
                label: task.label,
                data: task.data,
            }),
            None => None,
        };

        let tasks = self
            .repo
            .list_tasks(id)?
            .into_iter()
            .map(|task| TaskDraft {
                id: task.id,
                label: task.label,
                data: task.data,
            })
            .collect();

        let ratings = self
            .repo
            .list_ratings(id)?
            .into_iter()
            .map(|rating| RatingDraft {
                id: rating.id,
                question: rating.question,
                rating_type: rating.rating_type,
                low_extreme: rating.low_extreme,
                high_extreme: rating.high_extreme,
            })
            .collect();

        let mut by_participant: HashMap<Uuid, Vec<AssignedTaskDraft>> = HashMap::new();
        for assignment in self.repo.list_assignments(id)? {
            by_participant
                .entry(assignment.participant_id)
                .or_default()
                .push(AssignedTaskDraft {
                    id: assignment.task_id,
                    started: assignment.is_started(),
                });
        }
        let assignments = self
            .repo
            .list_participant_ids()?
            .into_iter()
            .map(|participant| AssignmentDraft {
                participant,
                tasks: by_participant.remove(&participant).unwrap_or_default(),
            })
            .collect();

        Ok(ExperimentDetail {
            id,
            draft: ExperimentDraft {
                task_type: experiment.task_type,
                title: experiment.title,
                cover_image_url: experiment.cover_image_url,
                instructions: experiment.instructions,
                practice_task,
                tasks,
                ratings,
                assignments,
            },
        })
    }

    /// Lists every experiment with its task and participant counts.
    pub fn list_experiments(&self) -> ExperimentServiceResult<Vec<ExperimentListItem>> {
        Ok(self
            .repo
            .list_experiments()?
            .into_iter()
            .map(|summary| ExperimentListItem {
                id: summary.experiment.id,
                task_type: summary.experiment.task_type,
                title: summary.experiment.title,
                cover_image_url: summary.experiment.cover_image_url,
                n_tasks: summary.n_tasks,
                n_participants: summary.n_participants,
            })
            .collect())
    }

    /// Blank draft for the editor, listing all participants unassigned.
    pub fn new_draft(&self) -> ExperimentServiceResult<ExperimentDraft> {
        let mut draft = ExperimentDraft::blank();
        draft.assignments = self
            .repo
            .list_participant_ids()?
            .into_iter()
            .map(|participant| AssignmentDraft {
                participant,
                tasks: Vec::new(),
            })
            .collect();
        Ok(draft)
    }

    /// Synchronizes the stored experiment with `draft` and returns the result.
    pub fn update_experiment(
        &mut self,
        id: ExperimentId,
        draft: &ExperimentDraft,
    ) -> ExperimentServiceResult<ExperimentDetail> {
        draft.validate()?;
        let report: SyncReport = match self.repo.sync_experiment(id, draft) {
            Err(RepoError::NotFound {
                entity: "experiment",
                ..
            }) => return Err(ExperimentServiceError::NotFound(id)),
            other => other?,
        };
        info!(
            "event=experiment_update module=service status=ok experiment_id={id} tasks_deleted={} assignments_deleted={}",
            report.tasks_deleted, report.assignments_deleted
        );
        self.experiment_detail(id)
    }

    pub fn delete_experiment(&self, id: ExperimentId) -> ExperimentServiceResult<()> {
        match self.repo.delete_experiment(id) {
            Err(RepoError::NotFound { .. }) => Err(ExperimentServiceError::NotFound(id)),
            other => Ok(other?),
        }
    }
}
