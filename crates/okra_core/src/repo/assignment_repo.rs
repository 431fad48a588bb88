//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Serve the participant-side task workflow: progress counts, next-task
//!   hand-out and result submission.
//!
//! # Invariants
//! - Hand-out order is ascending assignment id within one experiment.
//! - Selecting and stamping the next assignment happen in one immediate
//!   transaction, so one assignment is never handed out twice.
//! - Only assignments with `finished_time IS NULL` accept results.

use crate::model::assignment::TaskAssignment;
use crate::model::experiment::{Experiment, ExperimentId};
use crate::model::participant::ParticipantId;
use crate::model::task::{Task, TaskId, TaskRating};
use crate::repo::experiment_repo::{
    parse_assignment_row, parse_experiment_row, parse_rating_row, parse_task_row,
    ASSIGNMENT_SELECT_SQL, RATING_SELECT_SQL, TASK_SELECT_SQL,
};
use crate::repo::{encode_json, ensure_connection_ready, is_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, TransactionBehavior};
use serde_json::Value;

/// One experiment as seen by a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentProgress {
    pub experiment: Experiment,
    pub n_tasks: u32,
    pub n_tasks_done: u32,
}

/// Repository interface for the participant task workflow.
pub trait AssignmentRepository {
    /// Assigns one task to one participant, unstarted.
    fn create_assignment(
        &self,
        participant_id: ParticipantId,
        task_id: TaskId,
    ) -> RepoResult<TaskAssignment>;
    /// The participant's assignments within one experiment, by id.
    fn list_assignments(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<Vec<TaskAssignment>>;
    fn count_assignments(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<u32>;
    /// Assignments with `started_time` set.
    fn count_started(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<u32>;
    /// Experiments in which the participant holds assignments, with counts.
    fn experiments_for(&self, participant_id: ParticipantId)
        -> RepoResult<Vec<ExperimentProgress>>;
    /// The experiment's practice task, if it has one.
    fn practice_task(&self, experiment_id: ExperimentId) -> RepoResult<Option<Task>>;
    /// Ratings shown after each task, in list order.
    fn list_ratings(&self, experiment_id: ExperimentId) -> RepoResult<Vec<TaskRating>>;
    /// Stamps the first unstarted assignment and returns it with its task.
    /// `None` when every assignment has been started.
    fn start_next(
        &mut self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
        now_ms: i64,
    ) -> RepoResult<Option<(TaskAssignment, Task)>>;
    /// Stores results on the participant's started, unfinished assignment for
    /// `task_id`. `None` when there is no such assignment.
    fn finish_open(
        &mut self,
        task_id: TaskId,
        participant_id: ParticipantId,
        results: &Value,
        now_ms: i64,
    ) -> RepoResult<Option<TaskAssignment>>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(
        &self,
        participant_id: ParticipantId,
        task_id: TaskId,
    ) -> RepoResult<TaskAssignment> {
        let inserted = self.conn.execute(
            "INSERT INTO task_assignments (participant_id, task_id) VALUES (?1, ?2);",
            params![participant_id.to_string(), task_id.to_string()],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::Conflict(format!(
                    "task {task_id} is already assigned to participant {participant_id}"
                )));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(TaskAssignment {
            id: self.conn.last_insert_rowid(),
            participant_id,
            task_id,
            results: None,
            started_time: None,
            finished_time: None,
        })
    }

    fn list_assignments(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<Vec<TaskAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE t.experiment_id = ?1
               AND a.participant_id = ?2
             ORDER BY a.id ASC;"
        ))?;
        let mut rows = stmt.query([experiment_id.to_string(), participant_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn count_assignments(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM task_assignments a
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE t.experiment_id = ?1
               AND a.participant_id = ?2;",
            [experiment_id.to_string(), participant_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_started(
        &self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
    ) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM task_assignments a
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE t.experiment_id = ?1
               AND a.participant_id = ?2
               AND a.started_time IS NOT NULL;",
            [experiment_id.to_string(), participant_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn experiments_for(
        &self,
        participant_id: ParticipantId,
    ) -> RepoResult<Vec<ExperimentProgress>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                e.id,
                e.task_type,
                e.title,
                e.cover_image_url,
                e.instructions,
                e.practice_task_id,
                COUNT(a.id) AS n_tasks,
                COUNT(a.started_time) AS n_tasks_done
             FROM experiments e
             INNER JOIN tasks t ON t.experiment_id = e.id
             INNER JOIN task_assignments a ON a.task_id = t.id
             WHERE a.participant_id = ?1
             GROUP BY e.id
             ORDER BY e.created_at ASC, e.rowid ASC;",
        )?;
        let mut rows = stmt.query([participant_id.to_string()])?;
        let mut experiments = Vec::new();
        while let Some(row) = rows.next()? {
            experiments.push(ExperimentProgress {
                experiment: parse_experiment_row(row)?,
                n_tasks: row.get("n_tasks")?,
                n_tasks_done: row.get("n_tasks_done")?,
            });
        }
        Ok(experiments)
    }

    fn practice_task(&self, experiment_id: ExperimentId) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             INNER JOIN experiments e ON e.practice_task_id = t.id
             WHERE e.id = ?1;"
        ))?;
        let mut rows = stmt.query([experiment_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_ratings(&self, experiment_id: ExperimentId) -> RepoResult<Vec<TaskRating>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RATING_SELECT_SQL}
             WHERE r.experiment_id = ?1
             ORDER BY r.position ASC, r.rowid ASC;"
        ))?;
        let mut rows = stmt.query([experiment_id.to_string()])?;
        let mut ratings = Vec::new();
        while let Some(row) = rows.next()? {
            ratings.push(parse_rating_row(row)?);
        }
        Ok(ratings)
    }

    fn start_next(
        &mut self,
        experiment_id: ExperimentId,
        participant_id: ParticipantId,
        now_ms: i64,
    ) -> RepoResult<Option<(TaskAssignment, Task)>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let next = {
            let mut stmt = tx.prepare(&format!(
                "{ASSIGNMENT_SELECT_SQL}
                 INNER JOIN tasks t ON t.id = a.task_id
                 WHERE t.experiment_id = ?1
                   AND a.participant_id = ?2
                   AND a.started_time IS NULL
                 ORDER BY a.id ASC
                 LIMIT 1;"
            ))?;
            let mut rows = stmt.query([experiment_id.to_string(), participant_id.to_string()])?;
            match rows.next()? {
                Some(row) => Some(parse_assignment_row(row)?),
                None => None,
            }
        };

        let Some(mut assignment) = next else {
            return Ok(None);
        };

        assignment.start(now_ms);
        tx.execute(
            "UPDATE task_assignments SET started_time = ?2 WHERE id = ?1;",
            params![assignment.id, now_ms],
        )?;

        let task = {
            let mut stmt = tx.prepare(&format!("{TASK_SELECT_SQL} WHERE t.id = ?1;"))?;
            let mut rows = stmt.query([assignment.task_id.to_string()])?;
            match rows.next()? {
                Some(row) => parse_task_row(row)?,
                None => return Err(RepoError::not_found("task", assignment.task_id)),
            }
        };

        tx.commit()?;
        Ok(Some((assignment, task)))
    }

    fn finish_open(
        &mut self,
        task_id: TaskId,
        participant_id: ParticipantId,
        results: &Value,
        now_ms: i64,
    ) -> RepoResult<Option<TaskAssignment>> {
        let encoded = encode_json(results)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut assignment) = load_assignment(&tx, participant_id, task_id)? else {
            return Ok(None);
        };
        if !assignment.is_started() || assignment.is_finished() {
            return Ok(None);
        }

        assignment.finish(results.clone(), now_ms);
        assignment.validate()?;
        tx.execute(
            "UPDATE task_assignments
             SET
                results = ?2,
                finished_time = ?3
             WHERE id = ?1
               AND started_time IS NOT NULL
               AND finished_time IS NULL;",
            params![assignment.id, encoded, assignment.finished_time],
        )?;

        tx.commit()?;
        Ok(Some(assignment))
    }
}

fn load_assignment(
    conn: &Connection,
    participant_id: ParticipantId,
    task_id: TaskId,
) -> RepoResult<Option<TaskAssignment>> {
    let mut stmt = conn.prepare(&format!(
        "{ASSIGNMENT_SELECT_SQL}
         WHERE a.participant_id = ?1
           AND a.task_id = ?2;"
    ))?;
    let mut rows = stmt.query([participant_id.to_string(), task_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_assignment_row(row)?));
    }
    Ok(None)
}
