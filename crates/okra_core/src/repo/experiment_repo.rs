//! Experiment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist experiments together with their tasks, ratings, practice task
//!   and the assignments pointing at those tasks.
//! - Own the synchronizing update that reconciles stored children against an
//!   `ExperimentDraft`.
//!
//! # Invariants
//! - Synchronization is a set difference over primary keys: listed ids are
//!   updated or created, unlisted ids are deleted. It runs in one immediate
//!   transaction and applying the same draft twice is a no-op the second time.
//! - A listed task/rating id owned by another experiment aborts the whole
//!   update with `RepoError::Conflict`.
//! - Existing assignments keep their timestamps and results across syncs.

use crate::model::assignment::{AssignmentId, TaskAssignment};
use crate::model::draft::{ExperimentDraft, RatingDraft, TaskDraft};
use crate::model::experiment::{Experiment, ExperimentId, TaskType};
use crate::model::participant::ParticipantId;
use crate::model::task::{RatingType, Task, TaskId, TaskRating};
use crate::repo::{
    decode_json, encode_json, ensure_connection_ready, parse_uuid, RepoError, RepoResult,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub(crate) const EXPERIMENT_SELECT_SQL: &str = "SELECT
    e.id,
    e.task_type,
    e.title,
    e.cover_image_url,
    e.instructions,
    e.practice_task_id
FROM experiments e";

pub(crate) const TASK_SELECT_SQL: &str = "SELECT t.id, t.experiment_id, t.label, t.data FROM tasks t";

pub(crate) const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    a.id,
    a.participant_id,
    a.task_id,
    a.results,
    a.started_time,
    a.finished_time
FROM task_assignments a";

pub(crate) const RATING_SELECT_SQL: &str = "SELECT
    r.id,
    r.experiment_id,
    r.question,
    r.rating_type,
    r.low_extreme,
    r.high_extreme
FROM task_ratings r";

/// List row for the experiment overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSummary {
    pub experiment: Experiment,
    pub n_tasks: u32,
    /// Distinct participants holding at least one assignment.
    pub n_participants: u32,
}

/// Row counts touched by one create/sync call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub tasks_created: usize,
    pub tasks_updated: usize,
    pub tasks_deleted: usize,
    pub ratings_created: usize,
    pub ratings_updated: usize,
    pub ratings_deleted: usize,
    pub assignments_created: usize,
    pub assignments_deleted: usize,
}

/// Repository interface for experiments and their owned children.
pub trait ExperimentRepository {
    /// Inserts a new experiment and all children described by `draft`.
    fn create_experiment(
        &mut self,
        id: ExperimentId,
        draft: &ExperimentDraft,
    ) -> RepoResult<SyncReport>;
    /// Overwrites scalars and reconciles every child list against `draft`.
    fn sync_experiment(
        &mut self,
        id: ExperimentId,
        draft: &ExperimentDraft,
    ) -> RepoResult<SyncReport>;
    fn get_experiment(&self, id: ExperimentId) -> RepoResult<Option<Experiment>>;
    /// All experiments, oldest first.
    fn list_experiments(&self) -> RepoResult<Vec<ExperimentSummary>>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Main tasks of one experiment in list order.
    fn list_tasks(&self, experiment_id: ExperimentId) -> RepoResult<Vec<Task>>;
    /// Ratings of one experiment in list order.
    fn list_ratings(&self, experiment_id: ExperimentId) -> RepoResult<Vec<TaskRating>>;
    /// Assignments of every participant for this experiment, by id.
    fn list_assignments(&self, experiment_id: ExperimentId) -> RepoResult<Vec<TaskAssignment>>;
    /// Every participant id, oldest first; the assignment editor lists them all.
    fn list_participant_ids(&self) -> RepoResult<Vec<ParticipantId>>;
    /// Deletes the experiment, its children and its practice task.
    fn delete_experiment(&self, id: ExperimentId) -> RepoResult<()>;
}

/// SQLite-backed experiment repository.
pub struct SqliteExperimentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteExperimentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ExperimentRepository for SqliteExperimentRepository<'_> {
    fn create_experiment(
        &mut self,
        id: ExperimentId,
        draft: &ExperimentDraft,
    ) -> RepoResult<SyncReport> {
        draft.validate()?;
        let experiment = experiment_from_draft(id, None, draft);
        experiment.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "INSERT INTO experiments (id, task_type, title, cover_image_url, instructions)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                experiment.task_type.as_str(),
                experiment.title.as_str(),
                experiment.cover_image_url.as_deref(),
                experiment.instructions.as_str(),
            ],
        );
        if let Err(err) = inserted {
            if crate::repo::is_unique_violation(&err) {
                return Err(RepoError::Conflict(format!("experiment {id} already exists")));
            }
            return Err(err.into());
        }

        let report = apply_draft(&tx, id, None, draft)?;
        tx.commit()?;

        info!(
            "event=experiment_create module=repo status=ok experiment_id={} tasks={} ratings={} assignments={}",
            id, report.tasks_created, report.ratings_created, report.assignments_created
        );
        Ok(report)
    }

    fn sync_experiment(
        &mut self,
        id: ExperimentId,
        draft: &ExperimentDraft,
    ) -> RepoResult<SyncReport> {
        draft.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = load_experiment(&tx, id)?.ok_or_else(|| RepoError::not_found("experiment", id))?;
        let experiment = experiment_from_draft(id, current.practice_task_id, draft);
        experiment.validate()?;

        tx.execute(
            "UPDATE experiments
             SET
                task_type = ?2,
                title = ?3,
                cover_image_url = ?4,
                instructions = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                experiment.task_type.as_str(),
                experiment.title.as_str(),
                experiment.cover_image_url.as_deref(),
                experiment.instructions.as_str(),
            ],
        )?;

        let report = apply_draft(&tx, id, current.practice_task_id, draft)?;
        tx.commit()?;

        info!(
            "event=experiment_sync module=repo status=ok experiment_id={} tasks_created={} tasks_updated={} tasks_deleted={} ratings_created={} ratings_updated={} ratings_deleted={} assignments_created={} assignments_deleted={}",
            id,
            report.tasks_created,
            report.tasks_updated,
            report.tasks_deleted,
            report.ratings_created,
            report.ratings_updated,
            report.ratings_deleted,
            report.assignments_created,
            report.assignments_deleted
        );
        Ok(report)
    }

    fn get_experiment(&self, id: ExperimentId) -> RepoResult<Option<Experiment>> {
        load_experiment(self.conn, id)
    }

    fn list_experiments(&self) -> RepoResult<Vec<ExperimentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                e.id,
                e.task_type,
                e.title,
                e.cover_image_url,
                e.instructions,
                e.practice_task_id,
                (SELECT COUNT(*) FROM tasks t WHERE t.experiment_id = e.id) AS n_tasks,
                (SELECT COUNT(DISTINCT a.participant_id)
                 FROM task_assignments a
                 INNER JOIN tasks t ON t.id = a.task_id
                 WHERE t.experiment_id = e.id) AS n_participants
             FROM experiments e
             ORDER BY e.created_at ASC, e.rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(ExperimentSummary {
                experiment: parse_experiment_row(row)?,
                n_tasks: row.get("n_tasks")?,
                n_participants: row.get("n_participants")?,
            });
        }
        Ok(summaries)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE t.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, experiment_id: ExperimentId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE t.experiment_id = ?1
             ORDER BY t.position ASC, t.rowid ASC;"
        ))?;
        let mut rows = stmt.query([experiment_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
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

    fn list_assignments(&self, experiment_id: ExperimentId) -> RepoResult<Vec<TaskAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE t.experiment_id = ?1
             ORDER BY a.id ASC;"
        ))?;
        let mut rows = stmt.query([experiment_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn list_participant_ids(&self) -> RepoResult<Vec<ParticipantId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM participants ORDER BY created_at ASC, rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "participants.id")?);
        }
        Ok(ids)
    }

    fn delete_experiment(&self, id: ExperimentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM experiments WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("experiment", id));
        }
        info!("event=experiment_delete module=repo status=ok experiment_id={id}");
        Ok(())
    }
}

fn experiment_from_draft(
    id: ExperimentId,
    practice_task_id: Option<TaskId>,
    draft: &ExperimentDraft,
) -> Experiment {
    Experiment {
        id,
        task_type: draft.task_type,
        title: draft.title.clone(),
        cover_image_url: draft.cover_image_url.clone(),
        instructions: draft.instructions.clone(),
        practice_task_id,
    }
}

fn load_experiment(conn: &Connection, id: ExperimentId) -> RepoResult<Option<Experiment>> {
    let mut stmt = conn.prepare(&format!("{EXPERIMENT_SELECT_SQL} WHERE e.id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_experiment_row(row)?));
    }
    Ok(None)
}

/// Reconciles every child collection of one experiment. Caller owns the
/// transaction.
fn apply_draft(
    conn: &Connection,
    experiment_id: ExperimentId,
    current_practice: Option<TaskId>,
    draft: &ExperimentDraft,
) -> RepoResult<SyncReport> {
    check_ownership(conn, experiment_id, current_practice, draft)?;
    ensure_participants_exist(conn, draft)?;

    let experiment_text = experiment_id.to_string();
    let mut report = SyncReport::default();
    sync_practice_task(
        conn,
        &experiment_text,
        current_practice,
        draft.practice_task.as_ref(),
    )?;
    sync_tasks(conn, &experiment_text, &draft.tasks, &mut report)?;
    sync_ratings(conn, &experiment_text, &draft.ratings, &mut report)?;
    sync_assignments(conn, &experiment_text, draft, &mut report)?;
    Ok(report)
}

fn check_ownership(
    conn: &Connection,
    experiment_id: ExperimentId,
    current_practice: Option<TaskId>,
    draft: &ExperimentDraft,
) -> RepoResult<()> {
    if let Some(practice) = draft.practice_task.as_ref() {
        let known = task_owner(conn, practice.id)?.is_some();
        if known && current_practice != Some(practice.id) {
            return Err(RepoError::Conflict(format!(
                "task {} cannot become this experiment's practice task",
                practice.id
            )));
        }
    }

    for task in &draft.tasks {
        match task_owner(conn, task.id)? {
            None => {}
            Some(Some(owner)) if owner == experiment_id => {}
            Some(_) => {
                return Err(RepoError::Conflict(format!(
                    "task {} belongs to another experiment",
                    task.id
                )));
            }
        }
    }

    for rating in &draft.ratings {
        let owner: Option<String> = conn
            .query_row(
                "SELECT experiment_id FROM task_ratings WHERE id = ?1;",
                [rating.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = owner {
            if parse_uuid(&owner, "task_ratings.experiment_id")? != experiment_id {
                return Err(RepoError::Conflict(format!(
                    "rating {} belongs to another experiment",
                    rating.id
                )));
            }
        }
    }

    Ok(())
}

/// `None` when no such task; `Some(None)` for a practice task.
fn task_owner(conn: &Connection, task_id: TaskId) -> RepoResult<Option<Option<ExperimentId>>> {
    let owner: Option<Option<String>> = conn
        .query_row(
            "SELECT experiment_id FROM tasks WHERE id = ?1;",
            [task_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(text)) => Ok(Some(Some(parse_uuid(&text, "tasks.experiment_id")?))),
    }
}

fn ensure_participants_exist(conn: &Connection, draft: &ExperimentDraft) -> RepoResult<()> {
    for assignment in &draft.assignments {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE id = ?1);",
            [assignment.participant.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("participant", assignment.participant));
        }
    }
    Ok(())
}

fn sync_practice_task(
    conn: &Connection,
    experiment_text: &str,
    current: Option<TaskId>,
    draft: Option<&TaskDraft>,
) -> RepoResult<()> {
    if let (Some(current_id), Some(task)) = (current, draft) {
        if current_id == task.id {
            conn.execute(
                "UPDATE tasks SET label = ?2, data = ?3 WHERE id = ?1;",
                params![
                    task.id.to_string(),
                    task.label.as_str(),
                    encode_json(&task.data)?
                ],
            )?;
            return Ok(());
        }
    }

    if let Some(current_id) = current {
        conn.execute(
            "UPDATE experiments SET practice_task_id = NULL WHERE id = ?1;",
            [experiment_text],
        )?;
        conn.execute("DELETE FROM tasks WHERE id = ?1;", [current_id.to_string()])?;
    }

    if let Some(task) = draft {
        conn.execute(
            "INSERT INTO tasks (id, experiment_id, label, data, position)
             VALUES (?1, NULL, ?2, ?3, 0);",
            params![
                task.id.to_string(),
                task.label.as_str(),
                encode_json(&task.data)?
            ],
        )?;
        conn.execute(
            "UPDATE experiments SET practice_task_id = ?2 WHERE id = ?1;",
            params![experiment_text, task.id.to_string()],
        )?;
    }

    Ok(())
}

fn sync_tasks(
    conn: &Connection,
    experiment_text: &str,
    tasks: &[TaskDraft],
    report: &mut SyncReport,
) -> RepoResult<()> {
    let existing = select_ids(
        conn,
        "SELECT id FROM tasks WHERE experiment_id = ?1;",
        experiment_text,
        "tasks.id",
    )?;
    let wanted: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();

    for stale in existing.difference(&wanted) {
        conn.execute("DELETE FROM tasks WHERE id = ?1;", [stale.to_string()])?;
        report.tasks_deleted += 1;
    }

    for (position, task) in tasks.iter().enumerate() {
        let data = encode_json(&task.data)?;
        if existing.contains(&task.id) {
            conn.execute(
                "UPDATE tasks SET label = ?2, data = ?3, position = ?4 WHERE id = ?1;",
                params![task.id.to_string(), task.label.as_str(), data, position as i64],
            )?;
            report.tasks_updated += 1;
        } else {
            conn.execute(
                "INSERT INTO tasks (id, experiment_id, label, data, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    task.id.to_string(),
                    experiment_text,
                    task.label.as_str(),
                    data,
                    position as i64
                ],
            )?;
            report.tasks_created += 1;
        }
    }

    Ok(())
}

fn sync_ratings(
    conn: &Connection,
    experiment_text: &str,
    ratings: &[RatingDraft],
    report: &mut SyncReport,
) -> RepoResult<()> {
    let existing = select_ids(
        conn,
        "SELECT id FROM task_ratings WHERE experiment_id = ?1;",
        experiment_text,
        "task_ratings.id",
    )?;
    let wanted: HashSet<Uuid> = ratings.iter().map(|rating| rating.id).collect();

    for stale in existing.difference(&wanted) {
        conn.execute("DELETE FROM task_ratings WHERE id = ?1;", [stale.to_string()])?;
        report.ratings_deleted += 1;
    }

    for (position, rating) in ratings.iter().enumerate() {
        if existing.contains(&rating.id) {
            conn.execute(
                "UPDATE task_ratings
                 SET
                    question = ?2,
                    rating_type = ?3,
                    low_extreme = ?4,
                    high_extreme = ?5,
                    position = ?6
                 WHERE id = ?1;",
                params![
                    rating.id.to_string(),
                    rating.question.as_str(),
                    rating.rating_type.as_str(),
                    rating.low_extreme.as_deref(),
                    rating.high_extreme.as_deref(),
                    position as i64
                ],
            )?;
            report.ratings_updated += 1;
        } else {
            conn.execute(
                "INSERT INTO task_ratings (
                    id,
                    experiment_id,
                    question,
                    rating_type,
                    low_extreme,
                    high_extreme,
                    position
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    rating.id.to_string(),
                    experiment_text,
                    rating.question.as_str(),
                    rating.rating_type.as_str(),
                    rating.low_extreme.as_deref(),
                    rating.high_extreme.as_deref(),
                    position as i64
                ],
            )?;
            report.ratings_created += 1;
        }
    }

    Ok(())
}

fn sync_assignments(
    conn: &Connection,
    experiment_text: &str,
    draft: &ExperimentDraft,
    report: &mut SyncReport,
) -> RepoResult<()> {
    let mut existing: HashMap<(ParticipantId, TaskId), AssignmentId> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT a.id, a.participant_id, a.task_id
             FROM task_assignments a
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE t.experiment_id = ?1;",
        )?;
        let mut rows = stmt.query([experiment_text])?;
        while let Some(row) = rows.next()? {
            let participant_text: String = row.get(1)?;
            let task_text: String = row.get(2)?;
            existing.insert(
                (
                    parse_uuid(&participant_text, "task_assignments.participant_id")?,
                    parse_uuid(&task_text, "task_assignments.task_id")?,
                ),
                row.get(0)?,
            );
        }
    }

    let wanted: Vec<(ParticipantId, TaskId)> = draft
        .assignments
        .iter()
        .flat_map(|assignment| {
            assignment
                .tasks
                .iter()
                .map(move |task| (assignment.participant, task.id))
        })
        .collect();
    let wanted_set: HashSet<(ParticipantId, TaskId)> = wanted.iter().copied().collect();

    for (pair, assignment_id) in &existing {
        if !wanted_set.contains(pair) {
            conn.execute(
                "DELETE FROM task_assignments WHERE id = ?1;",
                [assignment_id],
            )?;
            report.assignments_deleted += 1;
        }
    }

    for (participant_id, task_id) in wanted {
        if existing.contains_key(&(participant_id, task_id)) {
            continue;
        }
        conn.execute(
            "INSERT INTO task_assignments (participant_id, task_id) VALUES (?1, ?2);",
            params![participant_id.to_string(), task_id.to_string()],
        )?;
        report.assignments_created += 1;
    }

    Ok(())
}

fn select_ids(
    conn: &Connection,
    sql: &str,
    param: &str,
    column: &str,
) -> RepoResult<HashSet<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([param])?;
    let mut ids = HashSet::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.insert(parse_uuid(&text, column)?);
    }
    Ok(ids)
}

pub(crate) fn parse_experiment_row(row: &Row<'_>) -> RepoResult<Experiment> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("task_type")?;
    let task_type = TaskType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task type `{type_text}` in experiments.task_type"
        ))
    })?;
    let practice_task_id = match row.get::<_, Option<String>>("practice_task_id")? {
        Some(text) => Some(parse_uuid(&text, "experiments.practice_task_id")?),
        None => None,
    };

    Ok(Experiment {
        id: parse_uuid(&id_text, "experiments.id")?,
        task_type,
        title: row.get("title")?,
        cover_image_url: row.get("cover_image_url")?,
        instructions: row.get("instructions")?,
        practice_task_id,
    })
}

pub(crate) fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let experiment_id = match row.get::<_, Option<String>>("experiment_id")? {
        Some(text) => Some(parse_uuid(&text, "tasks.experiment_id")?),
        None => None,
    };
    let data_text: String = row.get("data")?;

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        experiment_id,
        label: row.get("label")?,
        data: decode_json(&data_text, "tasks.data")?,
    })
}

pub(crate) fn parse_rating_row(row: &Row<'_>) -> RepoResult<TaskRating> {
    let id_text: String = row.get("id")?;
    let experiment_text: String = row.get("experiment_id")?;
    let type_text: String = row.get("rating_type")?;
    let rating_type = RatingType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid rating type `{type_text}` in task_ratings.rating_type"
        ))
    })?;

    Ok(TaskRating {
        id: parse_uuid(&id_text, "task_ratings.id")?,
        experiment_id: parse_uuid(&experiment_text, "task_ratings.experiment_id")?,
        question: row.get("question")?,
        rating_type,
        low_extreme: row.get("low_extreme")?,
        high_extreme: row.get("high_extreme")?,
    })
}

pub(crate) fn parse_assignment_row(row: &Row<'_>) -> RepoResult<TaskAssignment> {
    let participant_text: String = row.get("participant_id")?;
    let task_text: String = row.get("task_id")?;
    let results = match row.get::<_, Option<String>>("results")? {
        Some(text) => Some(decode_json(&text, "task_assignments.results")?),
        None => None,
    };

    Ok(TaskAssignment {
        id: row.get("id")?,
        participant_id: parse_uuid(&participant_text, "task_assignments.participant_id")?,
        task_id: parse_uuid(&task_text, "task_assignments.task_id")?,
        results,
        started_time: row.get("started_time")?,
        finished_time: row.get("finished_time")?,
    })
}
