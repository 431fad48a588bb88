//! Participant repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist participants and their registration key state.
//! - Resolve device keys back to participants.
//!
//! # Invariants
//! - Write paths call `Participant::validate()`; the table CHECK mirrors it.
//! - Registration claims are conditional on the key still being current, so
//!   one registration key can be claimed at most once.

use crate::model::experiment::ExperimentId;
use crate::model::participant::{Participant, ParticipantId};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PARTICIPANT_SELECT_SQL: &str = "SELECT id, device_key, registration_key FROM participants";

/// Repository interface for participant persistence.
pub trait ParticipantRepository {
    fn create_participant(&self, participant: &Participant) -> RepoResult<ParticipantId>;
    /// Overwrites both keys unconditionally.
    fn save_keys(&self, participant: &Participant) -> RepoResult<()>;
    /// Stores the registered key state only if `registration_key` is still
    /// current. Returns `false` when another caller claimed it first.
    fn claim_registration(
        &self,
        participant: &Participant,
        registration_key: &str,
    ) -> RepoResult<bool>;
    fn get_participant(&self, id: ParticipantId) -> RepoResult<Option<Participant>>;
    fn find_by_device_key(&self, device_key: &str) -> RepoResult<Option<Participant>>;
    /// All participants, oldest first.
    fn list_participants(&self) -> RepoResult<Vec<Participant>>;
    /// Experiments in which the participant holds at least one assignment.
    fn experiment_ids_for(&self, id: ParticipantId) -> RepoResult<Vec<ExperimentId>>;
    /// Deletes the participant and, by cascade, its assignments.
    fn delete_participant(&self, id: ParticipantId) -> RepoResult<()>;
}

/// SQLite-backed participant repository.
pub struct SqliteParticipantRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParticipantRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParticipantRepository for SqliteParticipantRepository<'_> {
    fn create_participant(&self, participant: &Participant) -> RepoResult<ParticipantId> {
        participant.validate()?;

        self.conn.execute(
            "INSERT INTO participants (id, device_key, registration_key)
             VALUES (?1, ?2, ?3);",
            params![
                participant.id.to_string(),
                participant.device_key.as_deref(),
                participant.registration_key.as_deref(),
            ],
        )?;

        Ok(participant.id)
    }

    fn save_keys(&self, participant: &Participant) -> RepoResult<()> {
        participant.validate()?;

        let changed = self.conn.execute(
            "UPDATE participants
             SET
                device_key = ?2,
                registration_key = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                participant.id.to_string(),
                participant.device_key.as_deref(),
                participant.registration_key.as_deref(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("participant", participant.id));
        }
        Ok(())
    }

    fn claim_registration(
        &self,
        participant: &Participant,
        registration_key: &str,
    ) -> RepoResult<bool> {
        participant.validate()?;

        let changed = self.conn.execute(
            "UPDATE participants
             SET
                device_key = ?2,
                registration_key = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND registration_key = ?4;",
            params![
                participant.id.to_string(),
                participant.device_key.as_deref(),
                participant.registration_key.as_deref(),
                registration_key,
            ],
        )?;
        Ok(changed == 1)
    }

    fn get_participant(&self, id: ParticipantId) -> RepoResult<Option<Participant>> {
        let row = self
            .conn
            .query_row(
                &format!("{PARTICIPANT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_participant_columns,
            )
            .optional()?;
        row.map(into_participant).transpose()
    }

    fn find_by_device_key(&self, device_key: &str) -> RepoResult<Option<Participant>> {
        let row = self
            .conn
            .query_row(
                &format!("{PARTICIPANT_SELECT_SQL} WHERE device_key = ?1;"),
                [device_key],
                read_participant_columns,
            )
            .optional()?;
        row.map(into_participant).transpose()
    }

    fn list_participants(&self) -> RepoResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARTICIPANT_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next()? {
            participants.push(into_participant(read_participant_columns(row)?)?);
        }
        Ok(participants)
    }

    fn experiment_ids_for(&self, id: ParticipantId) -> RepoResult<Vec<ExperimentId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT t.experiment_id
             FROM task_assignments a
             INNER JOIN tasks t ON t.id = a.task_id
             WHERE a.participant_id = ?1
               AND t.experiment_id IS NOT NULL
             ORDER BY t.experiment_id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "tasks.experiment_id")?);
        }
        Ok(ids)
    }

    fn delete_participant(&self, id: ParticipantId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM participants WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("participant", id));
        }
        Ok(())
    }
}

type ParticipantColumns = (String, Option<String>, Option<String>);

fn read_participant_columns(row: &Row<'_>) -> rusqlite::Result<ParticipantColumns> {
    Ok((
        row.get("id")?,
        row.get("device_key")?,
        row.get("registration_key")?,
    ))
}

fn into_participant(
    (id_text, device_key, registration_key): ParticipantColumns,
) -> RepoResult<Participant> {
    let participant = Participant {
        id: parse_uuid(&id_text, "participants.id")?,
        device_key,
        registration_key,
    };
    participant.validate()?;
    Ok(participant)
}
