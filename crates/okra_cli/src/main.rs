//! Operator CLI for the Okra database.
//!
//! # Responsibility
//! - Seed researcher accounts and participants without going through HTTP.
//! - Print registration details for handing out to devices.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use okra_core::{
    open_db, AuthService, ParticipantId, ParticipantService, SqliteParticipantRepository,
    SqliteUserRepository,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "okra", version, about = "Okra database administration")]
struct Cli {
    /// SQLite database file; created and migrated when missing.
    #[arg(long, env = "OKRA_DATABASE", default_value = "okra.sqlite3")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Creates a researcher account.
    CreateUser {
        username: String,
        #[arg(long, env = "OKRA_PASSWORD")]
        password: String,
    },
    /// Creates a participant and prints its registration key.
    AddParticipant,
    /// Prints registration details for an unregistered participant.
    Registration { participant: ParticipantId },
    /// Lists participants with their registration state.
    Participants,
    /// Prints core linkage info.
    Ping,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Ping = cli.command {
        println!("okra_core ping={}", okra_core::ping());
        println!("okra_core version={}", okra_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.database)
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;

    match cli.command {
        Command::CreateUser { username, password } => {
            // Session TTL is unused here; no sessions are issued.
            let service =
                AuthService::new(SqliteUserRepository::try_new(&conn)?, Duration::ZERO);
            let user = service
                .create_user(&username, &password)
                .with_context(|| format!("failed to create user `{username}`"))?;
            println!("created user {} ({})", user.username, user.id);
        }
        Command::AddParticipant => {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(&conn)?);
            let participant = service.create_participant()?;
            let details = service.registration_details(participant.id)?;
            println!("participant={}", details.participant_id);
            println!("registration_key={}", details.registration_key);
        }
        Command::Registration { participant } => {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(&conn)?);
            let details = service.registration_details(participant)?;
            println!("participant={}", details.participant_id);
            println!("registration_key={}", details.registration_key);
        }
        Command::Participants => {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(&conn)?);
            for summary in service.list_participants()? {
                println!(
                    "{} registered={} experiments={}",
                    summary.id,
                    summary.registered,
                    summary.experiments.len()
                );
            }
        }
        Command::Ping => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn create_user_takes_password_flag() {
        let cli = Cli::try_parse_from([
            "okra",
            "--database",
            "/tmp/okra.sqlite3",
            "create-user",
            "alice",
            "--password",
            "secret",
        ])
        .unwrap();
        match cli.command {
            Command::CreateUser { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "secret");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn registration_requires_a_uuid() {
        assert!(Cli::try_parse_from(["okra", "registration", "not-a-uuid"]).is_err());
    }
}
