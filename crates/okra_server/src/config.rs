//! Server configuration from CLI arguments and environment variables.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Okra experiment server
#[derive(Parser, Debug, Clone)]
#[command(name = "okra-server")]
#[command(about = "Serves psycholinguistic experiments to researchers and participant devices")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "OKRA_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// SQLite database file; created and migrated on start
    #[arg(long, env = "OKRA_DATABASE", default_value = "okra.sqlite3")]
    pub database: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults by build mode
    #[arg(long, env = "OKRA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset
    #[arg(long, env = "OKRA_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Researcher session lifetime in seconds
    #[arg(long, env = "OKRA_SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL_SECS)]
    pub session_ttl_secs: u64,
}

impl Args {
    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(okra_core::default_log_level())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn defaults_apply_without_arguments() {
        let args = Args::try_parse_from(["okra-server"]).unwrap();
        assert_eq!(args.listen.to_string(), "127.0.0.1:8000");
        assert_eq!(args.database.to_str(), Some("okra.sqlite3"));
        assert_eq!(args.session_ttl().as_secs(), 14 * 24 * 60 * 60);
    }

    #[test]
    fn log_level_falls_back_to_build_default() {
        let args = Args::try_parse_from(["okra-server"]).unwrap();
        assert_eq!(args.log_level, None);
        assert_eq!(args.log_level(), okra_core::default_log_level());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "okra-server",
            "--listen",
            "0.0.0.0:9000",
            "--log-level",
            "warn",
            "--session-ttl-secs",
            "60",
        ])
        .unwrap();
        assert_eq!(args.listen.port(), 9000);
        assert_eq!(args.log_level(), "warn");
        assert_eq!(args.session_ttl_secs, 60);
    }
}
