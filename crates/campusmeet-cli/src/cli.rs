//! Command-line interface definition.

use std::path::PathBuf;

use campusmeet_core::{CountPolicy, MeetingId, TracingOutputFormat};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// campusmeet - Expand and manage recurring club meetings
#[derive(Debug, Parser)]
#[command(name = "campusmeet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CAMPUSMEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, env = "CAMPUSMEET_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Log filter directive, overriding RUST_LOG (e.g. "campusmeet=info")
    #[arg(long)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the occurrences of a meeting
    Expand {
        /// Snapshot file (defaults to snapshot.path from the config)
        #[arg(long, short, env = "CAMPUSMEET_SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Meeting id
        #[arg(long, short)]
        meeting: MeetingId,

        /// First date of the window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Whether exception dates consume the rule's count
        #[arg(long, value_enum)]
        count_policy: Option<PolicyArg>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate every organization, meeting and rule in a snapshot
    Check {
        /// Snapshot file (defaults to snapshot.path from the config)
        #[arg(long, short, env = "CAMPUSMEET_SNAPSHOT")]
        snapshot: Option<PathBuf>,
    },

    /// Process request envelopes, one JSON document per line
    Request {
        /// Snapshot file (defaults to snapshot.path from the config)
        #[arg(long, short, env = "CAMPUSMEET_SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Read requests from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Write the store back to the snapshot file afterwards
        #[arg(long)]
        save: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Count policy as a command-line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Candidates,
    Occurrences,
}

impl From<PolicyArg> for CountPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Candidates => CountPolicy::Candidates,
            PolicyArg::Occurrences => CountPolicy::Occurrences,
        }
    }
}

/// Log format as a command-line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => TracingOutputFormat::Compact,
            LogFormat::Pretty => TracingOutputFormat::Pretty,
            LogFormat::Json => TracingOutputFormat::Json,
        }
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the current configuration
    Dump,
    /// Validate the configuration
    Validate,
    /// Show the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_expand() {
        let cli = Cli::try_parse_from([
            "campusmeet",
            "expand",
            "--snapshot",
            "club.json",
            "--meeting",
            "4",
            "--from",
            "2024-01-01",
            "--count-policy",
            "occurrences",
        ])
        .unwrap();
        match cli.command {
            Command::Expand {
                snapshot,
                meeting,
                from,
                to,
                count_policy,
                json,
            } => {
                assert_eq!(snapshot, Some(PathBuf::from("club.json")));
                assert_eq!(meeting, 4);
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(to, None);
                assert_eq!(count_policy, Some(PolicyArg::Occurrences));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reject_bad_date() {
        let result = Cli::try_parse_from([
            "campusmeet", "expand", "--meeting", "1", "--from", "2024-13-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_log_options() {
        let cli = Cli::try_parse_from([
            "campusmeet",
            "--log-format",
            "json",
            "--log-filter",
            "campusmeet_service=debug",
            "config",
            "dump",
        ])
        .unwrap();
        assert_eq!(
            TracingOutputFormat::from(cli.log_format),
            TracingOutputFormat::Json
        );
        assert_eq!(cli.log_filter.as_deref(), Some("campusmeet_service=debug"));
    }

    #[test]
    fn parse_config_action() {
        let cli = Cli::try_parse_from(["campusmeet", "--debug", "config", "path"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
