//! Command-line surface of the `harvest` binary.

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Harvest fetch bot.
#[derive(Debug, Parser)]
#[command(name = "harvest", version, about = "Chat-driven download fetcher")]
pub struct Cli {
    /// Subcommand to run; defaults to `run`.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Operator subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Run the poll loop until interrupted.
    Run,
    /// Drive a single request once and exit.
    Drive {
        /// Identifier of the request to drive.
        request_id: Uuid,
    },
}

impl Cli {
    /// Subcommand after applying the default.
    #[must_use]
    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::Run)
    }
}

impl CliCommand {
    /// Mode recorded on the application span.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Drive { .. } => "drive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["harvest"])?;
        assert_eq!(cli.command(), CliCommand::Run);
        assert_eq!(cli.command().mode(), "run");
        Ok(())
    }

    #[test]
    fn drive_takes_a_request_id() -> Result<(), clap::Error> {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["harvest", "drive", &id.to_string()])?;
        assert_eq!(cli.command(), CliCommand::Drive { request_id: id });
        Ok(())
    }

    #[test]
    fn drive_rejects_malformed_ids() {
        assert!(Cli::try_parse_from(["harvest", "drive", "not-a-uuid"]).is_err());
    }
}
