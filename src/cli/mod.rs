//! Command-line interface
//!
//! `kepler` with no subcommand opens the live viewer; `list`, `info`,
//! `delete` and `dir` print to stdout.

pub mod commands;
pub mod format;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Config, HOME_ENV};
use crate::experiment::{ExperimentStatus, SortField};
use crate::tracker::Tracker;
use crate::Result;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "kepler")]
#[command(about = "Kepler - track experiments and browse them in the terminal")]
#[command(version)]
pub struct Cli {
    /// Application directory (experiments.json and artifacts)
    #[arg(long, global = true, env = HOME_ENV)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Configuration implied by the arguments and environment.
    #[must_use]
    pub fn config(&self) -> Config {
        let builder = Config::builder();
        match &self.home {
            Some(home) => builder.home(home.clone()).build(),
            None => builder.build(),
        }
    }

    /// Whether this invocation opens the terminal viewer.
    #[must_use]
    pub fn is_tui(&self) -> bool {
        matches!(self.command, None | Some(Commands::Tui))
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the live experiment viewer (default)
    Tui,

    /// List experiments
    List(ListArgs),

    /// Show details of one experiment
    Info {
        /// Experiment ID
        experiment_id: String,
    },

    /// Delete an experiment and its artifacts
    Delete {
        /// Experiment ID
        experiment_id: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Show the application directory and its contents
    Dir,
}

/// Arguments of `kepler list`.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Only experiments with this status (repeatable)
    #[arg(long, short, value_enum)]
    pub status: Vec<StatusArg>,

    /// Only experiments carrying this tag (repeatable, all must match)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Sort field
    #[arg(long, value_enum, default_value_t = SortArg::StartTime)]
    pub sort: SortArg,

    /// Sort descending (default)
    #[arg(long, overrides_with = "no_reverse")]
    reverse: bool,

    /// Sort ascending instead of newest first
    #[arg(long, overrides_with = "reverse")]
    no_reverse: bool,
}

impl ListArgs {
    /// Whether the listing is newest first. The last of `--reverse` /
    /// `--no-reverse` wins.
    #[must_use]
    pub const fn reverse(&self) -> bool {
        !self.no_reverse
    }
}

/// Status values accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// No End event yet
    Running,
    /// Ended normally
    Completed,
    /// Recorded an error
    Error,
    /// Ended with an "interrupted" message
    Interrupted,
}

impl From<StatusArg> for ExperimentStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Running => Self::Running,
            StatusArg::Completed => Self::Completed,
            StatusArg::Error => Self::Error,
            StatusArg::Interrupted => Self::Interrupted,
        }
    }
}

/// Sort fields accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Experiment ID
    Id,
    /// Experiment name
    Name,
    /// Status, alphabetically
    Status,
    /// Time of the first event
    #[value(name = "start_time")]
    StartTime,
    /// Time of the last End event
    #[value(name = "end_time")]
    EndTime,
    /// Seconds between start and end
    Duration,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => Self::Id,
            SortArg::Name => Self::Name,
            SortArg::Status => Self::Status,
            SortArg::StartTime => Self::StartTime,
            SortArg::EndTime => Self::EndTime,
            SortArg::Duration => Self::Duration,
        }
    }
}

/// Dispatch a parsed command line.
///
/// # Errors
///
/// Returns error if the collection cannot be read, a command fails, or the
/// viewer's terminal cannot be driven.
pub fn run(cli: Cli, config: &Config) -> Result<()> {
    let tracker = Tracker::from_config(config);
    let mut stdout = io::stdout().lock();
    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => crate::tui::run(config),
        Commands::List(args) => commands::list(&tracker.list_experiments()?, &args, &mut stdout),
        Commands::Info { experiment_id } => {
            let experiment = tracker.get_experiment(&experiment_id)?;
            commands::info(experiment.as_ref(), &experiment_id, &mut stdout)
        }
        Commands::Delete {
            experiment_id,
            force,
        } => {
            let mut stdin = io::stdin().lock();
            commands::delete(&tracker, &experiment_id, force, &mut stdin, &mut stdout).map(|_| ())
        }
        Commands::Dir => commands::dir(tracker.storage(), &mut stdout),
    }
}
