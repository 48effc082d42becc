//! CLI command implementations.
//!
//! Each command writes to a caller-supplied writer so it can be exercised
//! without a terminal.

use std::io::{BufRead, Write};

use crossterm::style::{Color, Stylize};

use super::format::{format_duration, format_timestamp, truncate};
use super::ListArgs;
use crate::experiment::log::display_value;
use crate::experiment::{Experiment, ExperimentCollection, ExperimentFilter, ExperimentStatus};
use crate::storage::ExperimentStorage;
use crate::tracker::Tracker;
use crate::Result;

/// Terminal color used for a status.
#[must_use]
pub const fn status_color(status: ExperimentStatus) -> Color {
    match status {
        ExperimentStatus::Running => Color::Blue,
        ExperimentStatus::Completed => Color::Green,
        ExperimentStatus::Error => Color::Red,
        ExperimentStatus::Interrupted => Color::Yellow,
    }
}

/// `kepler list`
///
/// # Errors
///
/// Returns error if writing to `out` fails.
pub fn list(collection: &ExperimentCollection, args: &ListArgs, out: &mut impl Write) -> Result<()> {
    let filter = ExperimentFilter::new()
        .statuses(args.status.iter().copied().map(ExperimentStatus::from))
        .tags(args.tags.iter().cloned());
    let filtered = collection.filter(&filter);
    let experiments = filtered.sort_by_field(args.sort.into(), args.reverse());

    if experiments.is_empty() {
        writeln!(out, "{}", "No experiments found.".with(Color::Yellow))?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<24} {:<20} {:<12} {:<20} {:<10} Tags",
        "ID", "Name", "Status", "Start Time", "Duration"
    )?;
    writeln!(out, "{}", "-".repeat(100))?;
    for experiment in experiments {
        let status = experiment.status();
        let start = experiment
            .start_time()
            .map_or_else(|_| "N/A".to_string(), format_timestamp);
        writeln!(
            out,
            "{:<24} {:<20} {} {:<20} {:<10} {}",
            truncate(experiment.id(), 24),
            truncate(experiment.name(), 20),
            format!("{:<12}", status.as_str()).with(status_color(status)),
            start,
            format_duration(experiment.duration()),
            experiment.tags().join(", "),
        )?;
    }
    Ok(())
}

/// `kepler info <id>`
///
/// # Errors
///
/// Returns error if writing to `out` fails.
pub fn info(experiment: Option<&Experiment>, id: &str, out: &mut impl Write) -> Result<()> {
    let Some(exp) = experiment else {
        writeln!(out, "{}", format!("Experiment with ID '{id}' not found.").red())?;
        return Ok(());
    };

    writeln!(out, "{}", format!("Experiment: {} ({})", exp.name(), exp.id()).cyan().bold())?;
    let status = exp.status();
    writeln!(out, "Status: {}", status.as_str().with(status_color(status)).bold())?;
    if let Ok(start) = exp.start_time() {
        writeln!(out, "Start Time: {}", format_timestamp(start))?;
    }
    if let Some(end) = exp.end_time() {
        writeln!(out, "End Time: {}", format_timestamp(end))?;
    }
    if let Some(duration) = exp.duration() {
        writeln!(out, "Duration: {duration:.2} seconds")?;
    }
    let tags = exp.tags();
    if !tags.is_empty() {
        writeln!(out, "Tags: {}", tags.join(", "))?;
    }
    if let Some(error) = exp.error() {
        writeln!(out, "Error: {}", error.red())?;
    }
    if let Some(progress) = exp.progress() {
        writeln!(
            out,
            "Progress: {}/{} ({:.1}%)",
            progress.current, progress.total, progress.percentage
        )?;
    }

    let config = exp.config();
    if !config.is_empty() {
        writeln!(out, "\n{}", "Configuration:".bold())?;
        for (key, value) in &config {
            writeln!(out, "  {key}: {}", display_value(value))?;
        }
    }
    let metrics = exp.metrics();
    if !metrics.is_empty() {
        writeln!(out, "\n{}", "Metrics:".bold())?;
        for (name, value) in &metrics {
            writeln!(out, "  {name}: {}", display_value(value))?;
        }
    }
    let artifacts = exp.artifacts();
    if !artifacts.is_empty() {
        writeln!(out, "\n{}", "Artifacts:".bold())?;
        for (name, path) in &artifacts {
            writeln!(out, "  {name}: {}", path.display())?;
        }
    }
    Ok(())
}

/// `kepler delete <id>`: asks for confirmation on `input` unless `force`.
///
/// Returns `true` if the experiment was deleted.
///
/// # Errors
///
/// Returns error if reading the answer, writing output, or deleting fails.
pub fn delete(
    tracker: &Tracker,
    id: &str,
    force: bool,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<bool> {
    let Some(exp) = tracker.get_experiment(id)? else {
        writeln!(out, "{}", format!("Experiment with ID '{id}' not found.").red())?;
        return Ok(false);
    };

    if !force {
        write!(
            out,
            "Are you sure you want to delete experiment '{}' ({})? [y/N]: ",
            exp.name(),
            exp.id()
        )?;
        out.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            writeln!(out, "Deletion cancelled.")?;
            return Ok(false);
        }
    }

    if tracker.delete_experiment(id)? {
        writeln!(
            out,
            "{}",
            format!("Experiment '{}' ({}) deleted successfully.", exp.name(), exp.id()).green()
        )?;
        Ok(true)
    } else {
        writeln!(
            out,
            "{}",
            format!("Failed to delete experiment '{}' ({}).", exp.name(), exp.id()).red()
        )?;
        Ok(false)
    }
}

/// `kepler dir`
///
/// # Errors
///
/// Returns error if the directory cannot be listed or writing fails.
pub fn dir(storage: &ExperimentStorage, out: &mut impl Write) -> Result<()> {
    let root = storage.root();
    writeln!(out, "Application directory: {}", root.display().to_string().bold())?;
    if !root.exists() {
        writeln!(
            out,
            "{}",
            "Directory does not exist yet. It will be created when you run your first experiment."
                .yellow()
        )?;
        return Ok(());
    }

    writeln!(out, "\nContents:")?;
    let mut entries: Vec<_> = std::fs::read_dir(root)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            writeln!(out, "  {} (directory)", format!("{name}/").blue())?;
        } else {
            writeln!(out, "  {} ({} bytes)", name.cyan(), metadata.len())?;
        }
    }
    Ok(())
}
