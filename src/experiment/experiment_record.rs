//! Experiment - event-sourced root entity
//!
//! An experiment stores only its identity and an append-only log. Status,
//! timings, config, metrics, artifacts, tags, error and progress are all
//! recomputed from the log on every call, so two experiments with identical
//! logs are indistinguishable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::log::{
    LogEvent, LogKind, LogPayload, Progress, COMPLETED_MESSAGE, DEFAULT_START_MESSAGE,
    FAILED_MESSAGE, INTERRUPTED_MESSAGE,
};
use super::ExperimentStatus;
use crate::{Error, Result};

/// A tracked experiment: identity plus an ordered log of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    id: String,
    name: String,
    #[serde(default, alias = "logs")]
    events: Vec<LogEvent>,
}

impl Experiment {
    /// Create a new experiment with a Start event already appended.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::builder(id, name).build()
    }

    /// Create a builder for an experiment with initial config and tags.
    #[must_use]
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(id, name)
    }

    /// Rebuild an experiment from an existing log (replay).
    #[must_use]
    pub fn from_events(id: impl Into<String>, name: impl Into<String>, events: Vec<LogEvent>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            events,
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the log, in append order.
    #[must_use]
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    /// Current status.
    ///
    /// Any Error event wins, even when an End event trails it. Otherwise the
    /// last End event decides between completed and interrupted
    /// (case-insensitive "interrupted" in its message). No End/Error means
    /// the experiment is still running.
    #[must_use]
    pub fn status(&self) -> ExperimentStatus {
        if self.events.iter().any(|e| e.kind() == LogKind::Error) {
            return ExperimentStatus::Error;
        }
        match self.events.iter().rev().find(|e| e.kind() == LogKind::End) {
            Some(end) if end.message().to_lowercase().contains("interrupted") => {
                ExperimentStatus::Interrupted
            }
            Some(_) => ExperimentStatus::Completed,
            None => ExperimentStatus::Running,
        }
    }

    /// Timestamp of the first Start event, falling back to the first event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyExperiment`] if the log is empty.
    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        self.events
            .iter()
            .find(|e| e.kind() == LogKind::Start)
            .or_else(|| self.events.first())
            .map(LogEvent::created_at)
            .ok_or_else(|| Error::EmptyExperiment(self.id.clone()))
    }

    /// Timestamp of the last End or Error event.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .rev()
            .find(|e| matches!(e.kind(), LogKind::End | LogKind::Error))
            .map(LogEvent::created_at)
    }

    /// Duration in seconds. Running experiments report the time elapsed so far.
    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.duration_at(Utc::now())
    }

    /// Duration in seconds, measuring running experiments up to `now`.
    #[must_use]
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<f64> {
        let start = self.start_time().ok()?;
        match self.end_time() {
            Some(end) => Some(seconds_between(start, end)),
            None if self.status() == ExperimentStatus::Running => Some(seconds_between(start, now)),
            None => None,
        }
    }

    /// Configuration (last writer wins per key).
    #[must_use]
    pub fn config(&self) -> BTreeMap<String, Value> {
        self.events
            .iter()
            .filter_map(|e| match e.payload() {
                LogPayload::Config { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Metrics (last writer wins per name).
    #[must_use]
    pub fn metrics(&self) -> BTreeMap<String, Value> {
        self.events
            .iter()
            .filter_map(|e| match e.payload() {
                LogPayload::Metric { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Artifacts (last writer wins per name).
    #[must_use]
    pub fn artifacts(&self) -> BTreeMap<String, PathBuf> {
        self.events
            .iter()
            .filter_map(|e| match e.payload() {
                LogPayload::Artifact { name, path } => Some((name.clone(), path.clone())),
                _ => None,
            })
            .collect()
    }

    /// Message of the last Error event.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .find(|e| e.kind() == LogKind::Error)
            .map(LogEvent::message)
    }

    /// Tags in first-occurrence order, without duplicates.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for event in &self.events {
            if let LogPayload::Tag { tag } = event.payload() {
                if !tags.contains(&tag.as_str()) {
                    tags.push(tag);
                }
            }
        }
        tags
    }

    /// True if the experiment carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.payload(), LogPayload::Tag { tag: t } if t == tag))
    }

    /// Payload of the last Progress event.
    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        self.events.iter().rev().find_map(|e| match e.payload() {
            LogPayload::Progress(progress) => Some(*progress),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Mutators (each appends exactly one event, except `fail`)
    // ------------------------------------------------------------------

    /// Append an arbitrary event.
    pub fn push(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    /// Append a Start event.
    pub fn start(&mut self, message: impl Into<String>) {
        self.push(LogEvent::start(message));
    }

    /// Mark the experiment completed.
    pub fn complete(&mut self) {
        self.push(LogEvent::end(COMPLETED_MESSAGE));
    }

    /// Mark the experiment failed: appends an Error event, then an End event.
    pub fn fail(&mut self, message: impl Into<String>, details: Option<&str>) {
        self.push(LogEvent::error(message, details.map(str::to_string)));
        self.push(LogEvent::end(FAILED_MESSAGE));
    }

    /// Mark the experiment interrupted.
    pub fn interrupt(&mut self) {
        self.push(LogEvent::end(INTERRUPTED_MESSAGE));
    }

    /// Record a metric value.
    pub fn set_metric(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.push(LogEvent::metric(name, value));
    }

    /// Record a saved artifact.
    pub fn add_artifact(&mut self, name: impl Into<String>, path: impl AsRef<Path>) {
        self.push(LogEvent::artifact(name, path));
    }

    /// Add a tag. Already-present tags are not appended again.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.push(LogEvent::tag(tag));
        }
    }

    /// Record a configuration parameter.
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.push(LogEvent::config(key, value));
    }

    /// Record progress.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `total` is zero; nothing is appended.
    pub fn update_progress(&mut self, current: u64, total: u64, message: &str) -> Result<()> {
        self.push(LogEvent::progress(current, total, message)?);
        Ok(())
    }

    /// Log an informational message.
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(LogEvent::info(message));
    }

    /// Log a warning.
    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.push(LogEvent::warning(message));
    }

    /// Log resource usage.
    pub fn log_resource(&mut self, resource_type: impl Into<String>, usage: impl Into<Value>) {
        self.push(LogEvent::resource(resource_type, usage));
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    delta.num_microseconds().map_or_else(
        || delta.num_milliseconds() as f64 / 1_000.0,
        |us| us as f64 / 1_000_000.0,
    )
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    id: String,
    name: String,
    start_message: String,
    started_at: Option<DateTime<Utc>>,
    config: Vec<(String, Value)>,
    tags: Vec<String>,
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_message: DEFAULT_START_MESSAGE.to_string(),
            started_at: None,
            config: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the message of the initial Start event.
    #[must_use]
    pub fn start_message(mut self, message: impl Into<String>) -> Self {
        self.start_message = message.into();
        self
    }

    /// Set a custom start timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Add one configuration parameter.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    /// Add configuration parameters from any key/value iterator
    /// (e.g. a `serde_json::Map`).
    #[must_use]
    pub fn configs<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.config
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add one tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    #[must_use]
    pub fn tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Build the `Experiment`: Start first, then config, then tags.
    #[must_use]
    pub fn build(self) -> Experiment {
        let mut start = LogEvent::start(self.start_message);
        if let Some(ts) = self.started_at {
            start = start.with_created_at(ts);
        }
        let mut experiment = Experiment::from_events(self.id, self.name, vec![start]);
        for (key, value) in self.config {
            experiment.set_config(key, value);
        }
        for tag in self.tags {
            experiment.add_tag(tag);
        }
        experiment
    }
}
