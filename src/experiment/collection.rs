//! Experiment Collection - keyed set of experiments with query helpers
//!
//! The collection is the unit of persistence: it is always loaded and saved
//! as a whole, never patched per experiment.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Experiment, ExperimentStatus};
use crate::{Error, Result};

/// Derived attribute an experiment list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    /// Experiment ID.
    Id,
    /// Experiment name.
    Name,
    /// Status name (alphabetical).
    Status,
    /// Start timestamp.
    StartTime,
    /// End timestamp (running experiments first).
    EndTime,
    /// Duration in seconds.
    Duration,
}

impl SortField {
    /// All sortable fields.
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::Name,
        Self::Status,
        Self::StartTime,
        Self::EndTime,
        Self::Duration,
    ];

    /// Field name as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Status => "status",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Duration => "duration",
        }
    }

    /// Stable in-place sort of experiment references by this field.
    ///
    /// `reverse` flips the comparison, not the result, so ties keep their
    /// incoming order in both directions.
    pub fn sort(self, experiments: &mut [&Experiment], reverse: bool) {
        let now = Utc::now();
        experiments.sort_by(|a, b| {
            let ordering = self.compare(a, b, now);
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    fn compare(self, a: &Experiment, b: &Experiment, now: DateTime<Utc>) -> Ordering {
        match self {
            Self::Id => a.id().cmp(b.id()),
            Self::Name => a.name().cmp(b.name()),
            Self::Status => a.status().as_str().cmp(b.status().as_str()),
            Self::StartTime => a.start_time().ok().cmp(&b.start_time().ok()),
            Self::EndTime => a.end_time().cmp(&b.end_time()),
            Self::Duration => match (a.duration_at(now), b.duration_at(now)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
            },
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// Filter over status and tags (AND semantics; empty means "any").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentFilter {
    statuses: Vec<ExperimentStatus>,
    tags: Vec<String>,
}

impl ExperimentFilter {
    /// Create a filter that matches every experiment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept experiments with this status (may be called repeatedly).
    #[must_use]
    pub fn status(mut self, status: ExperimentStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// Accept experiments with any of these statuses.
    #[must_use]
    pub fn statuses(self, statuses: impl IntoIterator<Item = ExperimentStatus>) -> Self {
        statuses.into_iter().fold(self, Self::status)
    }

    /// Require this tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Require all of these tags.
    #[must_use]
    pub fn tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// True if `experiment` passes both the status and the tag filter.
    #[must_use]
    pub fn matches(&self, experiment: &Experiment) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&experiment.status()) {
            return false;
        }
        self.tags.iter().all(|tag| experiment.has_tag(tag))
    }
}

/// Collection of experiments keyed by ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentCollection {
    #[serde(default)]
    experiments: BTreeMap<String, Experiment>,
}

impl ExperimentCollection {
    /// Create a new empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments.
    #[must_use]
    pub fn count(&self) -> usize {
        self.experiments.len()
    }

    /// True if the collection holds no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Insert or replace an experiment (upsert by ID).
    ///
    /// Returns the experiment previously stored under the same ID.
    pub fn add(&mut self, experiment: Experiment) -> Option<Experiment> {
        self.experiments
            .insert(experiment.id().to_string(), experiment)
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Experiment> {
        self.experiments.get(id)
    }

    /// Get a mutable experiment by ID.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Experiment> {
        self.experiments.get_mut(id)
    }

    /// True if an experiment with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.experiments.contains_key(id)
    }

    /// Remove an experiment. No-op if absent.
    pub fn remove(&mut self, id: &str) -> Option<Experiment> {
        self.experiments.remove(id)
    }

    /// Iterate over experiments in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.values()
    }

    /// New collection holding only the experiments `filter` accepts.
    #[must_use]
    pub fn filter(&self, filter: &ExperimentFilter) -> Self {
        self.iter()
            .filter(|experiment| filter.matches(experiment))
            .cloned()
            .collect()
    }

    /// Sort by a field name (`id`, `name`, `status`, `start_time`,
    /// `end_time`, `duration`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for any other name.
    pub fn sort_by(&self, field: &str, reverse: bool) -> Result<Vec<&Experiment>> {
        Ok(self.sort_by_field(field.parse()?, reverse))
    }

    /// Sort by a typed field. The sort is stable; ties keep ID order in both
    /// directions. Missing end times and durations sort first.
    #[must_use]
    pub fn sort_by_field(&self, field: SortField, reverse: bool) -> Vec<&Experiment> {
        let mut experiments: Vec<&Experiment> = self.iter().collect();
        field.sort(&mut experiments, reverse);
        experiments
    }

    /// Experiments still running.
    #[must_use]
    pub fn running(&self) -> Self {
        self.filter(&ExperimentFilter::new().status(ExperimentStatus::Running))
    }

    /// Experiments that completed normally.
    #[must_use]
    pub fn completed(&self) -> Self {
        self.filter(&ExperimentFilter::new().status(ExperimentStatus::Completed))
    }

    /// Experiments that failed.
    #[must_use]
    pub fn failed(&self) -> Self {
        self.filter(&ExperimentFilter::new().status(ExperimentStatus::Error))
    }

    /// Experiments that were interrupted.
    #[must_use]
    pub fn interrupted(&self) -> Self {
        self.filter(&ExperimentFilter::new().status(ExperimentStatus::Interrupted))
    }

    /// Number of experiments with `status`, without cloning.
    #[must_use]
    pub fn count_by_status(&self, status: ExperimentStatus) -> usize {
        self.iter().filter(|e| e.status() == status).count()
    }

    /// Most recently started running experiment.
    #[must_use]
    pub fn latest_running(&self) -> Option<&Experiment> {
        self.iter()
            .filter(|e| e.status() == ExperimentStatus::Running)
            .max_by_key(|e| e.start_time().ok())
    }
}

impl FromIterator<Experiment> for ExperimentCollection {
    fn from_iter<I: IntoIterator<Item = Experiment>>(iter: I) -> Self {
        let mut collection = Self::new();
        for experiment in iter {
            collection.add(experiment);
        }
        collection
    }
}
