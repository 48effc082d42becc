//! Tracker - query and artifact API over the persisted collection
//!
//! ## Example
//!
//! ```rust,no_run
//! use kepler::session::SessionOptions;
//! use kepler::tracker::Tracker;
//!
//! # fn main() -> kepler::Result<()> {
//! let tracker = Tracker::from_env();
//! let id = tracker.run(
//!     SessionOptions::new("Basic Example").config("lr", 0.01).tag("demo"),
//!     |exp| {
//!         exp.set_metric("accuracy", 0.95);
//!         Ok::<_, kepler::Error>(exp.id().to_string())
//!     },
//! )?;
//! assert!(tracker.get_experiment(&id)?.is_some());
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::path::PathBuf;

use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::artifact::{self, TableFormat};
use crate::config::Config;
use crate::experiment::{Experiment, ExperimentCollection};
use crate::session::{Session, SessionOptions};
use crate::storage::ExperimentStorage;
use crate::{Error, Result};

/// Experiment an artifact helper writes to.
///
/// Code running inside a [`Session`] should use the session's own
/// `save_*` methods; these targets are for interactive use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactTarget {
    /// Explicit experiment ID.
    Id(String),
    /// The most recently started running experiment.
    LatestRunning,
}

impl From<&str> for ArtifactTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for ArtifactTarget {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// Entry point for running, querying and deleting experiments.
#[derive(Debug, Clone)]
pub struct Tracker {
    storage: ExperimentStorage,
}

impl Tracker {
    /// Create a tracker over `storage`.
    #[must_use]
    pub const fn new(storage: ExperimentStorage) -> Self {
        Self { storage }
    }

    /// Create a tracker over the configured home directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(ExperimentStorage::from_config(config))
    }

    /// Create a tracker over the home directory resolved from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_config(&Config::from_env())
    }

    /// Underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &ExperimentStorage {
        &self.storage
    }

    /// Open a session; the caller decides how to close it.
    ///
    /// # Errors
    ///
    /// Returns error if the experiment cannot be persisted.
    pub fn open(&self, options: SessionOptions) -> Result<Session> {
        Session::open(&self.storage, options)
    }

    /// Run `body` inside a session.
    ///
    /// On `Ok` the experiment is completed; on `Err` it is failed with the
    /// error's message, persisted, and the original error is returned. A
    /// panic inside `body` fails the experiment while unwinding.
    ///
    /// # Errors
    ///
    /// Returns the error from `body`, or a storage error converted into `E`
    /// if opening or completing the session fails.
    pub fn run<T, E, F>(&self, options: SessionOptions, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Session) -> std::result::Result<T, E>,
        E: From<Error> + Display,
    {
        let mut session = self.open(options)?;
        match body(&mut session) {
            Ok(value) => {
                session.complete()?;
                Ok(value)
            }
            Err(err) => {
                let id = session.id().to_string();
                if let Err(save_err) = session.fail(&err.to_string()) {
                    error!(experiment_id = %id, error = %save_err, "failed to persist failed experiment");
                }
                Err(err)
            }
        }
    }

    /// Get an experiment by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the collection cannot be read.
    pub fn get_experiment(&self, id: &str) -> Result<Option<Experiment>> {
        Ok(self.storage.load()?.remove(id))
    }

    /// All experiments.
    ///
    /// # Errors
    ///
    /// Returns error if the collection cannot be read.
    pub fn list_experiments(&self) -> Result<ExperimentCollection> {
        self.storage.load()
    }

    /// Delete an experiment and its artifact directory.
    ///
    /// Returns `false` if no experiment had `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] before touching the collection if
    /// `id` cannot name an artifact directory, or an error if the collection
    /// cannot be read or written or the artifact directory cannot be removed.
    pub fn delete_experiment(&self, id: &str) -> Result<bool> {
        self.storage.experiment_dir_path(id)?;
        let mut collection = self.storage.load()?;
        if collection.remove(id).is_none() {
            return Ok(false);
        }
        self.storage.save(&collection)?;
        self.storage.remove_experiment_dir(id)?;
        info!(experiment_id = id, "experiment deleted");
        Ok(true)
    }

    /// Save a record batch as an artifact of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] / [`Error::NoActiveExperiment`] if the
    /// target cannot be resolved, or an IO/format error.
    pub fn save_table(
        &self,
        target: impl Into<ArtifactTarget>,
        name: &str,
        batch: &RecordBatch,
        format: TableFormat,
    ) -> Result<PathBuf> {
        let id = self.resolve(&target.into())?;
        let dir = self.storage.experiment_dir(&id)?;
        let path = artifact::write_table(&dir, name, batch, format)?;
        self.record_artifact(&id, name, path)
    }

    /// Save a JSON object as an artifact of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] / [`Error::NoActiveExperiment`] if the
    /// target cannot be resolved, or an IO error.
    pub fn save_dict(
        &self,
        target: impl Into<ArtifactTarget>,
        name: &str,
        data: &Map<String, Value>,
    ) -> Result<PathBuf> {
        let id = self.resolve(&target.into())?;
        let dir = self.storage.experiment_dir(&id)?;
        let path = artifact::write_json_map(&dir, name, data)?;
        self.record_artifact(&id, name, path)
    }

    /// Save a serializable record as a JSON artifact of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] / [`Error::NoActiveExperiment`] if the
    /// target cannot be resolved, or a serialization/IO error.
    pub fn save_record<T: Serialize + ?Sized>(
        &self,
        target: impl Into<ArtifactTarget>,
        name: &str,
        record: &T,
    ) -> Result<PathBuf> {
        let id = self.resolve(&target.into())?;
        let dir = self.storage.experiment_dir(&id)?;
        let path = artifact::write_json_record(&dir, name, record)?;
        self.record_artifact(&id, name, path)
    }

    fn resolve(&self, target: &ArtifactTarget) -> Result<String> {
        let collection = self.storage.load()?;
        match target {
            ArtifactTarget::Id(id) if collection.contains(id) => Ok(id.clone()),
            ArtifactTarget::Id(id) => Err(Error::NotFound(id.clone())),
            ArtifactTarget::LatestRunning => collection
                .latest_running()
                .map(|e| e.id().to_string())
                .ok_or(Error::NoActiveExperiment),
        }
    }

    fn record_artifact(&self, id: &str, name: &str, path: PathBuf) -> Result<PathBuf> {
        self.storage
            .update(id, |experiment| experiment.add_artifact(name, &path))?;
        Ok(path)
    }
}
