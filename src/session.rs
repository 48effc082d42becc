//! Experiment Session - scoped acquisition of a running experiment
//!
//! Opening a session creates the experiment (Start, config, tags) and
//! persists it. Closing appends the terminal events and persists again:
//!
//! - [`Session::complete`]: End
//! - [`Session::fail`]: Error, then End
//! - dropped while unwinding from a panic: Error, then End
//! - dropped without being closed: End ("interrupted")
//!
//! Finalization runs at most once per session.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::artifact::{self, TableFormat};
use crate::experiment::Experiment;
use crate::storage::ExperimentStorage;
use crate::Result;

/// Parameters for opening a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    name: String,
    id: Option<String>,
    config: Vec<(String, Value)>,
    tags: Vec<String>,
}

impl SessionOptions {
    /// Options for an experiment called `name` with a generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Use an explicit experiment ID instead of `<name>-<8 hex chars>`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add one configuration parameter.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    /// Add configuration parameters from any key/value iterator.
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

    fn resolve_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            format!("{}-{}", self.name.replace(['/', '\\'], "-"), &suffix[..8])
        })
    }
}

/// Handle on a running experiment.
///
/// Dereferences to [`Experiment`], so the usual mutators (`set_metric`,
/// `update_progress`, ...) are available directly. Those appends stay in
/// memory until [`flush`](Self::flush), an artifact save, or the session
/// closes.
#[derive(Debug)]
pub struct Session {
    storage: ExperimentStorage,
    experiment: Experiment,
    closed: bool,
}

impl Session {
    /// Create the experiment and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// the id cannot name an artifact directory (nothing is stored), or an
    /// error if the collection cannot be loaded or saved.
    pub fn open(storage: &ExperimentStorage, options: SessionOptions) -> Result<Self> {
        let id = options.resolve_id();
        storage.experiment_dir_path(&id)?;
        let experiment = Experiment::builder(id, options.name.clone())
            .start_message(format!("Starting experiment: {}", options.name))
            .configs(options.config)
            .tags(options.tags)
            .build();
        storage.upsert(&experiment)?;
        info!(experiment_id = experiment.id(), name = experiment.name(), "experiment started");
        Ok(Self {
            storage: storage.clone(),
            experiment,
            closed: false,
        })
    }

    /// Experiment held by this session.
    #[must_use]
    pub const fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// Persist the experiment as it is now (e.g. so a viewer sees progress).
    ///
    /// # Errors
    ///
    /// Returns error if the collection cannot be loaded or saved.
    pub fn flush(&self) -> Result<()> {
        self.storage.upsert(&self.experiment)
    }

    /// Save a record batch as an artifact of this experiment.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or the experiment cannot
    /// be persisted.
    pub fn save_table(&mut self, name: &str, batch: &RecordBatch, format: TableFormat) -> Result<PathBuf> {
        let dir = self.storage.experiment_dir(self.experiment.id())?;
        let path = artifact::write_table(&dir, name, batch, format)?;
        self.record_artifact(name, path)
    }

    /// Save a JSON object as an artifact of this experiment.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or the experiment cannot
    /// be persisted.
    pub fn save_dict(&mut self, name: &str, data: &Map<String, Value>) -> Result<PathBuf> {
        let dir = self.storage.experiment_dir(self.experiment.id())?;
        let path = artifact::write_json_map(&dir, name, data)?;
        self.record_artifact(name, path)
    }

    /// Save any serializable record as a JSON artifact of this experiment.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails, or the experiment
    /// cannot be persisted.
    pub fn save_record<T: Serialize + ?Sized>(&mut self, name: &str, record: &T) -> Result<PathBuf> {
        let dir = self.storage.experiment_dir(self.experiment.id())?;
        let path = artifact::write_json_record(&dir, name, record)?;
        self.record_artifact(name, path)
    }

    fn record_artifact(&mut self, name: &str, path: PathBuf) -> Result<PathBuf> {
        self.experiment.add_artifact(name, &path);
        self.flush()?;
        Ok(path)
    }

    /// Close the session as completed.
    ///
    /// # Errors
    ///
    /// Returns error if the experiment cannot be persisted.
    pub fn complete(mut self) -> Result<Experiment> {
        self.finish(Experiment::complete)?;
        Ok(self.experiment.clone())
    }

    /// Close the session as failed with `message`.
    ///
    /// # Errors
    ///
    /// Returns error if the experiment cannot be persisted.
    pub fn fail(mut self, message: &str) -> Result<Experiment> {
        self.finish(|experiment| experiment.fail(message, None))?;
        Ok(self.experiment.clone())
    }

    fn finish<F: FnOnce(&mut Experiment)>(&mut self, close: F) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        close(&mut self.experiment);
        info!(
            experiment_id = self.experiment.id(),
            status = %self.experiment.status(),
            "experiment finished"
        );
        self.storage.upsert(&self.experiment)
    }
}

impl Deref for Session {
    type Target = Experiment;

    fn deref(&self) -> &Experiment {
        &self.experiment
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let result = if std::thread::panicking() {
            self.finish(|experiment| experiment.fail("Experiment panicked", None))
        } else {
            self.finish(Experiment::interrupt)
        };
        if let Err(e) = result {
            error!(experiment_id = self.experiment.id(), error = %e, "failed to persist experiment on drop");
        }
    }
}
