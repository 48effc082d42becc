//! Storage backend (single JSON document)
//!
//! **Whole-File Design** (Last-Save-Wins Write Pattern):
//! - The entire [`ExperimentCollection`] is one JSON document
//! - Write pattern: read everything, mutate in memory, write everything back
//! - Writes go to a temporary sibling file that is then renamed over the
//!   target, so readers never observe a half-written document
//! - NOT suitable for: concurrent writers (no locking; the last save wins)
//!
//! ## Layout
//!
//! ```text
//! <home>/
//! ├── experiments.json          # ExperimentCollection
//! └── experiments/
//!     └── <experiment-id>/      # artifact files
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Config;
use crate::experiment::{Experiment, ExperimentCollection};
use crate::{Error, Result};

/// File name of the persisted collection.
pub const EXPERIMENTS_FILE: &str = "experiments.json";

/// Directory (under the home directory) holding per-experiment artifacts.
pub const ARTIFACTS_DIR: &str = "experiments";

/// Persistence gateway for the experiment collection and artifact directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentStorage {
    root: PathBuf,
}

impl ExperimentStorage {
    /// Create a storage rooted at `root` (created lazily on first write).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a storage rooted at the configured home directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.home())
    }

    /// Application directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the persisted collection.
    #[must_use]
    pub fn experiments_file(&self) -> PathBuf {
        self.root.join(EXPERIMENTS_FILE)
    }

    /// Path of an experiment's artifact directory (not created).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` could escape the artifact root.
    pub fn experiment_dir_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(ARTIFACTS_DIR).join(id))
    }

    /// Artifact directory of an experiment, created on demand.
    ///
    /// # Errors
    ///
    /// Returns error if `id` is not a valid directory name or the directory
    /// cannot be created.
    pub fn experiment_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = self.experiment_dir_path(id)?;
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Delete an experiment's artifact directory.
    ///
    /// Returns `true` if a directory existed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory exists but cannot be removed.
    pub fn remove_experiment_dir(&self, id: &str) -> Result<bool> {
        let dir = self.experiment_dir_path(id)?;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        debug!(experiment_id = id, path = %dir.display(), "removed artifact directory");
        Ok(true)
    }

    /// Load the collection, failing on malformed content.
    ///
    /// A missing file is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptState`] if the file is not a valid collection,
    /// or an IO error if it cannot be read.
    pub fn try_load(&self) -> Result<ExperimentCollection> {
        let path = self.experiments_file();
        if !path.exists() {
            debug!(path = %path.display(), "no experiments file yet");
            return Ok(ExperimentCollection::new());
        }
        let text = fs::read_to_string(&path)?;
        let collection: ExperimentCollection = serde_json::from_str(&text)
            .map_err(|e| Error::CorruptState(format!("{}: {e}", path.display())))?;
        debug!(
            path = %path.display(),
            experiments = collection.count(),
            "loaded experiments"
        );
        Ok(collection)
    }

    /// Load the collection, resetting to empty if the file is corrupt.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be read.
    pub fn load(&self) -> Result<ExperimentCollection> {
        match self.try_load() {
            Err(Error::CorruptState(reason)) => {
                warn!(%reason, "error loading experiments file, starting from an empty collection");
                Ok(ExperimentCollection::new())
            }
            other => other,
        }
    }

    /// Overwrite the persisted collection.
    ///
    /// # Errors
    ///
    /// Returns error if the home directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, collection: &ExperimentCollection) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.experiments_file();
        let tmp = self.root.join(format!(".{EXPERIMENTS_FILE}.tmp"));
        let json = serde_json::to_string_pretty(collection)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        debug!(
            path = %path.display(),
            experiments = collection.count(),
            "saved experiments"
        );
        Ok(())
    }

    /// Store one experiment: load, upsert, save.
    ///
    /// # Errors
    ///
    /// Returns error if loading or saving fails.
    pub fn upsert(&self, experiment: &Experiment) -> Result<()> {
        let mut collection = self.load()?;
        collection.add(experiment.clone());
        self.save(&collection)
    }

    /// Apply `f` to a stored experiment and save the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no experiment has `id`, or an error if
    /// loading or saving fails.
    pub fn update<F>(&self, id: &str, f: F) -> Result<Experiment>
    where
        F: FnOnce(&mut Experiment),
    {
        let mut collection = self.load()?;
        let experiment = collection
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        f(experiment);
        let updated = experiment.clone();
        self.save(&collection)?;
        Ok(updated)
    }
}

fn validate_id(id: &str) -> Result<()> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.contains('\0');
    if invalid {
        return Err(Error::InvalidArgument(format!(
            "experiment id {id:?} is not a valid directory name"
        )));
    }
    Ok(())
}
