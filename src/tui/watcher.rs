//! Change notifications for `experiments.json`.

use std::path::Path;
use std::sync::mpsc::{channel, Receiver};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error};

use crate::storage::EXPERIMENTS_FILE;
use crate::Result;

/// Watches the application directory and reports when the collection file
/// may have changed.
pub struct CollectionWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl CollectionWatcher {
    /// Start watching `home` (created if missing).
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or watched.
    pub fn new(home: &Path) -> Result<Self> {
        std::fs::create_dir_all(home)?;
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        watcher.watch(home, RecursiveMode::NonRecursive)?;
        debug!(path = %home.display(), "watching application directory");
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events; `true` if any touched the collection file.
    pub fn changed(&self) -> bool {
        let mut changed = false;
        while let Ok(res) = self.rx.try_recv() {
            match res {
                Ok(event) => {
                    if event
                        .paths
                        .iter()
                        .any(|p| p.file_name().is_some_and(|n| n == EXPERIMENTS_FILE))
                    {
                        changed = true;
                    }
                }
                Err(e) => error!(error = %e, "watch error"),
            }
        }
        changed
    }
}

impl std::fmt::Debug for CollectionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionWatcher").finish_non_exhaustive()
    }
}
