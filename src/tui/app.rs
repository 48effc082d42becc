//! Viewer state and key handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::experiment::{Experiment, ExperimentCollection, ExperimentFilter, ExperimentStatus, SortField};
use crate::storage::ExperimentStorage;

/// User intents decoded from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the viewer
    Quit,
    /// Re-read the collection file
    Reload,
    /// Toggle the running-only filter
    ToggleFilter,
    /// Move selection (or scroll) down
    Next,
    /// Move selection (or scroll) up
    Previous,
    /// Open the log view of the selected experiment
    OpenLogs,
    /// Return to the experiment list
    Back,
}

/// Screen currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Table of experiments
    Experiments,
    /// Event log of one experiment
    Logs {
        /// Experiment being shown
        experiment_id: String,
    },
}

/// Viewer state.
#[derive(Debug)]
pub struct App {
    storage: ExperimentStorage,
    /// Last loaded snapshot; replaced wholesale on reload
    pub collection: ExperimentCollection,
    /// Current screen
    pub view: View,
    /// Show only running experiments
    pub running_only: bool,
    /// Selected row in the experiment table
    pub selected: usize,
    /// First visible line of the log view
    pub log_scroll: u16,
    /// Set once the user asked to quit
    pub should_quit: bool,
    /// Transient message shown in the footer
    pub status_line: Option<String>,
}

impl App {
    /// Create the viewer over `storage` and load the collection.
    #[must_use]
    pub fn new(storage: ExperimentStorage) -> Self {
        let mut app = Self {
            storage,
            collection: ExperimentCollection::new(),
            view: View::Experiments,
            running_only: false,
            selected: 0,
            log_scroll: 0,
            should_quit: false,
            status_line: None,
        };
        app.reload();
        app
    }

    /// Map a key press to an action for the current view.
    #[must_use]
    pub fn handle_key_event(&self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        match (&self.view, key.code) {
            (_, KeyCode::Char('q')) => Some(Action::Quit),
            (_, KeyCode::Char('r')) => Some(Action::Reload),
            (_, KeyCode::Char('j') | KeyCode::Down) => Some(Action::Next),
            (_, KeyCode::Char('k') | KeyCode::Up) => Some(Action::Previous),
            (View::Experiments, KeyCode::Char('f')) => Some(Action::ToggleFilter),
            (View::Experiments, KeyCode::Enter | KeyCode::Char('l')) => Some(Action::OpenLogs),
            (View::Logs { .. }, KeyCode::Char('b') | KeyCode::Esc) => Some(Action::Back),
            _ => None,
        }
    }

    /// Apply an action.
    pub fn update(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Reload => self.reload(),
            Action::ToggleFilter => {
                let current = self.selected_id();
                self.running_only = !self.running_only;
                self.select_id(current.as_deref());
            }
            Action::Next => match self.view {
                View::Experiments => {
                    let len = self.visible().len();
                    if len > 0 {
                        self.selected = (self.selected + 1).min(len - 1);
                    }
                }
                View::Logs { .. } => self.log_scroll = self.log_scroll.saturating_add(1),
            },
            Action::Previous => match self.view {
                View::Experiments => self.selected = self.selected.saturating_sub(1),
                View::Logs { .. } => self.log_scroll = self.log_scroll.saturating_sub(1),
            },
            Action::OpenLogs => {
                if let Some(id) = self.selected_id() {
                    self.view = View::Logs { experiment_id: id };
                    self.log_scroll = 0;
                }
            }
            Action::Back => self.view = View::Experiments,
        }
    }

    /// Swap in a freshly loaded collection, keeping the selection by ID.
    pub fn reload(&mut self) {
        let current = self.selected_id();
        match self.storage.load() {
            Ok(collection) => {
                debug!(experiments = collection.count(), "viewer reloaded collection");
                self.collection = collection;
                self.status_line = None;
            }
            Err(e) => {
                warn!(error = %e, "viewer reload failed");
                self.status_line = Some(format!("Reload failed: {e}"));
                return;
            }
        }
        self.select_id(current.as_deref());

        if let View::Logs { experiment_id } = &self.view {
            if !self.collection.contains(experiment_id) {
                self.status_line = Some(format!("Experiment {experiment_id} was removed"));
                self.view = View::Experiments;
            }
        }
    }

    /// Experiments shown in the table, newest first.
    #[must_use]
    pub fn visible(&self) -> Vec<&Experiment> {
        let mut filter = ExperimentFilter::new();
        if self.running_only {
            filter = filter.status(ExperimentStatus::Running);
        }
        let mut experiments: Vec<&Experiment> =
            self.collection.iter().filter(|e| filter.matches(e)).collect();
        SortField::StartTime.sort(&mut experiments, true);
        experiments
    }

    /// Experiment under the cursor.
    #[must_use]
    pub fn selected_experiment(&self) -> Option<&Experiment> {
        self.visible().get(self.selected).copied()
    }

    /// Experiment shown in the log view, if that view is open.
    #[must_use]
    pub fn log_experiment(&self) -> Option<&Experiment> {
        match &self.view {
            View::Logs { experiment_id } => self.collection.get(experiment_id),
            View::Experiments => None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_experiment().map(|e| e.id().to_string())
    }

    fn select_id(&mut self, id: Option<&str>) {
        let visible = self.visible();
        let position = id.and_then(|id| visible.iter().position(|e| e.id() == id));
        self.selected = position.unwrap_or_else(|| self.selected.min(visible.len().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn seeded(dir: &std::path::Path) -> ExperimentStorage {
        let storage = ExperimentStorage::new(dir);
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut collection = ExperimentCollection::new();
        for (i, id) in ["old", "mid", "new"].iter().enumerate() {
            let mut exp = Experiment::builder(*id, *id)
                .started_at(t0 + Duration::hours(i64::try_from(i).unwrap()))
                .build();
            if *id == "mid" {
                exp.complete();
            }
            collection.add(exp);
        }
        storage.save(&collection).unwrap();
        storage
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_visible_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(seeded(dir.path()));
        let ids: Vec<_> = app.visible().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_filter_toggle_keeps_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(seeded(dir.path()));
        app.update(Action::Next);
        app.update(Action::Next);
        assert_eq!(app.selected_experiment().unwrap().id(), "old");

        app.update(Action::ToggleFilter);
        let ids: Vec<_> = app.visible().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(app.selected_experiment().unwrap().id(), "old");
    }

    #[test]
    fn test_selection_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(seeded(dir.path()));
        for _ in 0..10 {
            app.update(Action::Next);
        }
        assert_eq!(app.selected, 2);
        for _ in 0..10 {
            app.update(Action::Previous);
        }
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_key_mapping_depends_on_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(seeded(dir.path()));
        assert_eq!(app.handle_key_event(key(KeyCode::Char('f'))), Some(Action::ToggleFilter));
        assert_eq!(app.handle_key_event(key(KeyCode::Esc)), None);

        app.update(Action::OpenLogs);
        assert_eq!(
            app.view,
            View::Logs {
                experiment_id: "new".to_string()
            }
        );
        assert_eq!(app.handle_key_event(key(KeyCode::Esc)), Some(Action::Back));
        assert_eq!(app.handle_key_event(key(KeyCode::Char('f'))), None);
        assert_eq!(
            app.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_reload_picks_up_changes_and_leaves_removed_log_view() {
        let dir = tempfile::tempdir().unwrap();
        let storage = seeded(dir.path());
        let mut app = App::new(storage.clone());
        app.update(Action::OpenLogs);

        storage.update("new", Experiment::interrupt).unwrap();
        app.update(Action::Reload);
        assert_eq!(
            app.log_experiment().unwrap().status(),
            ExperimentStatus::Interrupted
        );

        let mut collection = storage.load().unwrap();
        collection.remove("new");
        storage.save(&collection).unwrap();
        app.update(Action::Reload);
        assert_eq!(app.view, View::Experiments);
        assert!(app.status_line.as_deref().unwrap().contains("removed"));
    }
}
