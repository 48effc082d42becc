//! Live terminal viewer
//!
//! Polls the keyboard every tick and reloads the collection whenever the
//! file watcher reports a change to `experiments.json`. Reloads replace the
//! whole collection, never patch it.

pub mod app;
pub mod ui;
pub mod watcher;

use std::io;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};

use self::app::{Action, App};
use self::watcher::CollectionWatcher;
use crate::config::Config;
use crate::storage::ExperimentStorage;
use crate::Result;

/// Run the viewer until the user quits.
///
/// # Errors
///
/// Returns error if the terminal cannot be set up or drawn, or the
/// application directory cannot be watched.
pub fn run(config: &Config) -> Result<()> {
    let watcher = CollectionWatcher::new(config.home())?;
    let mut app = App::new(ExperimentStorage::from_config(config));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(home = %config.home().display(), "viewer started");
    let res = run_app(&mut terminal, &mut app, &watcher, config);

    let restored = restore_terminal(disable_raw_mode(), &mut terminal);
    if let Err(e) = &res {
        error!(error = %e, "viewer exited with error");
    }
    res.and(restored)
}

/// Leave the alternate screen and show the cursor, whatever happened when
/// raw mode was disabled. The first failure is reported.
fn restore_terminal<B: Backend + io::Write>(
    raw_mode: io::Result<()>,
    terminal: &mut Terminal<B>,
) -> Result<()> {
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let cursor = terminal.show_cursor();
    raw_mode.and(screen).and(cursor)?;
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    watcher: &CollectionWatcher,
    config: &Config,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(config.tick_rate())? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = app.handle_key_event(key) {
                        app.update(action);
                    }
                }
            }
        }

        if watcher.changed() {
            app.update(Action::Reload);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
