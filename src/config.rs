//! Runtime configuration
//!
//! The application directory holds `experiments.json` and one artifact
//! directory per experiment. It resolves, in order, from an explicit value,
//! the `KEPLER_HOME` environment variable, the platform data directory, and
//! finally `./.kepler`.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the application directory.
pub const HOME_ENV: &str = "KEPLER_HOME";

/// Default viewer poll interval.
pub const DEFAULT_TICK_RATE: Duration = Duration::from_millis(250);

/// Kepler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    home: PathBuf,
    tick_rate: Duration,
}

impl Config {
    /// Create a new config builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Configuration from the environment with default settings.
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().build()
    }

    /// Application directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Viewer poll interval.
    #[must_use]
    pub const fn tick_rate(&self) -> Duration {
        self.tick_rate
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Config builder
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    home: Option<PathBuf>,
    tick_rate: Option<Duration>,
}

impl ConfigBuilder {
    /// Set the application directory explicitly.
    #[must_use]
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the viewer poll interval.
    #[must_use]
    pub const fn tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = Some(tick_rate);
        self
    }

    /// Build the config, resolving unset values from the environment.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            home: self.home.unwrap_or_else(default_home),
            tick_rate: self.tick_rate.unwrap_or(DEFAULT_TICK_RATE),
        }
    }
}

fn default_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir().map_or_else(|| PathBuf::from(".kepler"), |dir| dir.join("kepler"))
}
