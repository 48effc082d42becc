//! Experiment Status - derived lifecycle state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Status of an experiment, derived from its log.
///
/// Precedence: any Error event ⇒ `Error`; else the last End event ⇒
/// `Completed` or `Interrupted`; else `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// No End or Error event yet.
    Running,
    /// Ended normally.
    Completed,
    /// At least one Error event.
    Error,
    /// Ended with an "interrupted" End event.
    Interrupted,
}

impl ExperimentStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 4] = [
        Self::Running,
        Self::Completed,
        Self::Error,
        Self::Interrupted,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        }
    }

    /// True for `Completed`, `Error` and `Interrupted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown status: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_roundtrip() {
        for status in ExperimentStatus::ALL {
            assert_eq!(status.as_str().parse::<ExperimentStatus>().unwrap(), status);
        }
        assert_eq!(
            "COMPLETED".parse::<ExperimentStatus>().unwrap(),
            ExperimentStatus::Completed
        );
        assert!("paused".parse::<ExperimentStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ExperimentStatus::Running.is_terminal());
        assert!(ExperimentStatus::Completed.is_terminal());
        assert!(ExperimentStatus::Error.is_terminal());
        assert!(ExperimentStatus::Interrupted.is_terminal());
    }
}
