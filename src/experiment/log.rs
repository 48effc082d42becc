//! Log Event - immutable, timestamped facts about an experiment
//!
//! Every observable attribute of an [`Experiment`](super::Experiment) is
//! derived by replaying these events in order.
//!
//! ## Wire Format
//!
//! ```text
//! {"created_at": "2025-01-01T12:00:00Z", "kind": "metric",
//!  "message": "Metric: acc = 0.9", "data": {"name": "acc", "value": 0.9}}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Message of the Start event appended on construction.
pub const DEFAULT_START_MESSAGE: &str = "Experiment started";
/// Message of the End event appended by `complete()`.
pub const COMPLETED_MESSAGE: &str = "Experiment completed";
/// Message of the End event appended by `fail()`.
pub const FAILED_MESSAGE: &str = "Experiment failed";
/// Message of the End event appended by `interrupt()`.
pub const INTERRUPTED_MESSAGE: &str = "Experiment interrupted";

/// Kind of a log event (the `kind` field on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Experiment started running.
    Start,
    /// Experiment reached a terminal state.
    End,
    /// Point-in-time progress.
    Progress,
    /// Named measurement.
    Metric,
    /// Saved file location.
    Artifact,
    /// Failure.
    Error,
    /// Informational message.
    Info,
    /// Warning message.
    Warning,
    /// Resource usage sample.
    Resource,
    /// Configuration parameter.
    Config,
    /// Label.
    Tag,
}

impl LogKind {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Progress => "progress",
            Self::Metric => "metric",
            Self::Artifact => "artifact",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Resource => "resource",
            Self::Config => "config",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot carried by a Progress event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Completed units of work.
    pub current: u64,
    /// Total units of work (never zero).
    pub total: u64,
    /// `current / total * 100`.
    pub percentage: f64,
}

impl Progress {
    /// Create a progress snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `total` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(current: u64, total: u64) -> Result<Self> {
        if total == 0 {
            return Err(Error::InvalidArgument(
                "progress total must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            current,
            total,
            percentage: current as f64 / total as f64 * 100.0,
        })
    }
}

/// Variant-specific payload of a [`LogEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    /// Running-state begin.
    Start,
    /// Terminal state; the message decides completed vs. interrupted.
    End,
    /// Failure, overrides any End event.
    Error {
        /// Optional detail text (e.g. a backtrace).
        details: Option<String>,
    },
    /// Progress snapshot.
    Progress(Progress),
    /// Named measurement.
    Metric {
        /// Metric name.
        name: String,
        /// Metric value (any JSON scalar).
        value: Value,
    },
    /// Saved artifact location.
    Artifact {
        /// Artifact name.
        name: String,
        /// Path of the saved file.
        path: PathBuf,
    },
    /// Configuration parameter.
    Config {
        /// Parameter key.
        key: String,
        /// Parameter value.
        value: Value,
    },
    /// Label.
    Tag {
        /// Tag text.
        tag: String,
    },
    /// Informational message.
    Info,
    /// Warning message.
    Warning,
    /// Resource usage sample.
    Resource {
        /// Resource name (e.g. "memory").
        resource_type: String,
        /// Usage value.
        usage: Value,
    },
}

impl LogPayload {
    /// Kind tag of this payload.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        match self {
            Self::Start => LogKind::Start,
            Self::End => LogKind::End,
            Self::Error { .. } => LogKind::Error,
            Self::Progress(_) => LogKind::Progress,
            Self::Metric { .. } => LogKind::Metric,
            Self::Artifact { .. } => LogKind::Artifact,
            Self::Config { .. } => LogKind::Config,
            Self::Tag { .. } => LogKind::Tag,
            Self::Info => LogKind::Info,
            Self::Warning => LogKind::Warning,
            Self::Resource { .. } => LogKind::Resource,
        }
    }

    /// Render the payload as the `data` map used on the wire.
    #[must_use]
    pub fn to_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        match self {
            Self::Start | Self::End | Self::Info | Self::Warning => {}
            Self::Error { details } => {
                if let Some(details) = details {
                    data.insert("error_details".into(), Value::String(details.clone()));
                }
            }
            Self::Progress(progress) => {
                data.insert("current".into(), progress.current.into());
                data.insert("total".into(), progress.total.into());
                data.insert("percentage".into(), progress.percentage.into());
            }
            Self::Metric { name, value } => {
                data.insert("name".into(), Value::String(name.clone()));
                data.insert("value".into(), value.clone());
            }
            Self::Artifact { name, path } => {
                data.insert("name".into(), Value::String(name.clone()));
                data.insert(
                    "path".into(),
                    Value::String(path.to_string_lossy().into_owned()),
                );
            }
            Self::Config { key, value } => {
                data.insert("key".into(), Value::String(key.clone()));
                data.insert("value".into(), value.clone());
            }
            Self::Tag { tag } => {
                data.insert("tag".into(), Value::String(tag.clone()));
            }
            Self::Resource {
                resource_type,
                usage,
            } => {
                data.insert("resource_type".into(), Value::String(resource_type.clone()));
                data.insert("usage".into(), usage.clone());
            }
        }
        data
    }

    fn from_data(kind: LogKind, mut data: Map<String, Value>) -> Result<Self> {
        let payload = match kind {
            LogKind::Start => Self::Start,
            LogKind::End => Self::End,
            LogKind::Info => Self::Info,
            LogKind::Warning => Self::Warning,
            LogKind::Error => Self::Error {
                details: match data.remove("error_details") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s),
                    Some(other) => Some(other.to_string()),
                },
            },
            LogKind::Progress => {
                let current = take_u64(&mut data, kind, "current")?;
                let total = take_u64(&mut data, kind, "total")?;
                Self::Progress(Progress::new(current, total)?)
            }
            LogKind::Metric => Self::Metric {
                name: take_string(&mut data, kind, "name")?,
                value: take_value(&mut data, kind, "value")?,
            },
            LogKind::Artifact => Self::Artifact {
                name: take_string(&mut data, kind, "name")?,
                path: PathBuf::from(take_string(&mut data, kind, "path")?),
            },
            LogKind::Config => Self::Config {
                key: take_string(&mut data, kind, "key")?,
                value: take_value(&mut data, kind, "value")?,
            },
            LogKind::Tag => Self::Tag {
                tag: take_string(&mut data, kind, "tag")?,
            },
            LogKind::Resource => Self::Resource {
                resource_type: take_string(&mut data, kind, "resource_type")?,
                usage: take_value(&mut data, kind, "usage")?,
            },
        };
        Ok(payload)
    }
}

fn take_value(data: &mut Map<String, Value>, kind: LogKind, field: &str) -> Result<Value> {
    data.remove(field).ok_or_else(|| {
        Error::CorruptState(format!("{kind} event is missing data field '{field}'"))
    })
}

fn take_string(data: &mut Map<String, Value>, kind: LogKind, field: &str) -> Result<String> {
    match take_value(data, kind, field)? {
        Value::String(s) => Ok(s),
        other => Err(Error::CorruptState(format!(
            "{kind} event field '{field}' must be a string, got {other}"
        ))),
    }
}

fn take_u64(data: &mut Map<String, Value>, kind: LogKind, field: &str) -> Result<u64> {
    let value = take_value(data, kind, field)?;
    value.as_u64().ok_or_else(|| {
        Error::CorruptState(format!(
            "{kind} event field '{field}' must be a non-negative integer, got {value}"
        ))
    })
}

/// Render a JSON value the way it appears in human-readable messages
/// (strings without quotes).
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One immutable, timestamped entry in an experiment's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawLogEvent", try_from = "RawLogEvent")]
pub struct LogEvent {
    created_at: DateTime<Utc>,
    message: String,
    payload: LogPayload,
}

impl LogEvent {
    /// Create an event from a payload and message, stamped with the current time.
    #[must_use]
    pub fn new(payload: LogPayload, message: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            message: message.into(),
            payload,
        }
    }

    /// Start event.
    #[must_use]
    pub fn start(message: impl Into<String>) -> Self {
        Self::new(LogPayload::Start, message)
    }

    /// End event. A message containing "interrupted" marks the experiment
    /// interrupted instead of completed.
    #[must_use]
    pub fn end(message: impl Into<String>) -> Self {
        Self::new(LogPayload::End, message)
    }

    /// Error event with optional details.
    #[must_use]
    pub fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Self::new(LogPayload::Error { details }, message)
    }

    /// Progress event. An empty message renders as `"Progress: {current}/{total}"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `total` is zero.
    pub fn progress(current: u64, total: u64, message: &str) -> Result<Self> {
        let progress = Progress::new(current, total)?;
        let message = if message.is_empty() {
            format!("Progress: {current}/{total}")
        } else {
            message.to_string()
        };
        Ok(Self::new(LogPayload::Progress(progress), message))
    }

    /// Metric event.
    #[must_use]
    pub fn metric(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        let message = format!("Metric: {name} = {}", display_value(&value));
        Self::new(LogPayload::Metric { name, value }, message)
    }

    /// Artifact event.
    #[must_use]
    pub fn artifact(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let name = name.into();
        let path = path.as_ref().to_path_buf();
        let message = format!("Artifact saved: {name} at {}", path.display());
        Self::new(LogPayload::Artifact { name, path }, message)
    }

    /// Config event.
    #[must_use]
    pub fn config(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        let message = format!("Config: {key} = {}", display_value(&value));
        Self::new(LogPayload::Config { key, value }, message)
    }

    /// Tag event.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let message = format!("Tag added: {tag}");
        Self::new(LogPayload::Tag { tag }, message)
    }

    /// Info event.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogPayload::Info, message)
    }

    /// Warning event.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogPayload::Warning, message)
    }

    /// Resource usage event.
    #[must_use]
    pub fn resource(resource_type: impl Into<String>, usage: impl Into<Value>) -> Self {
        let resource_type = resource_type.into();
        let usage = usage.into();
        let message = format!("Resource usage: {resource_type} = {}", display_value(&usage));
        Self::new(
            LogPayload::Resource {
                resource_type,
                usage,
            },
            message,
        )
    }

    /// Replace the creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the event kind.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        self.payload.kind()
    }

    /// Get the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the variant payload.
    #[must_use]
    pub const fn payload(&self) -> &LogPayload {
        &self.payload
    }

    /// Get the payload rendered as a `data` map.
    #[must_use]
    pub fn data(&self) -> Map<String, Value> {
        self.payload.to_data()
    }
}

/// On-disk shape of a [`LogEvent`].
#[derive(Serialize, Deserialize)]
struct RawLogEvent {
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    kind: LogKind,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Map<String, Value>,
}

impl From<LogEvent> for RawLogEvent {
    fn from(event: LogEvent) -> Self {
        Self {
            created_at: event.created_at,
            kind: event.kind(),
            data: event.payload.to_data(),
            message: event.message,
        }
    }
}

impl TryFrom<RawLogEvent> for LogEvent {
    type Error = Error;

    fn try_from(raw: RawLogEvent) -> Result<Self> {
        Ok(Self {
            created_at: raw.created_at,
            message: raw.message,
            payload: LogPayload::from_data(raw.kind, raw.data)?,
        })
    }
}

/// Accept RFC 3339 timestamps and offset-less ISO-8601 ones (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
