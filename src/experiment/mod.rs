//! Event-Sourced Experiment Model
//!
//! Experiments are recorded as an append-only log of typed events; every
//! observable attribute is a pure function of that log.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentCollection (1) ──< Experiment (N) ──< LogEvent (N) [append-only]
//!                                   │
//!                                   └── status / config / metrics / tags /
//!                                       artifacts / progress  [derived]
//! ```
//!
//! ## Derivation Rules
//!
//! - `status`: Error anywhere ⇒ ERROR; else last End ⇒ COMPLETED or
//!   INTERRUPTED; else RUNNING
//! - `config` / `metrics` / `artifacts`: last writer wins per key
//! - `tags`: first occurrence order, deduplicated
//!
//! ## Usage
//!
//! ```rust
//! use kepler::experiment::{Experiment, ExperimentCollection, ExperimentStatus};
//!
//! let mut experiment = Experiment::new("exp-001", "My Experiment");
//! experiment.set_config("lr", 0.01);
//! experiment.set_metric("acc", 0.9);
//! experiment.set_metric("acc", 0.95);
//! experiment.add_tag("demo");
//! experiment.complete();
//!
//! assert_eq!(experiment.status(), ExperimentStatus::Completed);
//! assert_eq!(experiment.metrics()["acc"], 0.95);
//!
//! let mut collection = ExperimentCollection::new();
//! collection.add(experiment);
//! assert_eq!(collection.completed().count(), 1);
//! ```

mod collection;
mod experiment_record;
pub mod log;
mod status;

pub use collection::{ExperimentCollection, ExperimentFilter, SortField};
pub use experiment_record::{Experiment, ExperimentBuilder};
pub use log::{LogEvent, LogKind, LogPayload, Progress};
pub use status::ExperimentStatus;
