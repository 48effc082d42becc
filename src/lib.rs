//! # Kepler: Event-Sourced Experiment Tracking
//!
//! **Version**: 0.2.0
//!
//! Kepler records the lifecycle of named experiments (ML training runs or
//! similar) as an append-only log of typed events. Status, configuration,
//! metrics, tags, artifacts and progress are all derived from that log, and
//! the whole collection is persisted as a single JSON document that a live
//! terminal viewer watches.
//!
//! ## Design Principles
//!
//! - **Event log is the source of truth**: no derived value is stored
//! - **Last writer wins** for config, metrics and artifacts keyed by name
//! - **Whole-file persistence**: load everything, mutate, save atomically
//! - **Scoped sessions**: an experiment always ends with an End event, even
//!   when the code using it fails or panics
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kepler::session::SessionOptions;
//! use kepler::tracker::Tracker;
//!
//! let tracker = Tracker::from_env();
//! tracker.run(
//!     SessionOptions::new("resnet-baseline")
//!         .config("learning_rate", 0.01)
//!         .tag("cv"),
//!     |exp| {
//!         for epoch in 1..=10 {
//!             exp.update_progress(epoch, 10, "")?;
//!             exp.set_metric("loss", 1.0 / epoch as f64);
//!             exp.flush()?;
//!         }
//!         Ok::<_, kepler::Error>(())
//!     },
//! )?;
//!
//! let running = tracker.list_experiments()?.running();
//! println!("{} experiments still running", running.count());
//! # Ok::<(), kepler::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod tui;

pub use config::Config;
pub use error::{Error, Result};
pub use experiment::{Experiment, ExperimentCollection, ExperimentStatus, LogEvent};
pub use tracker::Tracker;
