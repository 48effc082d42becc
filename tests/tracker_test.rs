//! Tracker Tests
//!
//! Query API and artifact helpers addressed by explicit target.

use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use kepler::artifact::TableFormat;
use kepler::experiment::{Experiment, ExperimentStatus};
use kepler::session::SessionOptions;
use kepler::storage::ExperimentStorage;
use kepler::tracker::{ArtifactTarget, Tracker};
use kepler::Error;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde_json::{json, Map};

fn tracker() -> (tempfile::TempDir, Tracker) {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracker = Tracker::new(ExperimentStorage::new(dir.path()));
    (dir, tracker)
}

fn batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("step", DataType::Int64, false),
        Field::new("loss", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![0.9, 0.5, 0.2])),
        ],
    )
    .unwrap()
}

#[test]
fn test_get_and_list() {
    let (_dir, tracker) = tracker();
    assert!(tracker.get_experiment("missing").unwrap().is_none());
    assert!(tracker.list_experiments().unwrap().is_empty());

    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();
    assert_eq!(tracker.get_experiment("exp-1").unwrap().unwrap().name(), "one");
    assert_eq!(tracker.list_experiments().unwrap().count(), 1);
}

#[test]
fn test_delete_removes_record_and_artifacts() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();
    tracker.storage().upsert(&Experiment::new("exp-2", "two")).unwrap();
    let path = tracker
        .save_dict("exp-1", "summary", &Map::new())
        .unwrap();
    assert!(path.exists());

    assert!(tracker.delete_experiment("exp-1").unwrap());
    assert!(!path.exists());
    assert!(!tracker.storage().experiment_dir_path("exp-1").unwrap().exists());
    assert!(tracker.get_experiment("exp-1").unwrap().is_none());
    assert!(tracker.get_experiment("exp-2").unwrap().is_some());

    assert!(!tracker.delete_experiment("exp-1").unwrap());
}

#[test]
fn test_save_table_csv_by_id() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();

    let path = tracker
        .save_table("exp-1", "losses", &batch(), TableFormat::Csv)
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "losses.csv");
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next(), Some("step,loss"));

    let exp = tracker.get_experiment("exp-1").unwrap().unwrap();
    assert_eq!(exp.artifacts()["losses"], path);
    assert_eq!(exp.status(), ExperimentStatus::Running);
}

#[test]
fn test_save_table_parquet_is_readable() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();

    let path = tracker
        .save_table("exp-1", "losses", &batch(), TableFormat::Parquet)
        .unwrap();
    assert_eq!(path.extension().unwrap(), "parquet");

    let file = std::fs::File::open(&path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(rows, 3);
}

#[derive(Serialize)]
struct EvalReport {
    accuracy: f64,
    confusion: Vec<Vec<u32>>,
}

#[test]
fn test_save_record_json() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();

    let report = EvalReport {
        accuracy: 0.5,
        confusion: vec![vec![5, 1], vec![2, 4]],
    };
    let path = tracker.save_record("exp-1", "eval", &report).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value, json!({"accuracy": 0.5, "confusion": [[5, 1], [2, 4]]}));
}

#[test]
fn test_unknown_target_is_not_found() {
    let (_dir, tracker) = tracker();
    let err = tracker.save_dict("ghost", "x", &Map::new()).unwrap_err();
    assert!(matches!(err, Error::NotFound(id) if id == "ghost"));
}

#[test]
fn test_latest_running_target() {
    let (_dir, tracker) = tracker();
    let err = tracker
        .save_dict(ArtifactTarget::LatestRunning, "x", &Map::new())
        .unwrap_err();
    assert!(matches!(err, Error::NoActiveExperiment));

    let older = tracker.open(SessionOptions::new("older").id("older")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let newer = tracker.open(SessionOptions::new("newer").id("newer")).unwrap();

    tracker
        .save_dict(ArtifactTarget::LatestRunning, "notes", &Map::new())
        .unwrap();
    let stored = tracker.get_experiment("newer").unwrap().unwrap();
    assert!(stored.artifacts().contains_key("notes"));

    newer.complete().unwrap();
    older.complete().unwrap();
    let err = tracker
        .save_dict(ArtifactTarget::LatestRunning, "late", &Map::new())
        .unwrap_err();
    assert!(matches!(err, Error::NoActiveExperiment));
}

#[test]
fn test_invalid_artifact_name() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("exp-1", "one")).unwrap();
    let err = tracker.save_dict("exp-1", "../escape", &Map::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_table_format_parse() {
    assert_eq!("csv".parse::<TableFormat>().unwrap(), TableFormat::Csv);
    assert!(matches!(
        "xlsx".parse::<TableFormat>(),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_delete_with_unusable_id_leaves_collection_untouched() {
    let (_dir, tracker) = tracker();
    tracker.storage().upsert(&Experiment::new("grid/lr=0.1", "legacy")).unwrap();

    let err = tracker.delete_experiment("grid/lr=0.1").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(tracker.get_experiment("grid/lr=0.1").unwrap().is_some());
}
