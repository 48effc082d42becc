//! Storage Tests
//!
//! Whole-file persistence of the experiment collection.

use std::fs;

use kepler::experiment::{Experiment, ExperimentCollection, ExperimentStatus};
use kepler::storage::{ExperimentStorage, ARTIFACTS_DIR, EXPERIMENTS_FILE};
use kepler::{Config, Error};
use serde_json::json;

fn storage() -> (tempfile::TempDir, ExperimentStorage) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = ExperimentStorage::new(dir.path());
    (dir, storage)
}

#[test]
fn test_save_then_load_round_trip() {
    let (_dir, storage) = storage();

    let mut done = Experiment::builder("exp-1", "resnet")
        .config("lr", 0.01)
        .tag("cv")
        .build();
    done.set_metric("acc", 0.93);
    done.complete();
    let running = Experiment::new("exp-2", "bert");

    let collection: ExperimentCollection = vec![done.clone(), running].into_iter().collect();
    storage.save(&collection).unwrap();

    let loaded = storage.load().unwrap();
    assert_eq!(loaded, collection);
    assert_eq!(loaded.get("exp-1").unwrap(), &done);
    assert_eq!(
        loaded.get("exp-2").unwrap().status(),
        ExperimentStatus::Running
    );
}

#[test]
fn test_file_layout() {
    let (dir, storage) = storage();
    storage.upsert(&Experiment::new("exp-1", "layout")).unwrap();

    let text = fs::read_to_string(dir.path().join(EXPERIMENTS_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let events = &value["experiments"]["exp-1"]["events"];
    assert_eq!(value["experiments"]["exp-1"]["name"], "layout");
    assert_eq!(events[0]["kind"], "start");
    assert_eq!(events[0]["message"], "Experiment started");

    let artifact_dir = storage.experiment_dir("exp-1").unwrap();
    assert_eq!(artifact_dir, dir.path().join(ARTIFACTS_DIR).join("exp-1"));
    assert!(artifact_dir.is_dir());
}

#[test]
fn test_legacy_file_is_readable() {
    let (_dir, storage) = storage();
    let legacy = json!({
        "experiments": {
            "old-1": {
                "id": "old-1",
                "name": "Legacy run",
                "logs": [
                    {"created_at": "2023-05-01T10:00:00.123456", "kind": "start",
                     "message": "Experiment started", "data": {}},
                    {"created_at": "2023-05-01T10:05:00", "kind": "metric",
                     "message": "Metric: acc = 0.8", "data": {"name": "acc", "value": 0.8}},
                    {"created_at": "2023-05-01T10:10:00", "kind": "end",
                     "message": "Experiment interrupted", "data": {}}
                ]
            }
        }
    });
    fs::write(storage.experiments_file(), legacy.to_string()).unwrap();

    let collection = storage.try_load().unwrap();
    let exp = collection.get("old-1").unwrap();
    assert_eq!(exp.status(), ExperimentStatus::Interrupted);
    assert_eq!(exp.metrics()["acc"], json!(0.8));
    let duration = exp.duration().unwrap();
    assert!((duration - 599.876_544).abs() < 1e-3);
}

#[test]
fn test_corrupt_file_recovers_to_empty() {
    let (_dir, storage) = storage();
    fs::write(storage.experiments_file(), "[1, 2, 3").unwrap();

    assert!(matches!(storage.try_load(), Err(Error::CorruptState(_))));
    let recovered = storage.load().unwrap();
    assert!(recovered.is_empty());

    // the next save replaces the corrupt document
    storage.upsert(&Experiment::new("fresh", "fresh")).unwrap();
    assert_eq!(storage.try_load().unwrap().count(), 1);
}

#[test]
fn test_event_missing_required_data_is_corrupt() {
    let (_dir, storage) = storage();
    let bad = json!({
        "experiments": {
            "x": {"id": "x", "name": "x", "events": [
                {"created_at": "2024-01-01T00:00:00Z", "kind": "config", "message": "", "data": {"key": "lr"}}
            ]}
        }
    });
    fs::write(storage.experiments_file(), bad.to_string()).unwrap();
    assert!(matches!(storage.try_load(), Err(Error::CorruptState(_))));
}

#[test]
fn test_upsert_and_update() {
    let (_dir, storage) = storage();
    storage.upsert(&Experiment::new("exp-1", "first")).unwrap();
    storage.upsert(&Experiment::new("exp-2", "second")).unwrap();

    let updated = storage
        .update("exp-1", |exp| {
            exp.set_metric("loss", 0.1);
            exp.complete();
        })
        .unwrap();
    assert_eq!(updated.status(), ExperimentStatus::Completed);

    let loaded = storage.load().unwrap();
    assert_eq!(loaded.count(), 2);
    assert_eq!(loaded.get("exp-1").unwrap(), &updated);
    assert_eq!(
        loaded.get("exp-2").unwrap().status(),
        ExperimentStatus::Running
    );
}

#[test]
fn test_storage_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::builder().home(dir.path()).build();
    let storage = ExperimentStorage::from_config(&config);
    assert_eq!(storage.root(), dir.path());
    assert_eq!(storage.experiments_file(), dir.path().join(EXPERIMENTS_FILE));
}
