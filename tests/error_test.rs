//! Tests for error types

use kepler::Error;

#[test]
fn test_invalid_argument_error() {
    let error = Error::InvalidArgument("Unsupported format: xlsx".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid argument"));
    assert!(error_str.contains("xlsx"));
}

#[test]
fn test_not_found_error() {
    let error = Error::NotFound("exp-404".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Experiment not found"));
    assert!(error_str.contains("exp-404"));
}

#[test]
fn test_unknown_field_error_lists_valid_fields() {
    let error = Error::UnknownField("accuracy".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Unknown field: accuracy"));
    assert!(error_str.contains("start_time"));
    assert!(error_str.contains("duration"));
}

#[test]
fn test_corrupt_state_error() {
    let error = Error::CorruptState("expected value at line 1 column 1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Corrupt experiments file"));
    assert!(error_str.contains("line 1"));
}

#[test]
fn test_no_active_experiment_error() {
    let error = Error::NoActiveExperiment;
    let error_str = format!("{error}");
    assert!(error_str.contains("No running experiments found"));
    assert!(error_str.contains("explicit experiment id"));
}

#[test]
fn test_empty_experiment_error() {
    let error = Error::EmptyExperiment("exp-1".to_string());
    assert_eq!(format!("{error}"), "Experiment exp-1 has no log events");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").starts_with("JSON error"));
}

#[test]
fn test_error_debug_format() {
    let error = Error::NotFound("exp-1".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NotFound"));
}
