//! Artifact writers (CSV / Parquet / JSON)
//!
//! Each writer stores one file named `<name>.<ext>` in a directory and
//! returns its path. Recording the artifact on an experiment is the
//! caller's job (see [`crate::session::Session`] and [`crate::tracker::Tracker`]).

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::experiment::log::display_value;
use crate::{Error, Result};

/// On-disk format of tabular artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// Apache Parquet (uncompressed).
    Parquet,
}

impl TableFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            _ => Err(Error::InvalidArgument(format!("Unsupported format: {s}"))),
        }
    }
}

/// Write a record batch as `<dir>/<name>.csv` or `<dir>/<name>.parquet`.
///
/// # Errors
///
/// Returns error if `name` is not a plain file name or writing fails.
pub fn write_table(dir: &Path, name: &str, batch: &RecordBatch, format: TableFormat) -> Result<PathBuf> {
    let path = artifact_path(dir, name, format.extension())?;
    let file = File::create(&path)?;
    match format {
        TableFormat::Csv => {
            let mut writer = arrow::csv::WriterBuilder::new()
                .with_header(true)
                .build(file);
            writer.write(batch)?;
        }
        TableFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }
    Ok(path)
}

/// Write a JSON object as pretty-printed `<dir>/<name>.json`.
///
/// # Errors
///
/// Returns error if `name` is not a plain file name or writing fails.
pub fn write_json_map(dir: &Path, name: &str, data: &Map<String, Value>) -> Result<PathBuf> {
    write_json_record(dir, name, data)
}

/// Write any serializable record as pretty-printed `<dir>/<name>.json`.
///
/// # Errors
///
/// Returns error if `name` is not a plain file name, serialization fails or
/// writing fails.
pub fn write_json_record<T: Serialize + ?Sized>(dir: &Path, name: &str, record: &T) -> Result<PathBuf> {
    let path = artifact_path(dir, name, "json")?;
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

fn artifact_path(dir: &Path, name: &str, extension: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::InvalidArgument(format!(
            "artifact name {name:?} is not a plain file name"
        )));
    }
    Ok(dir.join(format!("{name}.{extension}")))
}

/// Build a record batch from JSON rows (one object per row).
///
/// Columns appear in first-seen order across rows. Column types are
/// inferred: all integers ⇒ Int64, all numbers ⇒ Float64, all booleans ⇒
/// Boolean, anything else ⇒ Utf8. Missing keys and `null` become nulls.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when `rows` is empty or has no columns.
pub fn rows_to_batch(rows: &[Map<String, Value>]) -> Result<RecordBatch> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    if columns.is_empty() {
        return Err(Error::InvalidArgument(
            "cannot build a table from zero rows or columns".to_string(),
        ));
    }

    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for column in columns {
        let values: Vec<Option<&Value>> = rows
            .iter()
            .map(|row| row.get(column).filter(|v| !v.is_null()))
            .collect();
        let (data_type, array) = infer_column(&values);
        fields.push(Field::new(column, data_type, true));
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn infer_column(values: &[Option<&Value>]) -> (DataType, ArrayRef) {
    let present = || values.iter().flatten();
    if present().all(|v| v.is_i64()) {
        let data: Vec<Option<i64>> = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
        return (DataType::Int64, Arc::new(Int64Array::from(data)));
    }
    if present().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
        return (DataType::Float64, Arc::new(Float64Array::from(data)));
    }
    if present().all(|v| v.is_boolean()) {
        let data: Vec<Option<bool>> = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
        return (DataType::Boolean, Arc::new(BooleanArray::from(data)));
    }
    let data: Vec<Option<String>> = values.iter().map(|v| v.map(display_value)).collect();
    (DataType::Utf8, Arc::new(StringArray::from(data)))
}
