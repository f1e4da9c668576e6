//! Historical training-data ingestion.
//!
//! The historical table is a CSV with two numeric columns, three
//! pipe-separated token-set columns, and four binary label columns. The
//! header is validated up front so a missing required column surfaces as a
//! typed error before any parsing; the body is then read through Arrow's CSV
//! reader with an explicitly constructed schema and extracted row-by-row
//! into [`TrainingRecord`]s.
//!
//! Rows with null or negative numeric fields, or null labels, are unusable
//! and dropped; whether anything usable remains is the trainer's call.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Int64Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::info;

use medrisk_core::{RiskInput, RiskLabel, TrainingRecord};

use crate::StoreError;

/// Separator between tokens within one categorical CSV cell.
const TOKEN_SEPARATOR: char = '|';

const TOKEN_COLUMNS: [&str; 3] = ["conditions", "drug_pattern", "lab_flags"];
const NUMERIC_COLUMNS: [&str; 2] = ["visit_frequency", "mc_days"];

/// Read the historical table into training records.
///
/// Fails with [`StoreError::MissingColumn`] if any required column is absent
/// from the header. An empty (but well-formed) table yields an empty vec.
pub fn read_training_csv(path: &Path) -> Result<Vec<TrainingRecord>, StoreError> {
    let header = read_header(path)?;

    for required in required_columns() {
        if !header.iter().any(|h| h == required) {
            return Err(StoreError::MissingColumn(required.to_string()));
        }
    }

    let schema = build_arrow_schema(&header);
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(File::open(path)?)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for batch in reader {
        let batch = batch?;
        extract_records(&batch, &mut records, &mut dropped)?;
    }

    info!(
        rows = records.len(),
        dropped,
        path = %path.display(),
        "read training data"
    );
    Ok(records)
}

fn required_columns() -> impl Iterator<Item = &'static str> {
    NUMERIC_COLUMNS
        .into_iter()
        .chain(TOKEN_COLUMNS)
        .chain(RiskLabel::ALL.iter().map(|l| l.label_column()))
}

/// Read and split the header line. No full CSV parse here; column names in
/// this table never contain embedded separators.
fn read_header(path: &Path) -> Result<Vec<String>, StoreError> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line
        .trim_end_matches(['\n', '\r'])
        .split(',')
        .map(|name| name.trim().trim_matches('"').to_string())
        .collect())
}

/// Arrow schema in the file's own column order: Int64 for numerics and
/// labels, Utf8 for everything else (token cells and any extra columns).
fn build_arrow_schema(header: &[String]) -> Schema {
    let int_columns: Vec<&str> = NUMERIC_COLUMNS
        .into_iter()
        .chain(RiskLabel::ALL.iter().map(|l| l.label_column()))
        .collect();

    let fields: Vec<Field> = header
        .iter()
        .map(|name| {
            let data_type = if int_columns.contains(&name.as_str()) {
                DataType::Int64
            } else {
                DataType::Utf8
            };
            Field::new(name, data_type, true)
        })
        .collect();
    Schema::new(fields)
}

fn extract_records(
    batch: &RecordBatch,
    records: &mut Vec<TrainingRecord>,
    dropped: &mut usize,
) -> Result<(), StoreError> {
    let visit_col = require_column(batch, NUMERIC_COLUMNS[0])?;
    let mc_col = require_column(batch, NUMERIC_COLUMNS[1])?;
    let token_cols: Vec<&Arc<dyn Array>> = TOKEN_COLUMNS
        .iter()
        .map(|name| require_column(batch, name))
        .collect::<Result<_, _>>()?;
    let label_cols: Vec<&Arc<dyn Array>> = RiskLabel::ALL
        .iter()
        .map(|l| require_column(batch, l.label_column()))
        .collect::<Result<_, _>>()?;
    let id_col = batch.column_by_name("employee_id");

    for row in 0..batch.num_rows() {
        let offset = records.len() + *dropped;

        let (Some(visit), Some(mc)) = (
            get_count(visit_col.as_ref(), row),
            get_count(mc_col.as_ref(), row),
        ) else {
            *dropped += 1;
            continue;
        };

        let mut labels = [false; 4];
        let mut usable = true;
        for (slot, col) in labels.iter_mut().zip(&label_cols) {
            match get_i64(col.as_ref(), row) {
                Some(v) => *slot = v != 0,
                None => {
                    usable = false;
                    break;
                }
            }
        }
        if !usable {
            *dropped += 1;
            continue;
        }

        let employee_id = id_col
            .and_then(|col| get_string(col.as_ref(), row))
            .unwrap_or_else(|| format!("row-{offset}"));

        records.push(TrainingRecord {
            input: RiskInput {
                employee_id,
                visit_frequency: visit,
                mc_days: mc,
                conditions: get_tokens(token_cols[0].as_ref(), row),
                drug_pattern: get_tokens(token_cols[1].as_ref(), row),
                lab_flags: get_tokens(token_cols[2].as_ref(), row),
            },
            labels,
        });
    }
    Ok(())
}

fn require_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Arc<dyn Array>, StoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
}

// ── Column extraction helpers ──

fn get_i64(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .map(|arr| arr.value(row))
}

/// Non-negative counts only; a negative value makes the row unusable.
fn get_count(col: &dyn Array, row: usize) -> Option<u32> {
    get_i64(col, row).and_then(|v| u32::try_from(v).ok())
}

fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
}

/// Split a pipe-separated cell into a token set. Null and whitespace-only
/// cells yield the empty set.
fn get_tokens(col: &dyn Array, row: usize) -> BTreeSet<String> {
    get_string(col, row)
        .map(|cell| {
            cell.split(TOKEN_SEPARATOR)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
