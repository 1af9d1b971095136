use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Table;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats (none of them carry a header row):
/// * `.csv` / `.txt` – comma-separated cells, one row per line
/// * `.tsv`          – tab-separated cells
/// * `.json`         – `[[1.0, 2.0], [3.0, 4.0]]`
/// * `.parquet`      – every column is a numeric table column, names ignored
///
/// A path that cannot be opened as a regular file is `NotFound`; anything
/// wrong with the contents is `Parse`.
pub fn load_table(path: &Path) -> Result<Table, PipelineError> {
    let file = open_source(path).ok_or_else(|| PipelineError::NotFound {
        path: path.to_path_buf(),
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" => load_delimited(file, b','),
        "tsv" => load_delimited(file, b'\t'),
        "json" => load_json(file),
        "parquet" | "pq" => load_parquet(file),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    }
    .map_err(|cause| PipelineError::Parse {
        path: path.to_path_buf(),
        cause,
    })?;

    log::info!(
        "Loaded {}x{} table from {}",
        table.rows(),
        table.cols(),
        path.display()
    );
    Ok(table)
}

/// Open `path` for reading if it is a regular file.
fn open_source(path: &Path) -> Option<File> {
    let file = File::open(path).ok()?;
    let meta = file.metadata().ok()?;
    meta.is_file().then_some(file)
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Headerless delimited text. Empty cells read as `NaN`.
fn load_delimited(file: File, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_reader(file);

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {}", row_no + 1))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col_no, cell)| parse_cell(cell, row_no, col_no))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    Table::from_rows(rows)
}

fn parse_cell(cell: &str, row: usize, col: usize) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().with_context(|| {
        format!(
            "cell {}{}: '{cell}' is not a number",
            super::model::column_letters(col),
            row + 1
        )
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema: an array of row arrays.
///
/// ```json
/// [
///   [2.0, 4.0],
///   [5.0, null]
/// ]
/// ```
///
/// `null` cells read as `NaN`.
fn load_json(mut file: File) -> Result<Table> {
    let mut text = String::new();
    file.read_to_string(&mut text).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let cells = rec
            .as_array()
            .with_context(|| format!("Row {} is not a JSON array", i + 1))?;
        let row = cells
            .iter()
            .enumerate()
            .map(|(j, v)| match v {
                JsonValue::Null => Ok(f64::NAN),
                other => other
                    .as_f64()
                    .with_context(|| format!("Row {}, cell {}: not a number", i + 1, j + 1)),
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    Table::from_rows(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file whose columns are the table's columns.
///
/// Column names are ignored; schema order gives column order. Float64,
/// Float32, Int64 and Int32 columns are accepted, nulls read as `NaN`.
fn load_parquet(file: File) -> Result<Table> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let n_cols = builder.schema().fields().len();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); n_cols];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let values = extract_f64_column(batch.column(col_idx))
                .with_context(|| format!("column {}", super::model::column_letters(col_idx)))?;
            column.extend(values);
        }
    }

    let n_rows = columns.first().map_or(0, Vec::len);
    Ok(Table::from_fn(n_rows, n_cols, |r, c| columns[c][r]))
}

// -- Parquet / Arrow helpers --

/// Read a numeric Arrow column as `f64`, mapping nulls to `NaN`.
fn extract_f64_column(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let values = match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect()
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)).collect()
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect()
        }
        other => bail!("expected a numeric column, got {other:?}"),
    };
    Ok(values)
}
