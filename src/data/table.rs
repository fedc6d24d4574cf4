use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::array::NumericArray;
use super::npy::{decode_npy, encode_npy};
use crate::error::{Error, Result};
use crate::raster::{FACTOR_IDX, MultitrialRaster, NEURON_IDX, SPIKE_TIME, TRIAL_IDX};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raster from a local file or directory.  Dispatch by extension.
///
/// Supported layouts:
/// * `.parquet` – one row per spike, primitive columns `spike_time`,
///   `trial_idx`, `neuron_idx` and optionally `factor_idx`
/// * `.csv`     – same columns, with a header row
/// * `.json`    – `{ "spike_time": [...], "trial_idx": [...], ... }`
/// * directory  – `spike_time.npy`, `trial_idx.npy`, `neuron_idx.npy`
///   and optionally `factor_idx.npy`
pub fn load_raster_file(path: &Path) -> Result<MultitrialRaster> {
    let raster = if path.is_dir() {
        load_npy_dir(path)?
    } else {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => load_parquet(path),
            "json" => load_json(path),
            "csv" => load_csv(path),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }?
    };

    let factors = if raster.factor_idx().is_some() {
        " (with factors)"
    } else {
        ""
    };
    log::info!(
        "loaded {} spikes from {}{factors}",
        raster.spike_count(),
        path.display()
    );
    Ok(raster)
}

/// Assemble a raster from named columns, failing on a missing required one.
fn from_columns(mut columns: BTreeMap<String, NumericArray>) -> Result<MultitrialRaster> {
    let mut take = |name: &str| {
        columns
            .remove(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    };
    let spike_time = take(SPIKE_TIME)?;
    let trial_idx = take(TRIAL_IDX)?;
    let neuron_idx = take(NEURON_IDX)?;
    let factor_idx = take(FACTOR_IDX).ok();

    let raster = MultitrialRaster::new(spike_time, trial_idx, neuron_idx);
    Ok(match factor_idx {
        Some(f) => raster.with_factor_idx(f),
        None => raster,
    })
}

// ---------------------------------------------------------------------------
// NPY directory
// ---------------------------------------------------------------------------

fn load_npy_dir(dir: &Path) -> Result<MultitrialRaster> {
    let mut columns = BTreeMap::new();
    for name in [SPIKE_TIME, TRIAL_IDX, NEURON_IDX, FACTOR_IDX] {
        let file = dir.join(format!("{name}.npy"));
        if file.is_file() {
            columns.insert(name.to_string(), decode_npy(&std::fs::read(&file)?)?);
        }
    }
    from_columns(columns)
}

/// Write each array of the raster to `<dir>/<name>.npy`.
pub fn write_raster_npy_dir(raster: &MultitrialRaster, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (name, array) in raster.figure_data() {
        std::fs::write(dir.join(format!("{name}.npy")), encode_npy(array)?)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (column-oriented, `df.to_json(orient='list')`):
///
/// ```json
/// {
///   "spike_time": [0.1, 0.2, 0.3],
///   "trial_idx":  [0, 0, 1],
///   "neuron_idx": [5, 5, 7]
/// }
/// ```
///
/// `spike_time` is always read as float64; the index columns become int64
/// when every entry is an integer, float64 otherwise.
fn load_json(path: &Path) -> Result<MultitrialRaster> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;
    let obj = root
        .as_object()
        .ok_or_else(|| Error::InvalidValue("expected a top-level JSON object".into()))?;

    let mut columns = BTreeMap::new();
    for name in [SPIKE_TIME, TRIAL_IDX, NEURON_IDX, FACTOR_IDX] {
        if let Some(values) = obj.get(name).and_then(|v| v.as_array()) {
            columns.insert(name.to_string(), json_column(name, values)?);
        }
    }
    from_columns(columns)
}

fn json_column(name: &str, values: &[JsonValue]) -> Result<NumericArray> {
    let not_a_number = |j: usize| Error::InvalidValue(format!("{name}[{j}] is not a number"));

    if name != SPIKE_TIME && values.iter().all(|v| v.is_i64()) {
        return values
            .iter()
            .enumerate()
            .map(|(j, v)| v.as_i64().ok_or_else(|| not_a_number(j)))
            .collect::<Result<Vec<_>>>()
            .map(NumericArray::Int64);
    }
    values
        .iter()
        .enumerate()
        .map(|(j, v)| v.as_f64().ok_or_else(|| not_a_number(j)))
        .collect::<Result<Vec<_>>>()
        .map(NumericArray::Float64)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row, then one spike per row.
///   `spike_time,trial_idx,neuron_idx[,factor_idx]`
/// Extra columns are ignored; an empty `factor_idx` cell reads as 0.
fn load_csv(path: &Path) -> Result<MultitrialRaster> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let time_col = position(SPIKE_TIME).ok_or_else(|| Error::MissingColumn(SPIKE_TIME.into()))?;
    let trial_col = position(TRIAL_IDX).ok_or_else(|| Error::MissingColumn(TRIAL_IDX.into()))?;
    let neuron_col =
        position(NEURON_IDX).ok_or_else(|| Error::MissingColumn(NEURON_IDX.into()))?;
    let factor_col = position(FACTOR_IDX);

    let mut spike_time = Vec::new();
    let mut trial_idx = Vec::new();
    let mut neuron_idx = Vec::new();
    let mut factor_idx = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |col: usize| record.get(col).unwrap_or("").trim();
        let bad = |col: &str| Error::InvalidValue(format!("{col} in CSV row {row_no}"));

        spike_time.push(cell(time_col).parse::<f64>().map_err(|_| bad(SPIKE_TIME))?);
        trial_idx.push(parse_index(cell(trial_col)).ok_or_else(|| bad(TRIAL_IDX))?);
        neuron_idx.push(parse_index(cell(neuron_col)).ok_or_else(|| bad(NEURON_IDX))?);
        if let Some(col) = factor_col {
            let raw = cell(col);
            let value = if raw.is_empty() { Some(0) } else { parse_index(raw) };
            factor_idx.push(value.ok_or_else(|| bad(FACTOR_IDX))?);
        }
    }

    let raster = MultitrialRaster::new(spike_time, trial_idx, neuron_idx);
    Ok(match factor_col {
        Some(_) => raster.with_factor_idx(factor_idx),
        None => raster,
    })
}

/// Integers, or floats with no fractional part (`3.0`), as pandas writes them.
fn parse_index(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() => Some(f as i64),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader / writer
// ---------------------------------------------------------------------------

/// Load a Parquet file with one row per spike.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); columns may be split over many
/// record batches.
fn load_parquet(path: &Path) -> Result<MultitrialRaster> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut columns: BTreeMap<String, NumericArray> = BTreeMap::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        for name in [SPIKE_TIME, TRIAL_IDX, NEURON_IDX, FACTOR_IDX] {
            let Ok(idx) = schema.index_of(name) else {
                continue;
            };
            let chunk = extract_numeric(batch.column(idx), name)?;
            match columns.get_mut(name) {
                Some(existing) => append(existing, chunk, name)?,
                None => {
                    columns.insert(name.to_string(), chunk);
                }
            }
        }
    }

    from_columns(columns)
}

/// Copy a primitive Arrow column into a [`NumericArray`].  Nulls become NaN
/// for floats and 0 for integers.
fn extract_numeric(col: &ArrayRef, name: &str) -> Result<NumericArray> {
    let unsupported = || Error::UnsupportedDtype(format!("{name}: {:?}", col.data_type()));
    match col.data_type() {
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().ok_or_else(unsupported)?;
            Ok(NumericArray::Float64(
                arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            ))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().ok_or_else(unsupported)?;
            Ok(NumericArray::Float32(
                arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect(),
            ))
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().ok_or_else(unsupported)?;
            Ok(NumericArray::Int64(arr.iter().map(|v| v.unwrap_or(0)).collect()))
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().ok_or_else(unsupported)?;
            Ok(NumericArray::Int32(arr.iter().map(|v| v.unwrap_or(0)).collect()))
        }
        _ => Err(unsupported()),
    }
}

fn append(existing: &mut NumericArray, chunk: NumericArray, name: &str) -> Result<()> {
    match (existing, chunk) {
        (NumericArray::Float64(a), NumericArray::Float64(b)) => a.extend(b),
        (NumericArray::Float32(a), NumericArray::Float32(b)) => a.extend(b),
        (NumericArray::Int64(a), NumericArray::Int64(b)) => a.extend(b),
        (NumericArray::Int32(a), NumericArray::Int32(b)) => a.extend(b),
        (_, other) => {
            return Err(Error::UnsupportedDtype(format!(
                "{name}: batch dtype changed to {}",
                other.dtype()
            )))
        }
    }
    Ok(())
}

fn to_arrow(array: &NumericArray) -> (DataType, ArrayRef) {
    match array {
        NumericArray::Float64(v) => (DataType::Float64, Arc::new(Float64Array::from(v.clone()))),
        NumericArray::Float32(v) => (DataType::Float32, Arc::new(Float32Array::from(v.clone()))),
        NumericArray::Int64(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
        NumericArray::Int32(v) => (DataType::Int32, Arc::new(Int32Array::from(v.clone()))),
    }
}

/// Write the raster as a single-batch Parquet file, one row per spike.
///
/// Fails when the arrays disagree in length, since Parquet rows need equal
/// column lengths.
pub fn write_raster_parquet(raster: &MultitrialRaster, path: &Path) -> Result<()> {
    let mut fields = Vec::new();
    let mut arrays = Vec::new();
    for (name, array) in raster.figure_data() {
        let (dtype, arrow_array) = to_arrow(array);
        fields.push(Field::new(name, dtype, false));
        arrays.push(arrow_array);
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
