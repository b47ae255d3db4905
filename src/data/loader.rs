use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Float64Builder, LargeListArray, ListArray,
    ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{wavelength, DataRaw, Spectrum, NUM_POINTS};
use crate::error::{Error, Result};
use crate::label;

/// Column names of a single-spectrum CSV file.
pub const CSV_HEADER: [&str; 2] = ["wavelength", "intensity"];

/// Largest distance (nm) a CSV wavelength may sit from its axis point.
pub const AXIS_TOLERANCE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// A file the directory scan could not use.
#[derive(Debug)]
pub struct Skipped {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of reading a dataset: what was read and what was skipped.
#[derive(Debug, Default)]
pub struct Scan {
    pub data: DataRaw,
    pub skipped: Vec<Skipped>,
}

/// Load a dataset from a directory tree or a single dataset file.
///
/// Directories are scanned with [`read_dir`]; files are dispatched by
/// extension with [`load_file`] and ignore `labels_depth`.
pub fn load(path: &Path, labels_depth: usize) -> Result<Scan> {
    if path.is_dir() {
        read_dir(path, labels_depth)
    } else {
        Ok(Scan {
            data: load_file(path)?,
            skipped: Vec::new(),
        })
    }
}

/// Read every `*.csv` spectrum under `root`.
///
/// The label of a file is built from its first `labels_depth` directories
/// below `root`, each prefixed with `/`:
///
/// ```text
/// data
/// ├── azurite
/// │   ├── spot00
/// │   │   ├── 1.csv        depth 1 → /azurite
/// │   │   └── 10.csv       depth 2 → /azurite/spot00
/// │   └── spot01
/// │       └── 24.csv
/// └── brochantite
///     └── spot00
///         └── 7.csv
/// ```
///
/// Files that fail to parse, or that sit above `labels_depth`, are logged and
/// reported in [`Scan::skipped`]; the scan itself carries on. Other files are
/// ignored.
pub fn read_dir(root: &Path, labels_depth: usize) -> Result<Scan> {
    if labels_depth == 0 {
        return Err(Error::InvalidParameter {
            name: "labels depth",
            reason: "must be at least 1".into(),
        });
    }

    let mut files = Vec::new();
    let mut scan = Scan::default();
    collect_csv_files(root, &mut files, &mut scan.skipped)?;

    for path in files {
        match label_for(root, &path, labels_depth)
            .and_then(|l| read_spectrum_csv(&path).map(|s| (l, s)))
        {
            Ok((label, spectrum)) => scan.data.entry(label).or_default().push(spectrum),
            Err(error) if error.is_recoverable() => {
                log::warn!("Skipping {}: {error}", path.display());
                scan.skipped.push(Skipped { path, error });
            }
            Err(error) => return Err(error),
        }
    }

    log::info!(
        "Read {} labels from {} ({} files skipped)",
        scan.data.len(),
        root.display(),
        scan.skipped.len()
    );
    Ok(scan)
}

/// Load a whole dataset stored in one file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – `label` string column and `y` list column
/// * `.json`    – `[{ "label": "/azurite/spot00", "y": [...] }, ...]`
pub fn load_file(path: &Path) -> Result<DataRaw> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => Err(Error::format(
            path,
            format!("unsupported file extension: .{other}"),
        )),
    }
}

fn collect_csv_files(dir: &Path, files: &mut Vec<PathBuf>, skipped: &mut Vec<Skipped>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if let Err(error) = collect_csv_files(&path, files, skipped) {
                log::warn!("Skipping directory {}: {error}", path.display());
                skipped.push(Skipped { path, error });
            }
        } else if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
            files.push(path);
        }
    }
    Ok(())
}

fn label_for(root: &Path, file: &Path, depth: usize) -> Result<String> {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let dirs: Vec<_> = relative
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    if dirs.len() < depth {
        return Err(Error::LabelDepth {
            path: file.to_path_buf(),
            depth,
        });
    }

    Ok(dirs[..depth]
        .iter()
        .map(|c| format!("/{}", c.as_os_str().to_string_lossy()))
        .collect())
}

// ---------------------------------------------------------------------------
// Single spectrum CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Serialize)]
struct Row {
    wavelength: f64,
    intensity: f64,
}

/// Read one `wavelength,intensity` file with exactly [`NUM_POINTS`] rows on
/// the shared wavelength axis.
pub fn read_spectrum_csv(path: &Path) -> Result<Spectrum> {
    let bad = |reason: String| Error::format(path, reason);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| bad(e.to_string()))?;

    let headers = reader.headers().map_err(|e| bad(e.to_string()))?;
    if headers.iter().ne(CSV_HEADER) {
        return Err(bad(format!(
            "expected header '{}', found '{}'",
            CSV_HEADER.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut y = Vec::with_capacity(NUM_POINTS);
    for (i, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.map_err(|e| bad(format!("row {}: {e}", i + 1)))?;
        if i >= NUM_POINTS {
            return Err(bad(format!("more than {NUM_POINTS} data rows")));
        }
        if (row.wavelength - wavelength(i)).abs() > AXIS_TOLERANCE {
            return Err(bad(format!(
                "row {}: wavelength {} is off the {:.1} nm axis point",
                i + 1,
                row.wavelength,
                wavelength(i)
            )));
        }
        y.push(row.intensity);
    }

    if y.len() != NUM_POINTS {
        return Err(bad(format!(
            "expected {NUM_POINTS} data rows, found {}",
            y.len()
        )));
    }
    Ok(Spectrum::new(y))
}

/// Write a spectrum in the format [`read_spectrum_csv`] expects.
pub fn write_spectrum_csv(path: &Path, spectrum: &Spectrum) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (i, &intensity) in spectrum.y.iter().enumerate() {
        writer.serialize(Row {
            wavelength: (wavelength(i) * 10.0).round() / 10.0,
            intensity,
        })?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonRecord {
    label: String,
    y: Vec<f64>,
}

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "label": "/azurite/spot00", "y": [0.12, 0.14, ...] },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<DataRaw> {
    let text = fs::read_to_string(path)?;
    let records: Vec<JsonRecord> = serde_json::from_str(&text)?;

    let mut data = DataRaw::new();
    for (row, rec) in records.into_iter().enumerate() {
        check_record(path, row, &rec.label, rec.y.len())?;
        data.entry(rec.label).or_default().push(Spectrum::new(rec.y));
    }
    Ok(data)
}

fn check_record(path: &Path, row: usize, label: &str, len: usize) -> Result<()> {
    label::head(label).map_err(|e| Error::format(path, format!("row {row}: {e}")))?;
    if len != NUM_POINTS {
        return Err(Error::format(
            path,
            format!("row {row}: expected {NUM_POINTS} values, found {len}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one spectrum per row.
///
/// Expected schema:
/// - `label`: Utf8 or LargeUtf8 – hierarchical label
/// - `y`: List<Float64> or LargeList<Float64> (Float32 accepted) – intensities
///
/// Other columns are ignored.
fn load_parquet(path: &Path) -> Result<DataRaw> {
    let file = fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut data = DataRaw::new();
    let mut row_offset = 0;

    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        let label_idx = schema
            .index_of("label")
            .map_err(|_| Error::format(path, "missing 'label' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| Error::format(path, "missing 'y' column"))?;

        let label_col = batch.column(label_idx);
        let y_col = batch.column(y_idx);

        for row in 0..batch.num_rows() {
            let label = extract_string(label_col, row)
                .map_err(|reason| Error::format(path, format!("row {}: {reason}", row_offset + row)))?;
            let y = extract_f64_list(y_col, row)
                .map_err(|reason| Error::format(path, format!("row {}: {reason}", row_offset + row)))?;
            check_record(path, row_offset + row, &label, y.len())?;
            data.entry(label).or_default().push(Spectrum::new(y));
        }
        row_offset += batch.num_rows();
    }
    Ok(data)
}

/// Write a raw dataset as one Parquet file readable by [`load_file`]: a
/// `label` column and a `y` list column, one row per spectrum.
pub fn write_parquet(path: &Path, data: &DataRaw) -> Result<()> {
    let mut labels = Vec::new();
    let mut y_builder = ListBuilder::new(Float64Builder::new());
    for (label, spectra) in data {
        for s in spectra {
            labels.push(label.as_str());
            y_builder.values().append_slice(&s.y);
            y_builder.append(true);
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("label", DataType::Utf8, false),
        Field::new(
            "y",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(labels)),
            Arc::new(y_builder.finish()),
        ],
    )?;

    let file = fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> std::result::Result<String, String> {
    if col.is_null(row) {
        return Err("null label".into());
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|s| s.value(row).to_string())
            .ok_or_else(|| "expected StringArray".to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => Err(format!("expected a string label column, got {other:?}")),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> std::result::Result<Vec<f64>, String> {
    if col.is_null(row) {
        return Err("null value in list column".into());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .ok_or("expected LargeListArray")?
            .value(row),
        other => return Err(format!("expected List or LargeList column, got {other:?}")),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        Err(format!(
            "list inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        ))
    }
}
