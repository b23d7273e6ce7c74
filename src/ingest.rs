//! File ingestion: format sniffing by extension, the CSV delimiter cascade and
//! the first-sheet spreadsheet reader.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use tracing::{debug, info, warn};

use crate::config::{IngestConfig, RequiredHeaders};
use crate::models::{DateRange, RawRow};

const SECONDS_PER_DAY: i64 = 86_400;

/// Delimiters tried in order; the last one is accepted unconditionally.
pub const DELIMITER_CASCADE: [u8; 3] = [b'\t', b',', b';'];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("please select a date range first")]
    RangeNotSelected,
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("error processing file: {0}")]
    Parse(String),
    #[error("error reading file: {0}")]
    Read(String),
}

fn parse_error(err: impl std::fmt::Display) -> IngestError {
    IngestError::Parse(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(Self::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(Self::Spreadsheet)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Delimiter the CSV cascade settled on; `None` for spreadsheets.
    pub delimiter: Option<u8>,
}

fn preflight(name: &str, range: &DateRange) -> Result<FileKind, IngestError> {
    if !range.is_selected() {
        return Err(IngestError::RangeNotSelected);
    }
    FileKind::from_name(name).ok_or_else(|| IngestError::UnsupportedFormat(name.to_string()))
}

fn parse(kind: FileKind, bytes: &[u8], config: &IngestConfig) -> Result<RowSet, IngestError> {
    match kind {
        FileKind::Csv => parse_csv(bytes, &config.required_headers),
        FileKind::Spreadsheet => parse_spreadsheet(bytes),
    }
}

/// Ingests an in-memory upload. `name` only drives format dispatch.
pub fn ingest_bytes(
    name: &str,
    bytes: &[u8],
    range: &DateRange,
    config: &IngestConfig,
) -> Result<RowSet, IngestError> {
    let kind = preflight(name, range)?;
    parse(kind, bytes, config)
}

/// Reads `path` asynchronously and parses it on the blocking pool.
pub async fn ingest_file(
    path: &Path,
    range: &DateRange,
    config: &IngestConfig,
) -> Result<RowSet, IngestError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    preflight(&name, range)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::Read(e.to_string()))?;
    debug!(file = %name, bytes = bytes.len(), "read upload");

    let (range, config) = (range.clone(), config.clone());
    tokio::task::spawn_blocking(move || ingest_bytes(&name, &bytes, &range, &config))
        .await
        .map_err(parse_error)?
}

fn delimiter_label(delimiter: u8) -> &'static str {
    match delimiter {
        b'\t' => "tab",
        b',' => "comma",
        b';' => "semicolon",
        _ => "other",
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}

/// Runs the delimiter cascade over the whole text.
pub fn parse_csv(bytes: &[u8], required: &RequiredHeaders) -> Result<RowSet, IngestError> {
    let text = decode_text(bytes);
    let mut fallback = None;

    for (attempt, &delimiter) in DELIMITER_CASCADE.iter().enumerate() {
        let set = parse_delimited(&text, delimiter)?;
        if has_required_fields(&set, required) {
            info!(
                delimiter = delimiter_label(delimiter),
                attempt = attempt + 1,
                rows = set.rows.len(),
                "accepted CSV delimiter"
            );
            return Ok(set);
        }
        debug!(
            delimiter = delimiter_label(delimiter),
            "required headers missing in first row"
        );
        fallback = Some(set);
    }

    warn!(
        rows = fallback.as_ref().map_or(0, |set| set.rows.len()),
        "no delimiter yielded the required headers, keeping the semicolon parse"
    );
    fallback.ok_or_else(|| IngestError::Parse("no delimiter candidates".to_string()))
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<RowSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = unique_headers(reader.headers().map_err(parse_error)?.iter().map(str::to_string));
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(RowSet {
        headers,
        rows,
        delimiter: Some(delimiter),
    })
}

fn has_required_fields(set: &RowSet, required: &RequiredHeaders) -> bool {
    let Some(first) = set.rows.first() else {
        return false;
    };
    required
        .names()
        .iter()
        .all(|name| first.get(*name).is_some_and(|value| !value.is_empty()))
}

/// Empty header cells become `__EMPTY`; repeats get `_1`, `_2`, ...
fn unique_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|name| {
            let base = if name.is_empty() {
                "__EMPTY".to_string()
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let header = if *count == 0 {
                base
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            header
        })
        .collect()
}

/// Converts the first sheet by position; every cell is rendered as text.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<RowSet, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(parse_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Parse("workbook contains no sheets".to_string()))?
        .map_err(parse_error)?;

    let mut sheet_rows = range.rows();
    let Some(header_cells) = sheet_rows.next() else {
        return Ok(RowSet::default());
    };
    let headers = unique_headers(header_cells.iter().map(cell_text));

    let rows: Vec<RawRow> = sheet_rows
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter_map(|(header, cell)| {
                    let text = cell_text(cell);
                    (!text.is_empty()).then(|| (header.clone(), text))
                })
                .collect::<RawRow>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    info!(rows = rows.len(), columns = headers.len(), "read first worksheet");
    Ok(RowSet {
        headers,
        rows,
        delimiter: None,
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_serial_date(dt.as_f64()),
        Data::Error(e) => e.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Renders an Excel serial date: times of day as `HH:MM`, dates as `DD.MM.YYYY`.
/// Serials outside chrono's range fall back to the plain number.
fn format_serial_date(serial: f64) -> String {
    if !serial.is_finite() || serial < 0.0 {
        return format_number(serial);
    }
    let total = (serial * SECONDS_PER_DAY as f64).round() as i64;
    let (days, seconds) = (total / SECONDS_PER_DAY, total % SECONDS_PER_DAY);
    if serial < 1.0 {
        return NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_else(|| format_number(serial));
    }

    let moment = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
        .zip(TimeDelta::try_days(days))
        .and_then(|(epoch, offset)| epoch.checked_add_signed(offset))
        .and_then(|date| date.checked_add_signed(TimeDelta::seconds(seconds)));
    match moment {
        Some(moment) if seconds == 0 => moment.format("%d.%m.%Y").to_string(),
        Some(moment) => moment.format("%d.%m.%Y %H:%M").to_string(),
        None => format_number(serial),
    }
}
