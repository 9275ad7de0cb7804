// ============================================================
// Layer 4 — CSV Batch Loader
// ============================================================
// Reads historical observations from CSV files:
//
//   attendance_data/attendance_2023.csv   → AttendanceRecord batch
//   food_data/food_2023.csv               → FoodRecord batch
//
// Column names are canonical snake_case (see records.rs). The
// Greek labels used by the restaurant's spreadsheets are
// accepted as aliases. A `season` column is tolerated and
// ignored: season is always recomputed from the date.
//
// Any unknown, duplicated or missing column is a SchemaMismatch.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::records::{
    parse_time, AttendanceRecord, FoodRecord, ATTENDANCE_COLUMNS, FOOD_COLUMNS,
};
use crate::domain::traits::{RecordBatch, RecordSource};

const ATTENDANCE_ALIASES: &[(&str, &str)] = &[
    ("Ημερομηνία", "date"),
    ("Ημέρα_Εβδομάδας", "weekday"),
    ("Θερμοκρασία", "temperature"),
    ("Βροχόπτωση", "rainfall"),
    ("Καιρός", "weather_label"),
    ("Αργία", "is_holiday"),
    ("Ειδική_Ημέρα", "special_day_label"),
    ("Ώρες_Αιχμής", "peak_hours_label"),
    ("Παραγγελίες_Delivery", "delivery_orders"),
    ("Συνολικός_Πελάτες", "total_customers"),
    ("Εποχή", "season"),
    ("Διαφημίσεις", "advertising_flag"),
    ("Τουριστική_Περίοδος", "tourist_season_flag"),
];

const FOOD_ALIASES: &[(&str, &str)] = &[
    ("Ημερομηνία", "date"),
    ("Φαγητό", "dish_name"),
    ("Πωλήσεις_Σύνολο", "total_sales"),
    ("Πωλήσεις_Delivery", "delivery_sales"),
    ("Εξαντλήθηκε", "sold_out_flag"),
    ("Ώρα_Εξάντλησης", "sold_out_time"),
    ("Κατηγορία", "category"),
    ("Τιμή", "price"),
    ("Διαθεσιμότητα", "availability_flag"),
];

/// Derived columns that may appear in a file but are never read
const IGNORED_ATTENDANCE_COLUMNS: &[&str] = &["season"];

// ─── Row shapes as they appear in the files ──────────────────────────────────

#[derive(Debug, Deserialize)]
struct AttendanceRow {
    date:                NaiveDate,
    weekday:             u8,
    temperature:         f64,
    rainfall:            f64,
    weather_label:       String,
    #[serde(deserialize_with = "de_flag")]
    is_holiday:          bool,
    special_day_label:   Option<String>,
    peak_hours_label:    Option<String>,
    delivery_orders:     u32,
    total_customers:     u32,
    #[serde(deserialize_with = "de_flag")]
    advertising_flag:    bool,
    #[serde(deserialize_with = "de_flag")]
    tourist_season_flag: bool,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(r: AttendanceRow) -> Self {
        AttendanceRecord {
            date:                r.date,
            weekday:             r.weekday,
            temperature:         r.temperature,
            rainfall:            r.rainfall,
            weather_label:       r.weather_label,
            is_holiday:          r.is_holiday,
            special_day_label:   r.special_day_label,
            peak_hours_label:    r.peak_hours_label,
            delivery_orders:     r.delivery_orders,
            total_customers:     r.total_customers,
            advertising_flag:    r.advertising_flag,
            tourist_season_flag: r.tourist_season_flag,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FoodRow {
    date:              NaiveDate,
    dish_name:         String,
    total_sales:       u32,
    delivery_sales:    u32,
    #[serde(deserialize_with = "de_flag")]
    sold_out_flag:     bool,
    #[serde(deserialize_with = "de_opt_time")]
    sold_out_time:     Option<NaiveTime>,
    category:          String,
    price:             f64,
    #[serde(deserialize_with = "de_flag")]
    availability_flag: bool,
}

impl From<FoodRow> for FoodRecord {
    fn from(r: FoodRow) -> Self {
        FoodRecord {
            date:              r.date,
            dish_name:         r.dish_name,
            total_sales:       r.total_sales,
            delivery_sales:    r.delivery_sales,
            sold_out_flag:     r.sold_out_flag,
            sold_out_time:     r.sold_out_time,
            category:          r.category,
            price:             r.price,
            availability_flag: r.availability_flag,
        }
        .normalized()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" | "ναι" => Some(true),
        "0" | "0.0" | "false" | "no" | "n" | "όχι" | "οχι" | "" => Some(false),
        _ => None,
    }
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(d)?;
    parse_flag(&raw).ok_or_else(|| serde::de::Error::custom(format!("'{raw}' is not a yes/no flag")))
}

fn de_opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_time(text)
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("bad time '{text}': {e}"))),
    }
}

// ─── Header handling ──────────────────────────────────────────────────────────

/// Map raw headers to canonical names, rejecting unknown, duplicate
/// and missing columns.
fn canonical_headers(
    source:   &str,
    raw:      &csv::StringRecord,
    required: &[&str],
    aliases:  &[(&str, &str)],
    ignored:  &[&str],
) -> ForecastResult<Vec<String>> {
    let found: Vec<String> = raw
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mismatch = || ForecastError::SchemaMismatch {
        source_name: source.to_string(),
        expected:    required.iter().chain(ignored).map(|c| c.to_string()).collect(),
        found:       found.clone(),
    };

    let mut columns = Vec::with_capacity(found.len());
    for header in &found {
        let lowered = header.to_lowercase();
        let canonical = aliases
            .iter()
            .find(|(alias, _)| *alias == header.as_str())
            .map(|(_, c)| *c)
            .or_else(|| required.iter().chain(ignored).copied().find(|c| *c == lowered))
            .ok_or_else(mismatch)?;
        if columns.iter().any(|c| c == canonical) {
            return Err(mismatch());
        }
        columns.push(canonical.to_string());
    }

    if required.iter().any(|r| !columns.iter().any(|c| c == r)) {
        return Err(mismatch());
    }
    Ok(columns)
}

fn read_csv<R, T>(
    path:     &Path,
    required: &[&str],
    aliases:  &[(&str, &str)],
    ignored:  &[&str],
) -> ForecastResult<RecordBatch<T>>
where
    R: DeserializeOwned,
    T: From<R>,
{
    let source = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let columns = canonical_headers(&source, reader.headers()?, required, aliases, ignored)?;
    let header  = csv::StringRecord::from(columns.clone());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line   = record.position().map(|p| p.line()).unwrap_or_default();
        let row: R = record
            .deserialize(Some(&header))
            .map_err(|e| ForecastError::MalformedRow {
                source_name: source.clone(),
                line,
                reason:      e.to_string(),
            })?;
        rows.push(T::from(row));
    }

    tracing::debug!("Read {} rows from '{}'", rows.len(), source);
    Ok(RecordBatch::new(source, columns, rows))
}

pub fn read_attendance_csv(path: &Path) -> ForecastResult<RecordBatch<AttendanceRecord>> {
    read_csv::<AttendanceRow, AttendanceRecord>(
        path,
        &ATTENDANCE_COLUMNS,
        ATTENDANCE_ALIASES,
        IGNORED_ATTENDANCE_COLUMNS,
    )
}

pub fn read_food_csv(path: &Path) -> ForecastResult<RecordBatch<FoodRecord>> {
    read_csv::<FoodRow, FoodRecord>(path, &FOOD_COLUMNS, FOOD_ALIASES, &[])
}

// ─── Directory source ─────────────────────────────────────────────────────────

/// Training source backed by two directories of CSV files.
/// Only files named `attendance_*.csv` / `food_*.csv` are read,
/// in file-name order.
pub struct CsvDirectorySource {
    attendance_dir: PathBuf,
    food_dir:       PathBuf,
}

impl CsvDirectorySource {
    pub fn new(attendance_dir: impl Into<PathBuf>, food_dir: impl Into<PathBuf>) -> Self {
        Self { attendance_dir: attendance_dir.into(), food_dir: food_dir.into() }
    }
}

/// List `<prefix>*.csv` files in `dir`, sorted by name.
/// A missing directory yields an empty list.
fn list_csv_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::warn!("Data directory '{}' does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        let is_csv = path.extension().and_then(|e| e.to_str()) == Some("csv");
        if path.is_file() && name_matches && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl RecordSource for CsvDirectorySource {
    fn describe(&self) -> String {
        format!(
            "CSV directories '{}' and '{}'",
            self.attendance_dir.display(),
            self.food_dir.display()
        )
    }

    fn attendance_batches(&self) -> Result<Vec<RecordBatch<AttendanceRecord>>> {
        list_csv_files(&self.attendance_dir, "attendance_")?
            .iter()
            .map(|p| read_attendance_csv(p).map_err(Into::into))
            .collect()
    }

    fn food_batches(&self) -> Result<Vec<RecordBatch<FoodRecord>>> {
        list_csv_files(&self.food_dir, "food_")?
            .iter()
            .map(|p| read_food_csv(p).map_err(Into::into))
            .collect()
    }
}
