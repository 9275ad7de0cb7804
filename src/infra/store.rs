// ============================================================
// Layer 6 — Schema Store (SQLite)
// ============================================================
// Persistent storage for the two record types:
//
//   attendance  — one row per date, `date` is the primary key,
//                 `season` is a generated column
//   food        — many rows per date, `date` references
//                 attendance(date)
//
// Every public operation opens its own connection, turns on
// foreign-key enforcement, runs inside one transaction and
// drops the connection before returning. Nothing is held open
// between calls. Only `init` may create the database file.
//
// There is no update operation: rows are appended or the
// whole store is cleared.
//
// Concurrent writers on the same file are not coordinated.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, Row, Transaction};

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::records::{
    parse_time, AttendanceRecord, FoodRecord, ATTENDANCE_COLUMNS, DATE_FORMAT, FOOD_COLUMNS,
    TIME_FORMAT,
};
use crate::domain::traits::{RecordBatch, RecordSource};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
    date                TEXT PRIMARY KEY NOT NULL,
    weekday             INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 6),
    temperature         REAL NOT NULL,
    rainfall            REAL NOT NULL CHECK (rainfall >= 0),
    weather_label       TEXT NOT NULL,
    is_holiday          INTEGER NOT NULL,
    special_day_label   TEXT,
    peak_hours_label    TEXT,
    delivery_orders     INTEGER NOT NULL CHECK (delivery_orders >= 0),
    total_customers     INTEGER NOT NULL CHECK (total_customers >= 0),
    season              INTEGER GENERATED ALWAYS AS
                            (((CAST(substr(date, 6, 2) AS INTEGER) % 12) + 3) / 3) STORED,
    advertising_flag    INTEGER NOT NULL,
    tourist_season_flag INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS food (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    date              TEXT NOT NULL REFERENCES attendance(date),
    dish_name         TEXT NOT NULL,
    total_sales       INTEGER NOT NULL CHECK (total_sales >= 0),
    delivery_sales    INTEGER NOT NULL CHECK (delivery_sales >= 0 AND delivery_sales <= total_sales),
    sold_out_flag     INTEGER NOT NULL,
    sold_out_time     TEXT,
    category          TEXT NOT NULL,
    price             REAL NOT NULL CHECK (price >= 0),
    availability_flag INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_food_date ON food(date);
"#;

/// The two tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Attendance,
    Food,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Attendance => "attendance",
            Table::Food       => "food",
        }
    }
}

/// Outcome of a bulk append: rows that made it in, and the rows that
/// were skipped together with the reason.
#[derive(Debug, Default)]
pub struct AppendReport {
    pub inserted: usize,
    pub rejected: Vec<ForecastError>,
}

impl AppendReport {
    pub fn duplicates(&self) -> usize {
        self.rejected
            .iter()
            .filter(|e| matches!(e, ForecastError::UniqueConstraintViolation(_)))
            .count()
    }

    pub fn orphans(&self) -> usize {
        self.rejected
            .iter()
            .filter(|e| matches!(e, ForecastError::OrphanedFoodRecord { .. }))
            .count()
    }
}

/// Handle on the SQLite file. Cheap to construct; holds only the path.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    path: PathBuf,
}

impl SchemaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file, creating it when missing.
    fn create_or_open(&self) -> ForecastResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Opens an existing file; never creates one.
    fn connect(&self) -> ForecastResult<Connection> {
        if !self.path.is_file() {
            return Err(ForecastError::StoreNotFound(self.path.clone()));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Create both tables. Safe to call on an initialised store.
    pub fn init(&self) -> ForecastResult<()> {
        let conn = self.create_or_open()?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Schema ready at '{}'", self.path.display());
        Ok(())
    }

    /// Manual entry of a single attendance day.
    pub fn insert_attendance(&self, record: &AttendanceRecord) -> ForecastResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        insert_attendance_row(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Manual entry of a single dish row.
    pub fn insert_food(&self, record: &FoodRecord) -> ForecastResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        insert_food_row(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Bulk insert. A row that breaks a constraint is skipped and
    /// reported; the rest of the batch is committed.
    pub fn append_attendance(&self, records: &[AttendanceRecord]) -> ForecastResult<AppendReport> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut report = AppendReport::default();
        for record in records {
            match insert_attendance_row(&tx, record) {
                Ok(())                     => report.inserted += 1,
                Err(e) if is_row_error(&e) => {
                    tracing::warn!("Skipping attendance row: {e}");
                    report.rejected.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;
        Ok(report)
    }

    /// Bulk insert of dish rows; orphaned rows are rejected.
    pub fn append_food(&self, records: &[FoodRecord]) -> ForecastResult<AppendReport> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut report = AppendReport::default();
        for record in records {
            match insert_food_row(&tx, record) {
                Ok(())                     => report.inserted += 1,
                Err(e) if is_row_error(&e) => {
                    tracing::warn!("Skipping food row: {e}");
                    report.rejected.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;
        Ok(report)
    }

    pub fn read_attendance(&self) -> ForecastResult<Vec<AttendanceRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM attendance ORDER BY date",
            ATTENDANCE_COLUMNS.join(", ")
        ))?;
        let rows = stmt
            .query_map([], attendance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn read_food(&self) -> ForecastResult<Vec<FoodRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM food ORDER BY date, id",
            FOOD_COLUMNS.join(", ")
        ))?;
        let rows = stmt
            .query_map([], food_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(&self, table: Table) -> ForecastResult<usize> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Remove every row from both tables in one transaction.
    /// Food goes first so the foreign key is never dangling.
    pub fn clear_all(&self) -> ForecastResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let food       = tx.execute("DELETE FROM food", [])?;
        let attendance = tx.execute("DELETE FROM attendance", [])?;
        tx.commit()?;
        tracing::info!("Cleared {attendance} attendance rows and {food} food rows");
        Ok(())
    }
}

/// The store doubles as a training source: one batch per table.
impl RecordSource for SchemaStore {
    fn describe(&self) -> String {
        format!("store '{}'", self.path.display())
    }

    fn attendance_batches(&self) -> Result<Vec<RecordBatch<AttendanceRecord>>> {
        let columns = ATTENDANCE_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = self.read_attendance()?;
        Ok(vec![RecordBatch::new(self.describe(), columns, rows)])
    }

    fn food_batches(&self) -> Result<Vec<RecordBatch<FoodRecord>>> {
        let columns = FOOD_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = self.read_food()?;
        Ok(vec![RecordBatch::new(self.describe(), columns, rows)])
    }
}

// ─── Row helpers ──────────────────────────────────────────────────────────────

/// Failures that concern one row and must not abort a bulk append
fn is_row_error(e: &ForecastError) -> bool {
    matches!(
        e,
        ForecastError::UniqueConstraintViolation(_)
            | ForecastError::OrphanedFoodRecord { .. }
            | ForecastError::InvalidRecord(_)
    )
}

fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Some(err.extended_code)
        }
        _ => None,
    }
}

fn insert_attendance_row(tx: &Transaction<'_>, r: &AttendanceRecord) -> ForecastResult<()> {
    r.validate()?;
    let result = tx.execute(
        &format!(
            "INSERT INTO attendance ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            ATTENDANCE_COLUMNS.join(", ")
        ),
        params![
            r.date.format(DATE_FORMAT).to_string(),
            r.weekday,
            r.temperature,
            r.rainfall,
            r.weather_label,
            r.is_holiday,
            r.special_day_label,
            r.peak_hours_label,
            r.delivery_orders,
            r.total_customers,
            r.advertising_flag,
            r.tourist_season_flag,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) => match constraint_code(&e) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            | Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Err(ForecastError::UniqueConstraintViolation(r.date))
            }
            Some(_) => Err(ForecastError::InvalidRecord(format!("{}: {e}", r.date))),
            None    => Err(e.into()),
        },
    }
}

fn insert_food_row(tx: &Transaction<'_>, r: &FoodRecord) -> ForecastResult<()> {
    r.validate()?;
    let r = r.clone().normalized();
    let result = tx.execute(
        &format!(
            "INSERT INTO food ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            FOOD_COLUMNS.join(", ")
        ),
        params![
            r.date.format(DATE_FORMAT).to_string(),
            r.dish_name,
            r.total_sales,
            r.delivery_sales,
            r.sold_out_flag,
            r.sold_out_time.map(|t| t.format(TIME_FORMAT).to_string()),
            r.category,
            r.price,
            r.availability_flag,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) => match constraint_code(&e) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Err(ForecastError::OrphanedFoodRecord { date: r.date, dish: r.dish_name })
            }
            Some(_) => Err(ForecastError::InvalidRecord(format!("{} '{}': {e}", r.date, r.dish_name))),
            None    => Err(e.into()),
        },
    }
}

fn conversion_error(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        date:                date_at(row, 0)?,
        weekday:             row.get(1)?,
        temperature:         row.get(2)?,
        rainfall:            row.get(3)?,
        weather_label:       row.get(4)?,
        is_holiday:          row.get(5)?,
        special_day_label:   row.get(6)?,
        peak_hours_label:    row.get(7)?,
        delivery_orders:     row.get(8)?,
        total_customers:     row.get(9)?,
        advertising_flag:    row.get(10)?,
        tourist_season_flag: row.get(11)?,
    })
}

fn food_from_row(row: &Row<'_>) -> rusqlite::Result<FoodRecord> {
    let sold_out_time = match row.get::<_, Option<String>>(5)? {
        Some(text) => Some(parse_time(&text).map_err(|e| conversion_error(5, e))?),
        None => None,
    };
    Ok(FoodRecord {
        date:              date_at(row, 0)?,
        dish_name:         row.get(1)?,
        total_sales:       row.get(2)?,
        delivery_sales:    row.get(3)?,
        sold_out_flag:     row.get(4)?,
        sold_out_time,
        category:          row.get(6)?,
        price:             row.get(7)?,
        availability_flag: row.get(8)?,
    })
}
