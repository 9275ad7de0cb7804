// ============================================================
// Layer 2 — DatabaseUseCase
// ============================================================
// Everything the CLI can do to the schema store:
//
//   init    → create tables (idempotent)
//   ingest  → CSV files into the store, attendance files first
//             so food rows of the same upload find their day
//   show    → row counts and full-table reads
//   clear   → empty both tables atomically
//
// Only init and ingest create a missing store file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::data::loader::{read_attendance_csv, read_food_csv};
use crate::domain::records::{AttendanceRecord, FoodRecord};
use crate::infra::store::{AppendReport, SchemaStore, Table};

/// Result of ingesting one CSV file.
#[derive(Debug)]
pub struct FileReport {
    pub path:   PathBuf,
    pub table:  Table,
    pub read:   usize,
    pub append: AppendReport,
}

impl FileReport {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} of {} row(s) added to {}",
            self.path.display(),
            self.append.inserted,
            self.read,
            self.table.name(),
        );
        let skipped = self.append.rejected.len();
        if skipped > 0 {
            line.push_str(&format!(
                ", {skipped} skipped ({} duplicate date, {} without attendance day)",
                self.append.duplicates(),
                self.append.orphans(),
            ));
        }
        line
    }
}

pub struct DatabaseUseCase {
    store: SchemaStore,
}

impl DatabaseUseCase {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { store: SchemaStore::new(db_path) }
    }

    pub fn init(&self) -> Result<()> {
        self.store
            .init()
            .with_context(|| format!("Cannot initialise '{}'", self.store.path().display()))
    }

    /// Append every file to the store. A file that cannot be parsed
    /// aborts ingestion; files before it stay committed.
    pub fn ingest(&self, attendance_files: &[PathBuf], food_files: &[PathBuf]) -> Result<Vec<FileReport>> {
        self.init()?;
        let mut reports = Vec::with_capacity(attendance_files.len() + food_files.len());

        for path in attendance_files {
            let batch  = read_attendance_csv(path).with_context(|| format!("Cannot ingest '{}'", path.display()))?;
            let read   = batch.rows.len();
            let append = self.store.append_attendance(&batch.rows)?;
            reports.push(self.report(path, Table::Attendance, read, append));
        }
        for path in food_files {
            let batch  = read_food_csv(path).with_context(|| format!("Cannot ingest '{}'", path.display()))?;
            let read   = batch.rows.len();
            let append = self.store.append_food(&batch.rows)?;
            reports.push(self.report(path, Table::Food, read, append));
        }
        Ok(reports)
    }

    fn report(&self, path: &Path, table: Table, read: usize, append: AppendReport) -> FileReport {
        let report = FileReport { path: path.to_path_buf(), table, read, append };
        tracing::info!("{}", report.summary());
        report
    }

    pub fn attendance_rows(&self) -> Result<Vec<AttendanceRecord>> {
        Ok(self.store.read_attendance()?)
    }

    pub fn food_rows(&self) -> Result<Vec<FoodRecord>> {
        Ok(self.store.read_food()?)
    }

    pub fn count(&self, table: Table) -> Result<usize> {
        Ok(self.store.count(table)?)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear_all()?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ATTENDANCE_HEADER: &str = "date,weekday,temperature,rainfall,weather_label,is_holiday,special_day_label,peak_hours_label,delivery_orders,total_customers,advertising_flag,tourist_season_flag";
    const FOOD_HEADER: &str = "date,dish_name,total_sales,delivery_sales,sold_out_flag,sold_out_time,category,price,availability_flag";

    fn write(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("{header}\n{}\n", rows.join("\n"))).unwrap();
        path
    }

    #[test]
    fn test_ingest_reports_duplicates_and_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let db  = DatabaseUseCase::new(dir.path().join("restaurant.db"));

        let first = write(dir.path(), "attendance_a.csv", ATTENDANCE_HEADER, &[
            "2024-07-15,0,28,0,sunny,0,,,30,120,0,0",
            "2024-07-16,1,27,0,sunny,0,,,25,100,0,0",
        ]);
        let second = write(dir.path(), "attendance_b.csv", ATTENDANCE_HEADER, &[
            "2024-07-16,1,20,3,rain,0,,,5,40,0,0",
        ]);
        let dishes = write(dir.path(), "food_a.csv", FOOD_HEADER, &[
            "2024-07-15,moussaka,40,12,1,14:30,main,12.5,1",
            "2024-07-20,gyros,30,10,0,,main,9,1",
        ]);

        let reports = db.ingest(&[first, second], &[dishes]).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].append.inserted, 2);
        assert_eq!(reports[1].append.duplicates(), 1);
        assert_eq!(reports[2].append.inserted, 1);
        assert_eq!(reports[2].append.orphans(), 1);
        assert!(reports[2].summary().contains("1 without attendance day"));

        // the duplicate did not overwrite the first 2024-07-16 row
        let days = db.attendance_rows().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].total_customers, 100);
        assert_eq!(db.count(Table::Food).unwrap(), 1);
    }

    #[test]
    fn test_clear_empties_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db  = DatabaseUseCase::new(dir.path().join("restaurant.db"));
        let days = write(dir.path(), "attendance_a.csv", ATTENDANCE_HEADER, &[
            "2024-07-15,0,28,0,sunny,0,,,30,120,0,0",
        ]);
        let dishes = write(dir.path(), "food_a.csv", FOOD_HEADER, &[
            "2024-07-15,moussaka,40,12,1,14:30,main,12.5,1",
        ]);
        db.ingest(&[days], &[dishes]).unwrap();

        db.clear().unwrap();
        assert!(db.attendance_rows().unwrap().is_empty());
        assert!(db.food_rows().unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_file_aborts_with_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let db  = DatabaseUseCase::new(dir.path().join("restaurant.db"));
        let bad = write(dir.path(), "attendance_bad.csv", "when,how_many", &["yesterday,lots"]);

        let err = db.ingest(&[bad], &[]).unwrap_err();
        assert!(format!("{err:#}").contains("attendance_bad.csv"));
    }

    #[test]
    fn test_show_and_clear_need_an_existing_store() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let db   = DatabaseUseCase::new(&path);

        assert!(db.count(Table::Attendance).is_err());
        assert!(db.food_rows().is_err());
        let err = db.clear().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!path.exists());

        db.init().unwrap();
        assert_eq!(db.count(Table::Attendance).unwrap(), 0);
    }
}
