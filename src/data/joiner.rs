// ============================================================
// Layer 4 — Batch Concatenation and Date Join
// ============================================================
// Turns per-source batches into the two training tables:
//
//   attendance batches ──concat──► attendance rows ──dedup──┐
//                                                           │
//   food batches ──────concat──► food rows ──left join──────┴─► joined rows
//                                                 │
//                                                 └─► orphaned rows (dropped)
//
// Batches of one entity concatenate only when their column
// lists are identical. Food rows whose date has no attendance
// row are separated out instead of being joined with empty
// attendance features.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::records::{AttendanceRecord, FoodRecord};
use crate::domain::traits::RecordBatch;

/// A dish row paired with the attendance day it happened on.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedFoodRow {
    pub food:       FoodRecord,
    pub attendance: AttendanceRecord,
}

#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub rows:     Vec<JoinedFoodRow>,
    pub orphaned: Vec<FoodRecord>,
}

/// Concatenate batches of one entity. The first batch fixes the
/// expected column list; any other list is a SchemaMismatch.
pub fn concat_batches<T>(batches: Vec<RecordBatch<T>>) -> ForecastResult<Vec<T>> {
    let mut iter = batches.into_iter();
    let Some(first) = iter.next() else {
        return Ok(Vec::new());
    };

    let expected = first.columns;
    let mut rows = first.rows;
    for batch in iter {
        if batch.columns != expected {
            return Err(ForecastError::SchemaMismatch {
                source_name: batch.source,
                expected,
                found: batch.columns,
            });
        }
        rows.extend(batch.rows);
    }
    Ok(rows)
}

/// Keep the first row of each date; return the dates that repeated.
pub fn dedup_attendance(records: Vec<AttendanceRecord>) -> (Vec<AttendanceRecord>, Vec<NaiveDate>) {
    let mut seen       = HashSet::new();
    let mut duplicates = Vec::new();
    let mut unique     = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.date) {
            unique.push(record);
        } else {
            duplicates.push(record.date);
        }
    }
    (unique, duplicates)
}

/// Left join of food rows onto attendance rows by date.
pub fn join_on_date(food: Vec<FoodRecord>, attendance: &[AttendanceRecord]) -> JoinOutcome {
    let by_date: HashMap<NaiveDate, &AttendanceRecord> = attendance
        .iter()
        .rev() // first occurrence wins on duplicate dates
        .map(|a| (a.date, a))
        .collect();

    let mut outcome = JoinOutcome::default();
    for row in food {
        match by_date.get(&row.date) {
            Some(day) => outcome.rows.push(JoinedFoodRow {
                attendance: (*day).clone(),
                food:       row,
            }),
            None => outcome.orphaned.push(row),
        }
    }
    outcome
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::tests::{attendance, food};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_concat_keeps_all_rows_in_order() {
        let batches = vec![
            RecordBatch::new("a", cols(&["x", "y"]), vec![1, 2]),
            RecordBatch::new("b", cols(&["x", "y"]), vec![3]),
        ];
        assert_eq!(concat_batches(batches).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concat_rejects_different_columns() {
        let batches = vec![
            RecordBatch::new("a", cols(&["x", "y"]), vec![1]),
            RecordBatch::new("b", cols(&["y", "x"]), vec![2]),
        ];
        let err = concat_batches(batches).unwrap_err();
        assert!(matches!(err, ForecastError::SchemaMismatch { ref source_name, .. } if source_name == "b"));
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        let batches: Vec<RecordBatch<u8>> = Vec::new();
        assert!(concat_batches(batches).unwrap().is_empty());
    }

    #[test]
    fn test_orphaned_food_rows_are_not_joined() {
        let days = vec![attendance("2024-07-15", 100)];
        let outcome = join_on_date(
            vec![food("2024-07-15", "gyros", 30), food("2024-07-16", "gyros", 28)],
            &days,
        );
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].attendance.total_customers, 100);
        assert_eq!(outcome.orphaned.len(), 1);
        assert_eq!(outcome.orphaned[0].date, days[0].date.succ_opt().unwrap());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let (unique, dups) = dedup_attendance(vec![
            attendance("2024-07-15", 100),
            attendance("2024-07-15", 999),
            attendance("2024-07-16", 90),
        ]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].total_customers, 100);
        assert_eq!(dups.len(), 1);
    }

    #[test]
    fn test_join_uses_first_of_duplicate_dates() {
        let days = vec![attendance("2024-07-15", 100), attendance("2024-07-15", 999)];
        let outcome = join_on_date(vec![food("2024-07-15", "gyros", 30)], &days);
        assert_eq!(outcome.rows[0].attendance.total_customers, 100);
    }
}
