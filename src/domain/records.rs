// ============================================================
// Layer 3 — Observation Records
// ============================================================
// The two persisted entities:
//
//   AttendanceRecord — one row per calendar date (primary key)
//   FoodRecord       — one row per date × dish, date references
//                      an AttendanceRecord
//
// Season is NOT a field: it is always derived from the date
// through features::season so the stored value and the
// training/inference value can never disagree.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::features;

/// Storage format for dates, both in SQLite and in CSV files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for sold-out times
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Sold-out time as written by hand: `HH:MM` or `HH:MM:SS`.
pub fn parse_time(text: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
}

/// Canonical attendance columns, in storage order. `season` is not
/// listed: it is derived and never read from input.
pub const ATTENDANCE_COLUMNS: [&str; 12] = [
    "date", "weekday", "temperature", "rainfall", "weather_label",
    "is_holiday", "special_day_label", "peak_hours_label",
    "delivery_orders", "total_customers", "advertising_flag",
    "tourist_season_flag",
];

/// Canonical food columns, in storage order.
pub const FOOD_COLUMNS: [&str; 9] = [
    "date", "dish_name", "total_sales", "delivery_sales", "sold_out_flag",
    "sold_out_time", "category", "price", "availability_flag",
];

/// One observed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date:                NaiveDate,
    /// Monday = 0 … Sunday = 6
    pub weekday:             u8,
    pub temperature:         f64,
    pub rainfall:            f64,
    pub weather_label:       String,
    pub is_holiday:          bool,
    pub special_day_label:   Option<String>,
    pub peak_hours_label:    Option<String>,
    pub delivery_orders:     u32,
    /// Stage-1 training label
    pub total_customers:     u32,
    pub advertising_flag:    bool,
    pub tourist_season_flag: bool,
}

impl AttendanceRecord {
    /// Derived calendar bucket, 1 = winter … 4 = autumn
    pub fn season(&self) -> u8 {
        features::season(self.date)
    }

    /// Check the invariants a row must satisfy before it is stored.
    pub fn validate(&self) -> ForecastResult<()> {
        if self.weekday > 6 {
            return Err(ForecastError::InvalidRecord(format!(
                "{}: weekday {} is outside 0..=6", self.date, self.weekday
            )));
        }
        let expected = self.date.weekday().num_days_from_monday() as u8;
        if self.weekday != expected {
            tracing::warn!(
                "{}: weekday column says {} but the date is weekday {}",
                self.date, self.weekday, expected
            );
        }
        if !self.temperature.is_finite() {
            return Err(ForecastError::InvalidRecord(format!(
                "{}: temperature is not a number", self.date
            )));
        }
        if !(self.rainfall >= 0.0) {
            return Err(ForecastError::InvalidRecord(format!(
                "{}: rainfall {} must be >= 0", self.date, self.rainfall
            )));
        }
        Ok(())
    }
}

/// One dish on one observed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub date:              NaiveDate,
    pub dish_name:         String,
    /// Stage-2 training label
    pub total_sales:       u32,
    pub delivery_sales:    u32,
    pub sold_out_flag:     bool,
    pub sold_out_time:     Option<NaiveTime>,
    pub category:          String,
    pub price:             f64,
    pub availability_flag: bool,
}

impl FoodRecord {
    /// Drop a sold-out time that was recorded without the sold-out flag.
    pub fn normalized(mut self) -> Self {
        if !self.sold_out_flag && self.sold_out_time.is_some() {
            tracing::debug!(
                "{} '{}': sold_out_time ignored because sold_out_flag is false",
                self.date, self.dish_name
            );
            self.sold_out_time = None;
        }
        self
    }

    pub fn validate(&self) -> ForecastResult<()> {
        if self.delivery_sales > self.total_sales {
            return Err(ForecastError::InvalidRecord(format!(
                "{} '{}': delivery_sales {} exceeds total_sales {}",
                self.date, self.dish_name, self.delivery_sales, self.total_sales
            )));
        }
        if !(self.price >= 0.0) || !self.price.is_finite() {
            return Err(ForecastError::InvalidRecord(format!(
                "{} '{}': price {} must be a finite value >= 0",
                self.date, self.dish_name, self.price
            )));
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn attendance(date: &str, customers: u32) -> AttendanceRecord {
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap();
        AttendanceRecord {
            date,
            weekday:             date.weekday().num_days_from_monday() as u8,
            temperature:         22.0,
            rainfall:            0.0,
            weather_label:       "sunny".to_string(),
            is_holiday:          false,
            special_day_label:   None,
            peak_hours_label:    Some("13:00-15:00".to_string()),
            delivery_orders:     customers / 4,
            total_customers:     customers,
            advertising_flag:    false,
            tourist_season_flag: false,
        }
    }

    pub(crate) fn food(date: &str, dish: &str, sales: u32) -> FoodRecord {
        FoodRecord {
            date:              NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            dish_name:         dish.to_string(),
            total_sales:       sales,
            delivery_sales:    sales / 3,
            sold_out_flag:     false,
            sold_out_time:     None,
            category:          "main".to_string(),
            price:             11.5,
            availability_flag: true,
        }
    }

    #[test]
    fn test_season_follows_date() {
        assert_eq!(attendance("2024-01-10", 10).season(), 1);
        assert_eq!(attendance("2024-07-15", 10).season(), 3);
    }

    #[test]
    fn test_delivery_sales_cannot_exceed_total() {
        let mut row = food("2024-07-15", "moussaka", 10);
        row.delivery_sales = 11;
        assert!(matches!(row.validate(), Err(ForecastError::InvalidRecord(_))));
    }

    #[test]
    fn test_negative_rainfall_is_rejected() {
        let mut row = attendance("2024-07-15", 10);
        row.rainfall = -1.0;
        assert!(row.validate().is_err());
    }

    #[test]
    fn test_sold_out_time_dropped_without_flag() {
        let mut row = food("2024-07-15", "souvlaki", 10);
        row.sold_out_time = NaiveTime::from_hms_opt(14, 30, 0);
        assert_eq!(row.normalized().sold_out_time, None);
    }
}
