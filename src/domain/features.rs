// ============================================================
// Layer 3 — Feature Encoder
// ============================================================
// Maps a calendar date plus raw inputs to the fixed-order
// numeric vector each regression stage expects.
//
//   stage 1 (attendance): [weekday, temperature, rainfall,
//                          is_holiday, season, advertising,
//                          tourist]
//   stage 2 (food):       [weekday, temperature, is_holiday,
//                          season, customers, delivery,
//                          price, available]
//
// Both the training pipeline and the inference orchestrator
// build their vectors through this module and nowhere else.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ForecastError, ForecastResult};

pub const ATTENDANCE_FEATURE_COUNT: usize = 7;
pub const FOOD_FEATURE_COUNT: usize = 8;

/// Share of predicted customers expected to order by delivery
pub const DEFAULT_DELIVERY_FRACTION: f64 = 0.3;

pub const ATTENDANCE_FEATURE_NAMES: [&str; ATTENDANCE_FEATURE_COUNT] = [
    "weekday", "temperature", "rainfall", "is_holiday",
    "season", "advertising_flag", "tourist_season_flag",
];

pub const FOOD_FEATURE_NAMES: [&str; FOOD_FEATURE_COUNT] = [
    "weekday", "temperature", "is_holiday", "season",
    "customers", "delivery_orders", "price", "availability_flag",
];

pub type AttendanceFeatures = [f32; ATTENDANCE_FEATURE_COUNT];
pub type FoodFeatures = [f32; FOOD_FEATURE_COUNT];

/// The two regression stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Attendance,
    Food,
}

impl Stage {
    /// File stem used for the stage's model artifacts
    pub fn artifact_name(self) -> &'static str {
        match self {
            Stage::Attendance => "attendance_model",
            Stage::Food       => "food_model",
        }
    }

    pub fn feature_count(self) -> usize {
        match self {
            Stage::Attendance => ATTENDANCE_FEATURE_COUNT,
            Stage::Food       => FOOD_FEATURE_COUNT,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Attendance => f.write_str("attendance"),
            Stage::Food       => f.write_str("food"),
        }
    }
}

/// Calendar bucket from the month: Dec–Feb = 1, Mar–May = 2,
/// Jun–Aug = 3, Sep–Nov = 4.
pub fn season(date: NaiveDate) -> u8 {
    (((date.month() % 12) + 3) / 3) as u8
}

/// Monday = 0 … Sunday = 6
pub fn weekday(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

pub fn encode_attendance_features(
    date:             NaiveDate,
    temperature:      f64,
    rainfall:         f64,
    is_holiday:       bool,
    advertising_flag: bool,
    tourist_flag:     bool,
) -> AttendanceFeatures {
    [
        weekday(date) as f32,
        temperature as f32,
        rainfall as f32,
        flag(is_holiday),
        season(date) as f32,
        flag(advertising_flag),
        flag(tourist_flag),
    ]
}

/// Inference-time food vector: the delivery slot is estimated from
/// the stage-1 prediction.
pub fn encode_food_features(
    date:                NaiveDate,
    temperature:         f64,
    is_holiday:          bool,
    predicted_customers: u32,
    price:               f64,
    availability_flag:   bool,
    delivery_fraction:   f64,
) -> FoodFeatures {
    let delivery_estimate = (predicted_customers as f64 * delivery_fraction).round();
    food_row(
        date,
        temperature,
        is_holiday,
        predicted_customers as f64,
        delivery_estimate,
        price,
        availability_flag,
    )
}

/// Training-time food vector: the customer and delivery slots carry
/// the observed counts of the joined attendance day.
pub fn food_training_features(
    date:              NaiveDate,
    temperature:       f64,
    is_holiday:        bool,
    total_customers:   u32,
    delivery_orders:   u32,
    price:             f64,
    availability_flag: bool,
) -> FoodFeatures {
    food_row(
        date,
        temperature,
        is_holiday,
        total_customers as f64,
        delivery_orders as f64,
        price,
        availability_flag,
    )
}

fn food_row(
    date:              NaiveDate,
    temperature:       f64,
    is_holiday:        bool,
    customers:         f64,
    delivery:          f64,
    price:             f64,
    availability_flag: bool,
) -> FoodFeatures {
    [
        weekday(date) as f32,
        temperature as f32,
        flag(is_holiday),
        season(date) as f32,
        customers as f32,
        delivery as f32,
        price as f32,
        flag(availability_flag),
    ]
}

// ─── Boundary validation ─────────────────────────────────────────────────────
// Encoding itself never fails; these checks run first so that
// out-of-domain values are reported instead of reaching a regressor.

fn finite(field: &'static str, value: f64) -> ForecastResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ForecastError::PredictionInputInvalid { field, value, reason: "must be a finite number" })
    }
}

fn non_negative(field: &'static str, value: f64) -> ForecastResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ForecastError::PredictionInputInvalid { field, value, reason: "must be >= 0" });
    }
    Ok(())
}

pub fn validate_attendance_inputs(temperature: f64, rainfall: f64) -> ForecastResult<()> {
    finite("temperature", temperature)?;
    non_negative("rainfall", rainfall)
}

pub fn validate_food_inputs(price: f64, delivery_fraction: f64) -> ForecastResult<()> {
    non_negative("price", price)?;
    non_negative("delivery_fraction", delivery_fraction)?;
    if delivery_fraction > 1.0 {
        return Err(ForecastError::PredictionInputInvalid {
            field:  "delivery_fraction",
            value:  delivery_fraction,
            reason: "must be within 0..=1",
        });
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_season_is_always_in_range() {
        let mut d = date("2023-01-01");
        while d < date("2025-01-01") {
            let s = season(d);
            assert!((1..=4).contains(&s), "{d} gave season {s}");
            assert_eq!(s, season(d));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_season_boundaries() {
        assert_eq!(season(date("2024-12-01")), 1);
        assert_eq!(season(date("2024-02-29")), 1);
        assert_eq!(season(date("2024-03-01")), 2);
        assert_eq!(season(date("2024-06-01")), 3);
        assert_eq!(season(date("2024-09-01")), 4);
        assert_eq!(season(date("2024-11-30")), 4);
    }

    #[test]
    fn test_attendance_vector_for_summer_monday() {
        let features = encode_attendance_features(date("2024-07-15"), 28.0, 0.0, false, false, false);
        assert_eq!(features, [0.0, 28.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_food_vector_rounds_delivery_estimate() {
        let features = encode_food_features(
            date("2024-07-15"), 28.0, false, 42, 12.5, true, DEFAULT_DELIVERY_FRACTION,
        );
        // 42 * 0.3 = 12.6 → 13
        assert_eq!(features, [0.0, 28.0, 0.0, 3.0, 42.0, 13.0, 12.5, 1.0]);
    }

    #[test]
    fn test_training_and_inference_share_layout() {
        let d = date("2024-10-05");
        let inference = encode_food_features(d, 18.0, true, 100, 9.0, false, 0.3);
        let training  = food_training_features(d, 18.0, true, 100, 30, 9.0, false);
        assert_eq!(inference, training);
    }

    #[test]
    fn test_extreme_temperature_passes_through() {
        let features = encode_attendance_features(date("2024-01-03"), -40.0, 120.0, true, true, true);
        assert_eq!(features[1], -40.0);
        assert!(validate_attendance_inputs(-40.0, 120.0).is_ok());
    }

    #[test]
    fn test_negative_price_is_invalid() {
        let err = validate_food_inputs(-1.0, 0.3).unwrap_err();
        assert!(matches!(err, ForecastError::PredictionInputInvalid { field: "price", .. }));
    }

    #[test]
    fn test_delivery_fraction_above_one_is_invalid() {
        assert!(validate_food_inputs(10.0, 1.5).is_err());
        assert!(validate_attendance_inputs(f64::NAN, 0.0).is_err());
        assert!(validate_attendance_inputs(20.0, -0.5).is_err());
    }
}
