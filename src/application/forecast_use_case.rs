// ============================================================
// Layer 2 — ForecastUseCase
// ============================================================
// Runs the two-stage forecast for one query:
//
//   AwaitingAttendance ──stage 1──► AwaitingFoodSales ──stage 2──► Done
//          │                               │
//          └──────────────► Failed ◄───────┘
//
// Stage 2 only ever sees the customer count stage 1 produced
// for the same query. Either both numbers come back or the
// query fails as a whole.
//
// The CLI does not look at ForecastError directly; it receives
// a ForecastStatus built at this boundary.

use std::fmt;

use chrono::NaiveDate;

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::features::{self, Stage, DEFAULT_DELIVERY_FRACTION};
use crate::ml::inferencer::{predict_attendance, predict_food_sales};
use crate::ml::provider::ModelProvider;

// ─── Queries ──────────────────────────────────────────────────────────────────
/// Inputs of the attendance stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceQuery {
    pub date:           NaiveDate,
    pub temperature:    f64,
    pub rainfall:       f64,
    pub is_holiday:     bool,
    pub advertising:    bool,
    pub tourist_season: bool,
}

impl AttendanceQuery {
    /// Dry, ordinary day: no rain, no holiday, no advertising, off-season.
    pub fn new(date: NaiveDate, temperature: f64) -> Self {
        Self {
            date,
            temperature,
            rainfall:       0.0,
            is_holiday:     false,
            advertising:    false,
            tourist_season: false,
        }
    }
}

/// Inputs of a full dish forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodQuery {
    pub dish_name:         String,
    pub day:               AttendanceQuery,
    pub price:             f64,
    pub available:         bool,
    pub delivery_fraction: f64,
}

impl FoodQuery {
    pub fn new(dish_name: impl Into<String>, date: NaiveDate, temperature: f64, price: f64) -> Self {
        Self {
            dish_name:         dish_name.into(),
            day:               AttendanceQuery::new(date, temperature),
            price,
            available:         true,
            delivery_fraction: DEFAULT_DELIVERY_FRACTION,
        }
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceForecast {
    pub date:                NaiveDate,
    pub predicted_customers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forecast {
    pub date:                 NaiveDate,
    pub dish_name:            String,
    pub predicted_customers:  u32,
    pub predicted_food_sales: u32,
}

impl fmt::Display for AttendanceForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} customers expected", self.date, self.predicted_customers)
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} customers expected, {} x {}",
            self.date, self.predicted_customers, self.predicted_food_sales, self.dish_name
        )
    }
}

/// Where a query is in the two-stage pipeline.
#[derive(Debug)]
pub enum ForecastState {
    AwaitingAttendance,
    AwaitingFoodSales { predicted_customers: u32 },
    Done(Forecast),
    Failed(ForecastError),
}

/// The one outcome the CLI reports for a query.
#[derive(Debug)]
pub enum ForecastStatus<T> {
    Success(T),
    ModelUnavailable(Stage),
    InvalidInput(String),
    Failed(String),
}

impl<T> ForecastStatus<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ForecastStatus::Success(_))
    }
}

impl<T> From<ForecastResult<T>> for ForecastStatus<T> {
    fn from(result: ForecastResult<T>) -> Self {
        match result {
            Ok(value)                                        => ForecastStatus::Success(value),
            Err(ForecastError::ModelUnavailable(stage))      => ForecastStatus::ModelUnavailable(stage),
            Err(e @ ForecastError::PredictionInputInvalid { .. }) => ForecastStatus::InvalidInput(e.to_string()),
            Err(e)                                           => ForecastStatus::Failed(e.to_string()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for ForecastStatus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastStatus::Success(value)          => write!(f, "{value}"),
            ForecastStatus::ModelUnavailable(stage) => {
                write!(f, "The {stage} model is not available. Run `train` first.")
            }
            ForecastStatus::InvalidInput(msg) => write!(f, "Rejected query: {msg}"),
            ForecastStatus::Failed(msg)       => write!(f, "Forecast failed: {msg}"),
        }
    }
}

// ─── ForecastUseCase ──────────────────────────────────────────────────────────
pub struct ForecastUseCase {
    models: ModelProvider,
}

impl ForecastUseCase {
    pub fn new(models: ModelProvider) -> Self {
        Self { models }
    }

    /// Re-read the model directory, e.g. after a training run.
    pub fn reload_models(&mut self) {
        self.models.reload();
    }

    /// Stage 1 only.
    pub fn predict_attendance(&self, query: &AttendanceQuery) -> ForecastResult<AttendanceForecast> {
        let predicted_customers = self.run_attendance(query)?;
        Ok(AttendanceForecast { date: query.date, predicted_customers })
    }

    /// Both stages, or nothing.
    pub fn forecast(&self, query: &FoodQuery) -> ForecastResult<Forecast> {
        let mut state = ForecastState::AwaitingAttendance;
        loop {
            state = match state {
                ForecastState::AwaitingAttendance => {
                    let stage1 = features::validate_food_inputs(query.price, query.delivery_fraction)
                        .and_then(|()| self.run_attendance(&query.day));
                    match stage1 {
                        Ok(predicted_customers) => ForecastState::AwaitingFoodSales { predicted_customers },
                        Err(e)                  => ForecastState::Failed(e),
                    }
                }
                ForecastState::AwaitingFoodSales { predicted_customers } => {
                    match self.run_food(query, predicted_customers) {
                        Ok(predicted_food_sales) => ForecastState::Done(Forecast {
                            date:      query.day.date,
                            dish_name: query.dish_name.clone(),
                            predicted_customers,
                            predicted_food_sales,
                        }),
                        Err(e) => ForecastState::Failed(e),
                    }
                }
                ForecastState::Done(forecast) => return Ok(forecast),
                ForecastState::Failed(e) => {
                    tracing::warn!("Forecast for '{}' on {} failed: {e}", query.dish_name, query.day.date);
                    return Err(e);
                }
            };
            tracing::debug!("forecast state: {state:?}");
        }
    }

    pub fn attendance_status(&self, query: &AttendanceQuery) -> ForecastStatus<AttendanceForecast> {
        self.predict_attendance(query).into()
    }

    pub fn forecast_status(&self, query: &FoodQuery) -> ForecastStatus<Forecast> {
        self.forecast(query).into()
    }

    fn run_attendance(&self, query: &AttendanceQuery) -> ForecastResult<u32> {
        features::validate_attendance_inputs(query.temperature, query.rainfall)?;
        let encoded = features::encode_attendance_features(
            query.date,
            query.temperature,
            query.rainfall,
            query.is_holiday,
            query.advertising,
            query.tourist_season,
        );
        predict_attendance(&self.models, &encoded)
    }

    fn run_food(&self, query: &FoodQuery, predicted_customers: u32) -> ForecastResult<u32> {
        let encoded = features::encode_food_features(
            query.day.date,
            query.day.temperature,
            query.day.is_holiday,
            predicted_customers,
            query.price,
            query.available,
            query.delivery_fraction,
        );
        predict_food_sales(&self.models, &encoded)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Regressor;
    use crate::ml::testing::{ConstantRegressor, RecordingRegressor};

    fn july_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn boxed(r: impl Regressor + 'static) -> Option<Box<dyn Regressor>> {
        Some(Box::new(r))
    }

    #[test]
    fn test_summer_monday_scenario() {
        let (att, att_seen)   = RecordingRegressor::new(42.0, 7);
        let (food, food_seen) = RecordingRegressor::new(17.0, 8);
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(boxed(att), boxed(food)));

        let forecast = uc.forecast(&FoodQuery::new("moussaka", july_15(), 28.0, 12.5)).unwrap();
        assert_eq!(forecast.predicted_customers, 42);
        assert_eq!(forecast.predicted_food_sales, 17);

        assert_eq!(*att_seen.borrow(), vec![vec![0.0, 28.0, 0.0, 0.0, 3.0, 0.0, 0.0]]);
        assert_eq!(*food_seen.borrow(), vec![vec![0.0, 28.0, 0.0, 3.0, 42.0, 13.0, 12.5, 1.0]]);
    }

    #[test]
    fn test_food_stage_sees_this_querys_attendance() {
        let (food, food_seen) = RecordingRegressor::new(5.0, 8);
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(ConstantRegressor::new(80.0, 7)),
            boxed(food),
        ));
        let mut query = FoodQuery::new("gyros", july_15(), 30.0, 9.0);
        query.delivery_fraction = 0.5;
        uc.forecast(&query).unwrap();

        let seen = food_seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][4], 80.0);
        assert_eq!(seen[0][5], 40.0);
    }

    #[test]
    fn test_missing_attendance_model_stops_before_stage_two() {
        let (food, food_seen) = RecordingRegressor::new(5.0, 8);
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(None, boxed(food)));

        let status = uc.forecast_status(&FoodQuery::new("gyros", july_15(), 28.0, 9.0));
        assert!(matches!(status, ForecastStatus::ModelUnavailable(Stage::Attendance)));
        assert!(food_seen.borrow().is_empty());
    }

    #[test]
    fn test_missing_food_model_returns_no_partial_result() {
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(ConstantRegressor::new(50.0, 7)),
            None,
        ));
        let query = FoodQuery::new("gyros", july_15(), 28.0, 9.0);
        assert!(matches!(uc.forecast(&query), Err(ForecastError::ModelUnavailable(Stage::Food))));

        // attendance on its own still works
        let day = uc.predict_attendance(&query.day).unwrap();
        assert_eq!(day, AttendanceForecast { date: july_15(), predicted_customers: 50 });
    }

    #[test]
    fn test_negative_attendance_feeds_zero_customers() {
        let (food, food_seen) = RecordingRegressor::new(-3.0, 8);
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(ConstantRegressor::new(-8.0, 7)),
            boxed(food),
        ));
        let forecast = uc.forecast(&FoodQuery::new("gyros", july_15(), 28.0, 9.0)).unwrap();
        assert_eq!(forecast.predicted_customers, 0);
        assert_eq!(forecast.predicted_food_sales, 0);
        assert_eq!(food_seen.borrow()[0][4], 0.0);
    }

    #[test]
    fn test_negative_price_is_rejected_before_any_model_runs() {
        let (att, att_seen) = RecordingRegressor::new(42.0, 7);
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(att),
            boxed(ConstantRegressor::new(1.0, 8)),
        ));
        let status = uc.forecast_status(&FoodQuery::new("gyros", july_15(), 28.0, -1.0));
        assert!(matches!(status, ForecastStatus::InvalidInput(_)));
        assert!(status.to_string().contains("price"));
        assert!(att_seen.borrow().is_empty());
    }

    #[test]
    fn test_negative_rainfall_is_invalid_input() {
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(ConstantRegressor::new(42.0, 7)),
            None,
        ));
        let mut query = AttendanceQuery::new(july_15(), 20.0);
        query.rainfall = -2.0;
        assert!(matches!(uc.attendance_status(&query), ForecastStatus::InvalidInput(_)));
    }

    #[test]
    fn test_success_status_displays_the_forecast() {
        let uc = ForecastUseCase::new(ModelProvider::from_regressors(
            boxed(ConstantRegressor::new(42.0, 7)),
            boxed(ConstantRegressor::new(17.0, 8)),
        ));
        let status = uc.forecast_status(&FoodQuery::new("moussaka", july_15(), 28.0, 12.5));
        assert_eq!(status.to_string(), "2024-07-15: 42 customers expected, 17 x moussaka");
    }
}
