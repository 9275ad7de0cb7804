// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands:
//
//   init-db             create the schema store
//   ingest              load CSV files into the store
//   show                print the stored tables
//   clear               empty the store
//   train               fit both stage models
//   predict-attendance  stage 1 for one day
//   predict-food        both stages for one dish on one day
//
// Conversion into application types happens here, so the
// application layer never sees clap types.

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::forecast_use_case::{AttendanceQuery, FoodQuery};
use crate::application::train_use_case::TrainConfig;
use crate::domain::features::DEFAULT_DELIVERY_FRACTION;
use crate::infra::store::Table;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the attendance and food tables (safe to re-run)
    InitDb(DbArgs),

    /// Append CSV files to the store; attendance files are loaded first
    Ingest(IngestArgs),

    /// Print stored rows
    Show(ShowArgs),

    /// Delete every row from both tables
    Clear(DbArgs),

    /// Fit the attendance and food models
    Train(TrainArgs),

    /// Predict the number of customers for one day
    PredictAttendance(PredictAttendanceArgs),

    /// Predict customers and then sales of one dish for one day
    PredictFood(PredictFoodArgs),
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// SQLite database file
    #[arg(long, default_value = "restaurant.db")]
    pub db: PathBuf,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub store: DbArgs,

    /// Attendance CSV file (repeatable)
    #[arg(long = "attendance", value_name = "FILE")]
    pub attendance_files: Vec<PathBuf>,

    /// Food CSV file (repeatable)
    #[arg(long = "food", value_name = "FILE")]
    pub food_files: Vec<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum TableArg {
    Attendance,
    Food,
}

impl From<TableArg> for Table {
    fn from(t: TableArg) -> Self {
        match t {
            TableArg::Attendance => Table::Attendance,
            TableArg::Food       => Table::Food,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: DbArgs,

    /// Only this table (both when omitted)
    #[arg(long, value_enum)]
    pub table: Option<TableArg>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of attendance_*.csv files
    #[arg(long, default_value = "attendance_data")]
    pub attendance_dir: String,

    /// Directory of food_*.csv files
    #[arg(long, default_value = "food_data")]
    pub food_dir: String,

    /// Train from this SQLite store instead of the CSV directories
    #[arg(long, value_name = "DB")]
    pub from_db: Option<String>,

    /// Where the fitted models, metrics and config are written
    #[arg(long, default_value = "models")]
    pub model_dir: String,

    /// Append-only training log
    #[arg(long, default_value = "logs/training_log.txt")]
    pub log_file: String,

    /// Full passes over the training rows
    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Width of both hidden layers
    #[arg(long, default_value_t = 32)]
    pub hidden_size: usize,

    /// Share of rows used for fitting; the rest is validation
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed of the split and the minibatch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            attendance_dir: a.attendance_dir,
            food_dir:       a.food_dir,
            db_path:        a.from_db,
            model_dir:      a.model_dir,
            log_file:       a.log_file,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            lr:             a.lr,
            hidden_size:    a.hidden_size,
            train_fraction: a.train_fraction,
            seed:           a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictAttendanceArgs {
    /// Day to forecast (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Expected temperature in °C
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: f64,

    /// Expected rainfall in mm
    #[arg(long, default_value_t = 0.0)]
    pub rainfall: f64,

    #[arg(long)]
    pub holiday: bool,

    /// An advertising campaign is running
    #[arg(long)]
    pub advertising: bool,

    #[arg(long)]
    pub tourist_season: bool,

    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,
}

impl From<&PredictAttendanceArgs> for AttendanceQuery {
    fn from(a: &PredictAttendanceArgs) -> Self {
        AttendanceQuery {
            date:           a.date,
            temperature:    a.temperature,
            rainfall:       a.rainfall,
            is_holiday:     a.holiday,
            advertising:    a.advertising,
            tourist_season: a.tourist_season,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictFoodArgs {
    /// Dish to forecast
    #[arg(long)]
    pub dish: String,

    /// Day to forecast (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Expected temperature in °C
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: f64,

    /// Expected rainfall in mm
    #[arg(long, default_value_t = 0.0)]
    pub rainfall: f64,

    #[arg(long)]
    pub holiday: bool,

    /// Menu price of the dish
    #[arg(long)]
    pub price: f64,

    /// The dish is off the menu that day
    #[arg(long)]
    pub unavailable: bool,

    /// Share of predicted customers expected to order delivery
    #[arg(long, default_value_t = DEFAULT_DELIVERY_FRACTION)]
    pub delivery_fraction: f64,

    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,
}

impl From<&PredictFoodArgs> for FoodQuery {
    fn from(a: &PredictFoodArgs) -> Self {
        let mut query = FoodQuery::new(a.dish.clone(), a.date, a.temperature, a.price);
        query.day.rainfall      = a.rainfall;
        query.day.is_holiday    = a.holiday;
        query.available         = !a.unavailable;
        query.delivery_fraction = a.delivery_fraction;
        query
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("restaurant-forecast").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_predict_food_defaults() {
        let Commands::PredictFood(args) = parse(&[
            "predict-food", "--dish", "moussaka", "--date", "2024-07-15",
            "--temperature", "28", "--price", "12.5",
        ]) else {
            panic!("wrong subcommand");
        };
        let query = FoodQuery::from(&args);
        assert_eq!(query.day.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(query.day.rainfall, 0.0);
        assert!(query.available);
        assert_eq!(query.delivery_fraction, 0.3);
        assert_eq!(args.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_negative_temperature_is_accepted() {
        let Commands::PredictAttendance(args) = parse(&[
            "predict-attendance", "--date", "2024-01-10", "--temperature", "-4.5", "--holiday",
        ]) else {
            panic!("wrong subcommand");
        };
        let query = AttendanceQuery::from(&args);
        assert_eq!(query.temperature, -4.5);
        assert!(query.is_holiday);
    }

    #[test]
    fn test_bad_date_is_a_parse_error() {
        let result = Cli::try_parse_from([
            "restaurant-forecast", "predict-attendance", "--date", "15/07/2024", "--temperature", "20",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_train_flags_become_config() {
        let Commands::Train(args) = parse(&["train", "--from-db", "r.db", "--epochs", "3"]) else {
            panic!("wrong subcommand");
        };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.db_path.as_deref(), Some("r.db"));
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.model_dir, "models");
    }

    #[test]
    fn test_ingest_accepts_repeated_files() {
        let Commands::Ingest(args) = parse(&[
            "ingest", "--attendance", "a1.csv", "--attendance", "a2.csv", "--food", "f.csv",
        ]) else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.attendance_files.len(), 2);
        assert_eq!(args.food_files, vec![PathBuf::from("f.csv")]);
        assert_eq!(args.store.db, PathBuf::from("restaurant.db"));
    }
}
