// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, hands the work to a use case in
// Layer 2 and prints the outcome. A forecast that does not
// succeed is printed and turned into a non-zero exit.

pub mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use commands::{
    Commands, DbArgs, IngestArgs, PredictAttendanceArgs, PredictFoodArgs, ShowArgs, TrainArgs,
};

use crate::application::{
    database_use_case::DatabaseUseCase,
    forecast_use_case::{AttendanceQuery, FoodQuery, ForecastUseCase},
    train_use_case::TrainUseCase,
};
use crate::domain::records::{AttendanceRecord, FoodRecord, TIME_FORMAT};
use crate::infra::{checkpoint::CheckpointManager, store::Table};
use crate::ml::provider::ModelProvider;

#[derive(Parser, Debug)]
#[command(
    name = "restaurant-forecast",
    version,
    about = "Forecast restaurant attendance and per-dish sales from historical records."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::InitDb(args)            => run_init(args),
            Commands::Ingest(args)            => run_ingest(args),
            Commands::Show(args)              => run_show(args),
            Commands::Clear(args)             => run_clear(args),
            Commands::Train(args)             => run_train(args),
            Commands::PredictAttendance(args) => run_predict_attendance(args),
            Commands::PredictFood(args)       => run_predict_food(args),
        }
    }
}

fn run_init(args: DbArgs) -> Result<()> {
    DatabaseUseCase::new(&args.db).init()?;
    println!("Database ready at '{}'", args.db.display());
    Ok(())
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    if args.attendance_files.is_empty() && args.food_files.is_empty() {
        bail!("nothing to ingest: pass --attendance and/or --food files");
    }
    let db = DatabaseUseCase::new(&args.store.db);
    for report in db.ingest(&args.attendance_files, &args.food_files)? {
        println!("{}", report.summary());
        for rejected in &report.append.rejected {
            println!("  skipped: {rejected}");
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<()> {
    let db = DatabaseUseCase::new(&args.store.db);
    let tables = match args.table {
        Some(t) => vec![Table::from(t)],
        None    => vec![Table::Attendance, Table::Food],
    };
    for table in tables {
        match table {
            Table::Attendance => print_attendance(db.count(table)?, &db.attendance_rows()?),
            Table::Food       => print_food(db.count(table)?, &db.food_rows()?),
        }
    }
    Ok(())
}

fn run_clear(args: DbArgs) -> Result<()> {
    let db = DatabaseUseCase::new(&args.db);
    db.clear()?;
    println!("Cleared attendance and food tables in '{}'", args.db.display());
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let model_dir = args.model_dir.clone();
    let report = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Attendance model: {} rows | Food model: {} rows ({} orphaned row(s) dropped)",
        report.attendance_rows, report.food_rows, report.orphaned_food_rows,
    );
    for (name, summary) in [("attendance", &report.attendance), ("food", &report.food)] {
        if let Some(mae) = summary.val_mae {
            println!("  {name}: validation MAE {mae:.2}");
        }
    }
    println!("Training complete. Models saved to '{model_dir}'.");
    Ok(())
}

fn run_predict_attendance(args: PredictAttendanceArgs) -> Result<()> {
    let forecaster = ForecastUseCase::new(ModelProvider::load(CheckpointManager::new(&args.model_dir)));
    let status = forecaster.attendance_status(&AttendanceQuery::from(&args));
    if !status.is_success() {
        bail!("{status}");
    }
    println!("{status}");
    Ok(())
}

fn run_predict_food(args: PredictFoodArgs) -> Result<()> {
    let forecaster = ForecastUseCase::new(ModelProvider::load(CheckpointManager::new(&args.model_dir)));
    let status = forecaster.forecast_status(&FoodQuery::from(&args));
    if !status.is_success() {
        bail!("{status}");
    }
    println!("{status}");
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn print_attendance(total: usize, rows: &[AttendanceRecord]) {
    println!("attendance ({total} rows)");
    println!(
        "{:<10}  {:>2}  {:>6}  {:>6}  {:<10}  {:<7}  {:>6}  {:>9}  {:>6}  {:<3}  {:<7}",
        "date", "wd", "temp", "rain", "weather", "holiday", "season", "customers", "deliv", "adv", "tourist",
    );
    for r in rows {
        println!(
            "{:<10}  {:>2}  {:>6.1}  {:>6.1}  {:<10}  {:<7}  {:>6}  {:>9}  {:>6}  {:<3}  {:<7}",
            r.date.to_string(),
            r.weekday,
            r.temperature,
            r.rainfall,
            r.weather_label,
            yes_no(r.is_holiday),
            r.season(),
            r.total_customers,
            r.delivery_orders,
            yes_no(r.advertising_flag),
            yes_no(r.tourist_season_flag),
        );
    }
}

fn print_food(total: usize, rows: &[FoodRecord]) {
    println!("food ({total} rows)");
    println!(
        "{:<10}  {:<20}  {:>5}  {:>5}  {:<8}  {:<10}  {:>7}  {:<9}",
        "date", "dish", "sales", "deliv", "sold_out", "category", "price", "available",
    );
    for r in rows {
        let sold_out = match (r.sold_out_flag, r.sold_out_time) {
            (true, Some(t)) => t.format(TIME_FORMAT).to_string(),
            (flag, _)       => yes_no(flag).to_string(),
        };
        println!(
            "{:<10}  {:<20}  {:>5}  {:>5}  {:<8}  {:<10}  {:>7.2}  {:<9}",
            r.date.to_string(),
            r.dish_name,
            r.total_sales,
            r.delivery_sales,
            sold_out,
            r.category,
            r.price,
            yes_no(r.availability_flag),
        );
    }
}
