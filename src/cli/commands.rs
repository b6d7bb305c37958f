use chrono::{Local, NaiveDate};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Commands, QueryOperation};
use crate::config::Settings;
use crate::error::Result;
use crate::fetch::Downloader;
use crate::processors::{BatchCleaner, TripCleaner};
use crate::query::TripsView;
use crate::utils::catalog::month_range;
use crate::utils::progress::ProgressReporter;
use crate::writers::CleanedTripWriter;

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            from,
            to,
            output_dir,
        } => {
            let dest = output_dir.unwrap_or_else(|| settings.raw_dir.clone());
            let months = month_range(from, to);
            if months.is_empty() {
                println!("Nothing to download: {} is after {}", from, to);
                return Ok(());
            }

            let progress = ProgressReporter::new(
                months.len() as u64,
                "Downloading raw trip files...",
                false,
            );
            let downloader = Downloader::new();
            let paths = downloader
                .download_range(from, to, &dest, Some(&progress))
                .await?;
            progress.finish_with_message(&format!("Downloaded {} files", paths.len()));

            for path in paths {
                println!("{}", path.display());
            }
        }

        Commands::Clean {
            input,
            output_dir,
            compression,
            max_workers,
            json_report,
        } => {
            let output = output_dir.unwrap_or_else(|| settings.cleaned_dir.clone());
            let compression = compression.unwrap_or_else(|| settings.compression.clone());

            let reports = if input.is_dir() {
                let batch = BatchCleaner::new(max_workers)
                    .with_compression(&compression)?
                    .with_row_group_size(settings.row_group_size);
                let total = batch.discover_sources(&input)?.len() as u64;
                let progress =
                    ProgressReporter::new(total, "Cleaning monthly trip files...", false);
                batch.clean_directory(&input, &output, Some(&progress))?
            } else {
                let cleaner = TripCleaner::new()
                    .with_compression(&compression)?
                    .with_row_group_size(settings.row_group_size);
                vec![cleaner.clean_file(&input, &output)?]
            };

            if json_report {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    println!("\n{}", report.summary());
                }
            }
        }

        Commands::Query {
            operation,
            start,
            end,
            data,
            upper_bound,
        } => {
            let data = data.unwrap_or_else(|| settings.cleaned_dir.clone());
            let (default_start, default_end) =
                settings.default_interval(Local::now().date_naive());
            let start = start.unwrap_or(default_start);
            let end = end.unwrap_or(default_end);

            let view = TripsView::open_with_bound(&data, upper_bound.into()).await?;
            run_query(&view, operation, start, end).await?;
        }

        Commands::Info { file, sample } => {
            let writer = CleanedTripWriter::new();
            let info = writer.get_file_info(&file)?;
            println!("{}", info.summary());

            if sample > 0 {
                let records = writer.read_sample_records(&file, sample)?;
                println!("\nSample Records (showing {}):", records.len());
                for (i, record) in records.iter().enumerate() {
                    println!(
                        "{}. {} -> {}: {:.2} mi, ${:.2} total, ${:.2} surcharge",
                        i + 1,
                        record.tpep_pickup_datetime,
                        record.tpep_dropoff_datetime,
                        record.trip_distance,
                        record.total_amount,
                        record.congestion_surcharge
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_query(
    view: &TripsView,
    operation: QueryOperation,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    println!("Interval: [{}, {})", start, end);

    match operation {
        QueryOperation::DailyRevenue => {
            let rows = view.daily_revenue(start, end).await?;
            if rows.is_empty() {
                println!("No data for the requested interval");
                return Ok(());
            }
            println!("{:<12} {:>14}", "trip_date", "total_revenue");
            for row in rows {
                println!("{:<12} {:>14.2}", row.trip_date.to_string(), row.total_revenue);
            }
        }
        QueryOperation::TripsPerDay => {
            let rows = view.trips_per_day(start, end).await?;
            if rows.is_empty() {
                println!("No data for the requested interval");
                return Ok(());
            }
            println!("{:<12} {:>10}", "trip_date", "trip_count");
            for row in rows {
                println!("{:<12} {:>10}", row.trip_date.to_string(), row.trip_count);
            }
        }
        QueryOperation::TripsPerHour => {
            let rows = view.trips_per_hour(start, end).await?;
            if rows.is_empty() {
                println!("No data for the requested interval");
                return Ok(());
            }
            println!("{:<12} {:>16}", "pickup_hour", "avg_trip_minutes");
            for row in rows {
                println!("{:<12} {:>16.2}", row.pickup_hour, row.avg_trip_minutes);
            }
        }
        QueryOperation::AvgFare => {
            let rows = view.avg_fare(start, end).await?;
            if rows.is_empty() {
                println!("No data for the requested interval");
                return Ok(());
            }
            println!("{:<12} {:>10}", "trip_date", "avg_fare");
            for row in rows {
                println!("{:<12} {:>10.2}", row.trip_date.to_string(), row.avg_fare);
            }
        }
        QueryOperation::AvgTripDuration => match view.avg_trip_duration(start, end).await? {
            Some(minutes) => println!("Average trip duration: {:.2} minutes", minutes),
            None => println!("No data for the requested interval"),
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
