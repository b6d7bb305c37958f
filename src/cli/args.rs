use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::query::UpperBound;
use crate::utils::catalog::MonthRef;

#[derive(Parser)]
#[command(name = "taxi-analytics")]
#[command(about = "NYC yellow taxi trip record cleaner and analytics queries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Settings file path")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download raw monthly trip files from the published dataset
    Fetch {
        #[arg(long, help = "First month to download (YYYY-MM)")]
        from: MonthRef,

        #[arg(long, help = "Last month to download (YYYY-MM)")]
        to: MonthRef,

        #[arg(short, long, help = "Destination directory [default: settings raw_dir]")]
        output_dir: Option<PathBuf>,
    },

    /// Clean one raw monthly file, or every monthly file in a directory
    Clean {
        #[arg(short, long, help = "Raw monthly file, or directory of monthly files")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Cleaned partition directory [default: settings cleaned_dir]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Parquet compression [default: settings compression]")]
        compression: Option<String>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, help = "Emit cleaning reports as JSON")]
        json_report: bool,
    },

    /// Run one of the aggregation queries against the cleaned dataset
    Query {
        #[arg(value_enum)]
        operation: QueryOperation,

        #[arg(long, help = "Interval start, inclusive (YYYY-MM-DD) [default: configured window]")]
        start: Option<NaiveDate>,

        #[arg(long, help = "Interval end, exclusive (YYYY-MM-DD)")]
        end: Option<NaiveDate>,

        #[arg(
            short,
            long,
            help = "Cleaned file or partition directory [default: settings cleaned_dir]"
        )]
        data: Option<PathBuf>,

        #[arg(
            long,
            value_enum,
            default_value = "pickup",
            help = "Timestamp column the exclusive end bound applies to"
        )]
        upper_bound: BoundColumn,
    },

    /// Display information about a cleaned Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueryOperation {
    DailyRevenue,
    TripsPerDay,
    TripsPerHour,
    AvgFare,
    AvgTripDuration,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BoundColumn {
    Pickup,
    Dropoff,
}

impl From<BoundColumn> for UpperBound {
    fn from(bound: BoundColumn) -> Self {
        match bound {
            BoundColumn::Pickup => UpperBound::Pickup,
            BoundColumn::Dropoff => UpperBound::Dropoff,
        }
    }
}
