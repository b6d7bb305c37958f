use std::path::Path;

use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveTime};
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use datafusion::scalar::ScalarValue;

use crate::error::Result;
use crate::utils::constants::{DROPOFF_COL, PICKUP_COL, TRIPS_TABLE};

/// Which timestamp column the exclusive end of the query interval is
/// applied to. `Pickup` keeps all five operations symmetric; `Dropoff`
/// reproduces the historical hourly-profile behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpperBound {
    #[default]
    Pickup,
    Dropoff,
}

impl UpperBound {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            UpperBound::Pickup => PICKUP_COL,
            UpperBound::Dropoff => DROPOFF_COL,
        }
    }
}

/// Handle over the `trips` relation. Opening registers the cleaned file or
/// partition directory on a fresh session context, so a reopen always
/// replaces the previous definition and queries see exactly the rows in
/// the backing files.
pub struct TripsView {
    ctx: SessionContext,
    upper_bound: UpperBound,
}

impl TripsView {
    pub async fn open(cleaned_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_bound(cleaned_path, UpperBound::default()).await
    }

    pub async fn open_with_bound(
        cleaned_path: impl AsRef<Path>,
        upper_bound: UpperBound,
    ) -> Result<Self> {
        let path = cleaned_path.as_ref();
        let mut location = path.to_string_lossy().into_owned();
        // A trailing separator makes the registration a union over every
        // partition in the directory
        if path.is_dir() && !location.ends_with('/') {
            location.push('/');
        }

        let ctx = SessionContext::new();
        ctx.register_parquet(TRIPS_TABLE, &location, ParquetReadOptions::default())
            .await?;

        Ok(Self { ctx, upper_bound })
    }

    pub fn upper_bound(&self) -> UpperBound {
        self.upper_bound
    }

    /// Execute one aggregation with the interval bounds bound as the only
    /// two query parameters
    pub(crate) async fn run_interval_query(
        &self,
        sql: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecordBatch>> {
        let params = vec![
            ScalarValue::TimestampMicrosecond(Some(midnight_micros(start)), None),
            ScalarValue::TimestampMicrosecond(Some(midnight_micros(end)), None),
        ];

        let batches = self
            .ctx
            .sql(sql)
            .await?
            .with_param_values(params)?
            .collect()
            .await?;
        Ok(batches)
    }
}

/// Microseconds since the epoch at midnight on `date`, matching the
/// normalized timestamp columns
fn midnight_micros(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_micros()
}
