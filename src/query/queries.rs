use arrow::array::{Array, Date32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::Date32Type;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{AnalyticsError, Result};
use crate::query::view::TripsView;
use crate::utils::constants::{PICKUP_COL, TOTAL_AMOUNT_COL, TRIPS_TABLE};

/// Revenue for one pickup date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRevenue {
    pub trip_date: NaiveDate,
    pub total_revenue: f64,
}

/// Trip count for one pickup date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTripCount {
    pub trip_date: NaiveDate,
    pub trip_count: i64,
}

/// Mean trip duration for one pickup hour of day
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyDuration {
    pub pickup_hour: i32,
    pub avg_trip_minutes: f64,
}

/// Mean fare for one pickup date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyFare {
    pub trip_date: NaiveDate,
    pub avg_fare: f64,
}

const DURATION_MINUTES_EXPR: &str =
    "(to_unixtime(tpep_dropoff_datetime) - to_unixtime(tpep_pickup_datetime)) / 60.0";

impl TripsView {
    /// Revenue per pickup date over `[start, end)`, date ascending
    pub async fn daily_revenue(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyRevenue>> {
        let sql = format!(
            "SELECT CAST({pickup} AS DATE) AS trip_date, SUM({total}) AS total_revenue \
             FROM {table} WHERE {filter} GROUP BY trip_date ORDER BY trip_date ASC",
            pickup = PICKUP_COL,
            total = TOTAL_AMOUNT_COL,
            table = TRIPS_TABLE,
            filter = self.interval_filter(),
        );

        let batches = self.run_interval_query(&sql, start, end).await?;
        let mut rows = Vec::new();
        for batch in &batches {
            let dates = column_as::<Date32Array>(batch, "trip_date")?;
            let revenues = column_as::<Float64Array>(batch, "total_revenue")?;
            for i in 0..batch.num_rows() {
                rows.push(DailyRevenue {
                    trip_date: Date32Type::to_naive_date(dates.value(i)),
                    total_revenue: revenues.value(i),
                });
            }
        }
        Ok(rows)
    }

    /// Trip count per pickup date over `[start, end)`, count ascending
    pub async fn trips_per_day(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyTripCount>> {
        let sql = format!(
            "SELECT CAST({pickup} AS DATE) AS trip_date, COUNT(*) AS trip_count \
             FROM {table} WHERE {filter} GROUP BY trip_date ORDER BY trip_count ASC",
            pickup = PICKUP_COL,
            table = TRIPS_TABLE,
            filter = self.interval_filter(),
        );

        let batches = self.run_interval_query(&sql, start, end).await?;
        let mut rows = Vec::new();
        for batch in &batches {
            let dates = column_as::<Date32Array>(batch, "trip_date")?;
            let counts = column_as::<Int64Array>(batch, "trip_count")?;
            for i in 0..batch.num_rows() {
                rows.push(DailyTripCount {
                    trip_date: Date32Type::to_naive_date(dates.value(i)),
                    trip_count: counts.value(i),
                });
            }
        }
        Ok(rows)
    }

    /// Mean trip duration per pickup hour (0-23) over `[start, end)`,
    /// hour ascending
    pub async fn trips_per_hour(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<HourlyDuration>> {
        let sql = format!(
            "SELECT CAST(date_part('hour', {pickup}) AS INT) AS pickup_hour, \
             AVG({duration}) AS avg_trip_minutes \
             FROM {table} WHERE {filter} GROUP BY pickup_hour ORDER BY pickup_hour ASC",
            pickup = PICKUP_COL,
            duration = DURATION_MINUTES_EXPR,
            table = TRIPS_TABLE,
            filter = self.interval_filter(),
        );

        let batches = self.run_interval_query(&sql, start, end).await?;
        let mut rows = Vec::new();
        for batch in &batches {
            let hours = column_as::<Int32Array>(batch, "pickup_hour")?;
            let durations = column_as::<Float64Array>(batch, "avg_trip_minutes")?;
            for i in 0..batch.num_rows() {
                rows.push(HourlyDuration {
                    pickup_hour: hours.value(i),
                    avg_trip_minutes: durations.value(i),
                });
            }
        }
        Ok(rows)
    }

    /// Mean fare per pickup date over `[start, end)`, date ascending
    pub async fn avg_fare(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyFare>> {
        let sql = format!(
            "SELECT CAST({pickup} AS DATE) AS trip_date, AVG({total}) AS avg_fare \
             FROM {table} WHERE {filter} GROUP BY trip_date ORDER BY trip_date ASC",
            pickup = PICKUP_COL,
            total = TOTAL_AMOUNT_COL,
            table = TRIPS_TABLE,
            filter = self.interval_filter(),
        );

        let batches = self.run_interval_query(&sql, start, end).await?;
        let mut rows = Vec::new();
        for batch in &batches {
            let dates = column_as::<Date32Array>(batch, "trip_date")?;
            let fares = column_as::<Float64Array>(batch, "avg_fare")?;
            for i in 0..batch.num_rows() {
                rows.push(DailyFare {
                    trip_date: Date32Type::to_naive_date(dates.value(i)),
                    avg_fare: fares.value(i),
                });
            }
        }
        Ok(rows)
    }

    /// Mean trip duration in minutes over `[start, end)`; `None` when no
    /// trip matches the interval
    pub async fn avg_trip_duration(&self, start: NaiveDate, end: NaiveDate) -> Result<Option<f64>> {
        let sql = format!(
            "SELECT AVG({duration}) AS avg_trip_minutes FROM {table} WHERE {filter}",
            duration = DURATION_MINUTES_EXPR,
            table = TRIPS_TABLE,
            filter = self.interval_filter(),
        );

        let batches = self.run_interval_query(&sql, start, end).await?;
        for batch in &batches {
            if batch.num_rows() == 0 {
                continue;
            }
            let averages = column_as::<Float64Array>(batch, "avg_trip_minutes")?;
            if averages.is_null(0) {
                return Ok(None);
            }
            return Ok(Some(averages.value(0)));
        }
        Ok(None)
    }

    fn interval_filter(&self) -> String {
        format!(
            "{pickup} >= $1 AND {bound} < $2",
            pickup = PICKUP_COL,
            bound = self.upper_bound().column(),
        )
    }
}

fn column_as<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AnalyticsError::MissingColumn {
            name: name.to_string(),
        })?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| AnalyticsError::InvalidFormat(format!("Unexpected type for column {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TripRecord, TripRecordBuilder};
    use crate::query::view::UpperBound;
    use crate::writers::CleanedTripWriter;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn datetime(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        date(day).and_hms_opt(hour, min, 0).unwrap()
    }

    fn fixture_records() -> Vec<TripRecord> {
        vec![
            TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 10))
                .total_amount(10.0)
                .build(),
            TripRecordBuilder::new(datetime(1, 8, 30), datetime(1, 8, 50))
                .total_amount(20.0)
                .build(),
            TripRecordBuilder::new(datetime(1, 9, 0), datetime(1, 9, 30))
                .total_amount(30.0)
                .build(),
            TripRecordBuilder::new(datetime(2, 10, 0), datetime(2, 10, 15))
                .total_amount(40.0)
                .build(),
        ]
    }

    async fn view_over(records: &[TripRecord], bound: UpperBound) -> (TempDir, TripsView) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taxi_cleaned_2024-01.parquet");
        CleanedTripWriter::new()
            .write_records(records, &path)
            .unwrap();
        let view = TripsView::open_with_bound(&path, bound).await.unwrap();
        (dir, view)
    }

    #[tokio::test]
    async fn test_daily_revenue_groups_and_orders_by_date() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        let rows = view.daily_revenue(date(1), date(3)).await.unwrap();
        assert_eq!(
            rows,
            vec![
                DailyRevenue {
                    trip_date: date(1),
                    total_revenue: 60.0
                },
                DailyRevenue {
                    trip_date: date(2),
                    total_revenue: 40.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_trips_per_day_orders_by_count() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        let rows = view.trips_per_day(date(1), date(3)).await.unwrap();
        assert_eq!(
            rows,
            vec![
                DailyTripCount {
                    trip_date: date(2),
                    trip_count: 1
                },
                DailyTripCount {
                    trip_date: date(1),
                    trip_count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_trips_per_hour_means_duration() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        let rows = view.trips_per_hour(date(1), date(2)).await.unwrap();
        assert_eq!(
            rows,
            vec![
                HourlyDuration {
                    pickup_hour: 8,
                    avg_trip_minutes: 15.0
                },
                HourlyDuration {
                    pickup_hour: 9,
                    avg_trip_minutes: 30.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_avg_fare_per_date() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        let rows = view.avg_fare(date(1), date(2)).await.unwrap();
        assert_eq!(
            rows,
            vec![DailyFare {
                trip_date: date(1),
                avg_fare: 20.0
            }]
        );
    }

    #[tokio::test]
    async fn test_avg_trip_duration_scalar_and_empty() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        let average = view.avg_trip_duration(date(1), date(2)).await.unwrap();
        assert_eq!(average, Some(20.0));

        // Zero-width interval is empty, not an error and not a null row
        let empty = view.avg_trip_duration(date(1), date(1)).await.unwrap();
        assert_eq!(empty, None);
    }

    #[tokio::test]
    async fn test_zero_width_interval_is_empty_everywhere() {
        let (_dir, view) = view_over(&fixture_records(), UpperBound::default()).await;

        assert!(view.daily_revenue(date(1), date(1)).await.unwrap().is_empty());
        assert!(view.trips_per_day(date(1), date(1)).await.unwrap().is_empty());
        assert!(view.trips_per_hour(date(1), date(1)).await.unwrap().is_empty());
        assert!(view.avg_fare(date(1), date(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upper_bound_default_is_pickup() {
        // A trip picked up before midnight but dropped off after it: the
        // default pickup bound keeps it inside [Jan 1, Jan 2), the legacy
        // dropoff bound pushes it out.
        let records = vec![TripRecordBuilder::new(datetime(1, 23, 50), datetime(2, 0, 10)).build()];

        let (_dir, view) = view_over(&records, UpperBound::default()).await;
        assert_eq!(view.upper_bound(), UpperBound::Pickup);
        let rows = view.trips_per_day(date(1), date(2)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trip_count, 1);

        let (_dir2, legacy) = view_over(&records, UpperBound::Dropoff).await;
        assert!(legacy.trips_per_day(date(1), date(2)).await.unwrap().is_empty());
    }
}
