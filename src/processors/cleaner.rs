use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array};
use arrow::compute::kernels::cmp::{gt, gt_eq};
use arrow::compute::{and, cast, filter_record_batch, is_not_null, prep_null_mask_filter};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AnalyticsError, Result};
use crate::readers::RawTripReader;
use crate::utils::constants::{
    DISTANCE_COL, DROPOFF_COL, PICKUP_COL, SURCHARGE_COL, TOTAL_AMOUNT_COL,
};
use crate::utils::filename::parse_source_month;
use crate::writers::CleanedTripWriter;

/// Cleans one raw monthly trip file into a cleaned partition: prunes the
/// unused columns, drops rows violating the dataset invariants, and
/// normalizes both timestamp columns.
pub struct TripCleaner {
    reader: RawTripReader,
    writer: CleanedTripWriter,
}

impl TripCleaner {
    pub fn new() -> Self {
        Self {
            reader: RawTripReader::new(),
            writer: CleanedTripWriter::new(),
        }
    }

    pub fn with_compression(self, compression: &str) -> Result<Self> {
        Ok(Self {
            reader: self.reader,
            writer: self.writer.with_compression(compression)?,
        })
    }

    pub fn with_row_group_size(self, size: usize) -> Self {
        Self {
            reader: self.reader,
            writer: self.writer.with_row_group_size(size),
        }
    }

    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self {
            reader: self.reader.with_batch_size(batch_size),
            writer: self.writer,
        }
    }

    /// Clean `source` into `<output_dir>/taxi_cleaned_YYYY-MM.parquet`,
    /// replacing that month's partition if present
    pub fn clean_file(&self, source: &Path, output_dir: &Path) -> Result<CleaningReport> {
        let month = parse_source_month(source)?;
        info!(month = %month, source = %source.display(), "cleaning monthly trip file");

        let batches = self.reader.open(source)?;
        let cleaned_schema = cleaned_schema_from(&batches.schema());

        std::fs::create_dir_all(output_dir)?;
        let output = output_dir.join(month.cleaned_filename());
        let mut writer = self.writer.begin(&output, cleaned_schema.clone())?;
        let mut report = CleaningReport::new(source, &output);

        for batch in batches {
            let cleaned = self.clean_batch(&batch?, &cleaned_schema, &mut report)?;
            if cleaned.num_rows() > 0 {
                writer.write(&cleaned)?;
            }
        }
        writer.close()?;

        info!(
            month = %month,
            rows_read = report.rows_read,
            rows_written = report.rows_written,
            "finished cleaning"
        );
        Ok(report)
    }

    fn clean_batch(
        &self,
        batch: &RecordBatch,
        cleaned_schema: &SchemaRef,
        report: &mut CleaningReport,
    ) -> Result<RecordBatch> {
        let timestamp_type = DataType::Timestamp(TimeUnit::Microsecond, None);
        let pickup = cast(named_column(batch, PICKUP_COL)?, &timestamp_type)?;
        let dropoff = cast(named_column(batch, DROPOFF_COL)?, &timestamp_type)?;

        let distance = cast(named_column(batch, DISTANCE_COL)?, &DataType::Float64)?;
        let total = cast(named_column(batch, TOTAL_AMOUNT_COL)?, &DataType::Float64)?;
        let surcharge = cast(named_column(batch, SURCHARGE_COL)?, &DataType::Float64)?;

        let zero = Float64Array::new_scalar(0.0);
        let distance_ok = gt(&distance, &zero)?;
        let total_ok = gt(&total, &zero)?;
        let surcharge_ok = gt_eq(&surcharge, &zero)?;
        // A timestamp that failed to parse is null after the safe cast
        let timestamps_ok = and(&is_not_null(&pickup)?, &is_not_null(&dropoff)?)?;

        report.rows_read += batch.num_rows();
        report.dropped_distance += failing(&distance_ok);
        report.dropped_amount += failing(&total_ok);
        report.dropped_surcharge += failing(&surcharge_ok);
        report.dropped_timestamp += failing(&timestamps_ok);

        let numeric_ok = and(&and(&distance_ok, &total_ok)?, &surcharge_ok)?;
        let keep = prep_null_mask_filter(&and(&numeric_ok, &timestamps_ok)?);

        let schema = batch.schema();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
        for (index, field) in schema.fields().iter().enumerate() {
            let column = match field.name().as_str() {
                name if name == PICKUP_COL => pickup.clone(),
                name if name == DROPOFF_COL => dropoff.clone(),
                _ => batch.column(index).clone(),
            };
            columns.push(column);
        }

        let staged = RecordBatch::try_new(cleaned_schema.clone(), columns)?;
        let filtered = filter_record_batch(&staged, &keep)?;
        report.rows_written += filtered.num_rows();
        debug!(
            rows_in = batch.num_rows(),
            rows_out = filtered.num_rows(),
            "cleaned batch"
        );
        Ok(filtered)
    }
}

impl Default for TripCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Source schema with both timestamp columns normalized to microseconds
fn cleaned_schema_from(schema: &SchemaRef) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            if field.name() == PICKUP_COL || field.name() == DROPOFF_COL {
                Field::new(
                    field.name(),
                    DataType::Timestamp(TimeUnit::Microsecond, None),
                    true,
                )
            } else {
                field.as_ref().clone()
            }
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn named_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AnalyticsError::MissingColumn {
            name: name.to_string(),
        })
}

/// Rows a predicate rejects, counting nulls as rejections
fn failing(mask: &BooleanArray) -> usize {
    mask.len() - prep_null_mask_filter(mask).true_count()
}

/// Outcome of one cleaning run. Per-predicate counts can overlap when a row
/// violates more than one invariant.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rows_read: usize,
    pub rows_written: usize,
    pub dropped_distance: usize,
    pub dropped_amount: usize,
    pub dropped_surcharge: usize,
    pub dropped_timestamp: usize,
}

impl CleaningReport {
    fn new(source: &Path, output: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            rows_read: 0,
            rows_written: 0,
            dropped_distance: 0,
            dropped_amount: 0,
            dropped_surcharge: 0,
            dropped_timestamp: 0,
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_written
    }

    pub fn summary(&self) -> String {
        format!(
            "Cleaned {} -> {}\n\
            - Rows read: {}\n\
            - Rows written: {}\n\
            - Dropped (non-positive distance): {}\n\
            - Dropped (non-positive total amount): {}\n\
            - Dropped (negative congestion surcharge): {}\n\
            - Dropped (unparsable timestamp): {}",
            self.source.display(),
            self.output.display(),
            self.rows_read,
            self.rows_written,
            self.dropped_distance,
            self.dropped_amount,
            self.dropped_surcharge,
            self.dropped_timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::arrow::ArrowWriter;
    use std::fs::File;
    use tempfile::TempDir;

    fn write_raw_fixture(path: &Path) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("tpep_pickup_datetime", DataType::Utf8, true),
            Field::new("tpep_dropoff_datetime", DataType::Utf8, true),
            Field::new("trip_distance", DataType::Float64, true),
            Field::new("total_amount", DataType::Float64, true),
            Field::new("congestion_surcharge", DataType::Float64, true),
            Field::new("extra", DataType::Float64, true),
            Field::new("store_and_fwd_flag", DataType::Utf8, true),
            Field::new("RatecodeID", DataType::Int64, true),
            Field::new("PULocationID", DataType::Int64, true),
        ]));

        let pickups = StringArray::from(vec![
            "2024-01-01 08:00:00", // valid
            "2024-01-01 09:00:00", // zero distance
            "2024-01-01 10:00:00", // negative total
            "2024-01-01 11:00:00", // negative surcharge
            "definitely not a timestamp",
        ]);
        let dropoffs = StringArray::from(vec![
            "2024-01-01 08:12:00",
            "2024-01-01 09:10:00",
            "2024-01-01 10:10:00",
            "2024-01-01 11:10:00",
            "2024-01-01 12:10:00",
        ]);
        let distances = Float64Array::from(vec![1.4, 0.0, 2.0, 3.0, 4.0]);
        let totals = Float64Array::from(vec![16.0, 12.0, -5.0, 20.0, 25.0]);
        let surcharges = Float64Array::from(vec![2.5, 2.5, 2.5, -1.0, 0.0]);
        let extras = Float64Array::from(vec![0.5; 5]);
        let flags = StringArray::from(vec!["N"; 5]);
        let ratecodes = Int64Array::from(vec![1; 5]);
        let pu_locations = Int64Array::from(vec![161; 5]);

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(pickups),
                Arc::new(dropoffs),
                Arc::new(distances),
                Arc::new(totals),
                Arc::new(surcharges),
                Arc::new(extras),
                Arc::new(flags),
                Arc::new(ratecodes),
                Arc::new(pu_locations),
            ],
        )
        .unwrap();

        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_clean_file_filters_and_normalizes() {
        let raw_dir = TempDir::new().unwrap();
        let cleaned_dir = TempDir::new().unwrap();
        let source = raw_dir.path().join("yellow_tripdata_2024-01.parquet");
        write_raw_fixture(&source);

        let report = TripCleaner::new()
            .clean_file(&source, cleaned_dir.path())
            .unwrap();

        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.rows_dropped(), 4);
        assert_eq!(report.dropped_distance, 1);
        assert_eq!(report.dropped_amount, 1);
        assert_eq!(report.dropped_surcharge, 1);
        assert_eq!(report.dropped_timestamp, 1);

        let output = cleaned_dir.path().join("taxi_cleaned_2024-01.parquet");
        assert!(output.exists());

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&output).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 1);

        let schema = batches[0].schema();
        assert!(schema.index_of("extra").is_err());
        assert!(schema.index_of("PULocationID").is_err());
        assert_eq!(
            schema
                .field_with_name("tpep_pickup_datetime")
                .unwrap()
                .data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, None)
        );
    }

    #[test]
    fn test_clean_file_requires_month_tagged_filename() {
        let raw_dir = TempDir::new().unwrap();
        let cleaned_dir = TempDir::new().unwrap();
        let source = raw_dir.path().join("trips.parquet");
        write_raw_fixture(&source);

        let result = TripCleaner::new().clean_file(&source, cleaned_dir.path());
        assert!(matches!(result, Err(AnalyticsError::InvalidFormat(_))));
    }
}
