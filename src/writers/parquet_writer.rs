use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::temporal_conversions::timestamp_us_to_datetime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use validator::Validate;

use crate::error::{AnalyticsError, Result};
use crate::models::TripRecord;
use crate::utils::constants::{
    DEFAULT_ROW_GROUP_SIZE, DISTANCE_COL, DROPOFF_COL, PICKUP_COL, SURCHARGE_COL, TOTAL_AMOUNT_COL,
};

pub struct CleanedTripWriter {
    compression: Compression,
    row_group_size: usize,
}

impl CleanedTripWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(AnalyticsError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Open a parquet writer at `path` for batches of the given schema,
    /// replacing any existing file there
    pub fn begin(&self, path: &Path, schema: SchemaRef) -> Result<ArrowWriter<File>> {
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();
        Ok(ArrowWriter::try_new(file, schema, Some(props))?)
    }

    /// Write typed trip records to a cleaned parquet file. Every record is
    /// checked against the cleaned-dataset invariants first.
    pub fn write_records(&self, records: &[TripRecord], path: &Path) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            record.validate()?;
        }

        let schema = Self::cleaned_schema();
        let batch = Self::records_to_batch(records, schema.clone())?;

        let mut writer = self.begin(path, schema)?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }

    /// Arrow schema of a cleaned partition built from typed records
    pub fn cleaned_schema() -> SchemaRef {
        let fields = vec![
            Field::new("VendorID", DataType::Int32, false),
            Field::new(
                PICKUP_COL,
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new(
                DROPOFF_COL,
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("passenger_count", DataType::Int64, true),
            Field::new(DISTANCE_COL, DataType::Float64, false),
            Field::new("DOLocationID", DataType::Int32, true),
            Field::new("payment_type", DataType::Int64, true),
            Field::new("fare_amount", DataType::Float64, false),
            Field::new("mta_tax", DataType::Float64, false),
            Field::new("tip_amount", DataType::Float64, false),
            Field::new("tolls_amount", DataType::Float64, false),
            Field::new("improvement_surcharge", DataType::Float64, false),
            Field::new(TOTAL_AMOUNT_COL, DataType::Float64, false),
            Field::new(SURCHARGE_COL, DataType::Float64, false),
            Field::new("airport_fee", DataType::Float64, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(records: &[TripRecord], schema: SchemaRef) -> Result<RecordBatch> {
        let vendor_ids: Vec<i32> = records.iter().map(|r| r.vendor_id).collect();
        let pickups: Vec<i64> = records
            .iter()
            .map(|r| r.tpep_pickup_datetime.and_utc().timestamp_micros())
            .collect();
        let dropoffs: Vec<i64> = records
            .iter()
            .map(|r| r.tpep_dropoff_datetime.and_utc().timestamp_micros())
            .collect();
        let passenger_counts: Vec<Option<i64>> = records.iter().map(|r| r.passenger_count).collect();
        let distances: Vec<f64> = records.iter().map(|r| r.trip_distance).collect();
        let do_locations: Vec<Option<i32>> = records.iter().map(|r| r.do_location_id).collect();
        let payment_types: Vec<Option<i64>> = records.iter().map(|r| r.payment_type).collect();
        let fares: Vec<f64> = records.iter().map(|r| r.fare_amount).collect();
        let mta_taxes: Vec<f64> = records.iter().map(|r| r.mta_tax).collect();
        let tips: Vec<f64> = records.iter().map(|r| r.tip_amount).collect();
        let tolls: Vec<f64> = records.iter().map(|r| r.tolls_amount).collect();
        let improvements: Vec<f64> = records.iter().map(|r| r.improvement_surcharge).collect();
        let totals: Vec<f64> = records.iter().map(|r| r.total_amount).collect();
        let surcharges: Vec<f64> = records.iter().map(|r| r.congestion_surcharge).collect();
        let airport_fees: Vec<Option<f64>> = records.iter().map(|r| r.airport_fee).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vendor_ids)),
            Arc::new(TimestampMicrosecondArray::from(pickups)),
            Arc::new(TimestampMicrosecondArray::from(dropoffs)),
            Arc::new(Int64Array::from(passenger_counts)),
            Arc::new(Float64Array::from(distances)),
            Arc::new(Int32Array::from(do_locations)),
            Arc::new(Int64Array::from(payment_types)),
            Arc::new(Float64Array::from(fares)),
            Arc::new(Float64Array::from(mta_taxes)),
            Arc::new(Float64Array::from(tips)),
            Arc::new(Float64Array::from(tolls)),
            Arc::new(Float64Array::from(improvements)),
            Arc::new(Float64Array::from(totals)),
            Arc::new(Float64Array::from(surcharges)),
            Arc::new(Float64Array::from(airport_fees)),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read up to `limit` records back from a cleaned parquet file
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<TripRecord>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let pickups = column_as::<TimestampMicrosecondArray>(&batch, PICKUP_COL)?;
            let dropoffs = column_as::<TimestampMicrosecondArray>(&batch, DROPOFF_COL)?;
            let distances = column_as::<Float64Array>(&batch, DISTANCE_COL)?;
            let totals = column_as::<Float64Array>(&batch, TOTAL_AMOUNT_COL)?;
            let surcharges = column_as::<Float64Array>(&batch, SURCHARGE_COL)?;

            // Columns outside the minimum schema vary between source years;
            // absent ones fall back to defaults
            let vendor_ids = optional_column::<Int32Array>(&batch, "VendorID");
            let passenger_counts = optional_column::<Int64Array>(&batch, "passenger_count");
            let do_locations = optional_column::<Int32Array>(&batch, "DOLocationID");
            let payment_types = optional_column::<Int64Array>(&batch, "payment_type");
            let fares = optional_column::<Float64Array>(&batch, "fare_amount");
            let mta_taxes = optional_column::<Float64Array>(&batch, "mta_tax");
            let tips = optional_column::<Float64Array>(&batch, "tip_amount");
            let tolls = optional_column::<Float64Array>(&batch, "tolls_amount");
            let improvements = optional_column::<Float64Array>(&batch, "improvement_surcharge");
            let airport_fees = optional_column::<Float64Array>(&batch, "airport_fee");

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let pickup = timestamp_us_to_datetime(pickups.value(i)).ok_or_else(|| {
                    AnalyticsError::InvalidFormat("Invalid pickup timestamp".to_string())
                })?;
                let dropoff = timestamp_us_to_datetime(dropoffs.value(i)).ok_or_else(|| {
                    AnalyticsError::InvalidFormat("Invalid dropoff timestamp".to_string())
                })?;

                records.push(TripRecord {
                    vendor_id: primitive_or(vendor_ids, i, 0),
                    tpep_pickup_datetime: pickup,
                    tpep_dropoff_datetime: dropoff,
                    passenger_count: primitive_opt(passenger_counts, i),
                    trip_distance: distances.value(i),
                    do_location_id: primitive_opt(do_locations, i),
                    payment_type: primitive_opt(payment_types, i),
                    fare_amount: primitive_or(fares, i, 0.0),
                    mta_tax: primitive_or(mta_taxes, i, 0.0),
                    tip_amount: primitive_or(tips, i, 0.0),
                    tolls_amount: primitive_or(tolls, i, 0.0),
                    improvement_surcharge: primitive_or(improvements, i, 0.0),
                    total_amount: totals.value(i),
                    congestion_surcharge: surcharges.value(i),
                    airport_fee: primitive_opt(airport_fees, i),
                });
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let total_rows = metadata.file_metadata().num_rows();
        let row_groups = metadata.num_row_groups();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for CleanedTripWriter {
    fn default() -> Self {
        Self::new()
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

fn optional_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Option<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<T>())
}

fn primitive_or<T>(array: Option<&arrow::array::PrimitiveArray<T>>, i: usize, default: T::Native) -> T::Native
where
    T: arrow::datatypes::ArrowPrimitiveType,
{
    primitive_opt(array, i).unwrap_or(default)
}

fn primitive_opt<T>(array: Option<&arrow::array::PrimitiveArray<T>>, i: usize) -> Option<T::Native>
where
    T: arrow::datatypes::ArrowPrimitiveType,
{
    use arrow::array::Array;

    array.and_then(|a| if a.is_null(i) { None } else { Some(a.value(i)) })
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripRecordBuilder;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn sample_record() -> TripRecord {
        let pickup = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let dropoff = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        TripRecordBuilder::new(pickup, dropoff).build()
    }

    #[test]
    fn test_write_empty_records() {
        let writer = CleanedTripWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        assert!(writer.write_records(&[], temp_file.path()).is_ok());
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let writer = CleanedTripWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let record = sample_record();
        writer.write_records(&[record.clone()], temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 1);

        let read_back = writer.read_sample_records(temp_file.path(), 10)?;
        assert_eq!(read_back, vec![record]);

        Ok(())
    }

    #[test]
    fn test_write_rejects_invalid_record() {
        let writer = CleanedTripWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let pickup = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let invalid = TripRecordBuilder::new(pickup, pickup).trip_distance(0.0).build();

        let result = writer.write_records(&[invalid], temp_file.path());
        assert!(matches!(result, Err(AnalyticsError::Validation(_))));
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = CleanedTripWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();

            writer.write_records(&[sample_record()], temp_file.path())?;
            assert!(temp_file.path().metadata()?.len() > 0);
        }

        assert!(CleanedTripWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
