use std::fs::File;
use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;

use crate::error::{AnalyticsError, Result};
use crate::utils::constants::{DEFAULT_BATCH_SIZE, DROPPED_COLUMNS, REQUIRED_COLUMNS};

/// Reads a raw monthly trip file, projecting away the columns the cleaner
/// discards. Fails up front when the source schema is not the expected one.
pub struct RawTripReader {
    batch_size: usize,
}

impl RawTripReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn open(&self, path: &Path) -> Result<RawTripBatches> {
        let file = File::open(path)?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(self.batch_size);
        let file_schema = builder.schema().clone();

        for name in REQUIRED_COLUMNS.iter().chain(DROPPED_COLUMNS.iter()) {
            if file_schema.index_of(name).is_err() {
                return Err(AnalyticsError::MissingColumn {
                    name: name.to_string(),
                });
            }
        }

        let retained: Vec<usize> = file_schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| !DROPPED_COLUMNS.contains(&field.name().as_str()))
            .map(|(index, _)| index)
            .collect();
        let mask = ProjectionMask::roots(builder.parquet_schema(), retained);

        let reader = builder.with_projection(mask).build()?;
        let schema = reader.schema();
        Ok(RawTripBatches { reader, schema })
    }
}

impl Default for RawTripReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Record-batch iterator over one raw monthly file after column pruning.
pub struct RawTripBatches {
    reader: ParquetRecordBatchReader,
    schema: SchemaRef,
}

impl RawTripBatches {
    /// Schema of the batches this iterator yields (dropped columns excluded)
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

impl std::fmt::Debug for RawTripBatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawTripBatches")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Iterator for RawTripBatches {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader
            .next()
            .map(|batch| batch.map_err(AnalyticsError::Arrow))
    }
}
