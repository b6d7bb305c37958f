use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::{AnalyticsError, Result};
use crate::processors::{CleaningReport, TripCleaner};
use crate::utils::filename::parse_source_month;
use crate::utils::progress::ProgressReporter;

/// Batch driver over a directory of raw monthly files. Each month lands in
/// its own cleaned partition, so a full-catalog run never overwrites earlier
/// months.
pub struct BatchCleaner {
    max_workers: usize,
    cleaner: TripCleaner,
}

impl BatchCleaner {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            cleaner: TripCleaner::new(),
        }
    }

    pub fn with_compression(self, compression: &str) -> Result<Self> {
        Ok(Self {
            max_workers: self.max_workers,
            cleaner: self.cleaner.with_compression(compression)?,
        })
    }

    pub fn with_row_group_size(self, size: usize) -> Self {
        Self {
            max_workers: self.max_workers,
            cleaner: self.cleaner.with_row_group_size(size),
        }
    }

    /// Raw monthly files under `input_dir`, oldest month first
    pub fn discover_sources(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in std::fs::read_dir(input_dir)? {
            let path = entry?.path();
            let is_parquet = path.extension().and_then(|e| e.to_str()) == Some("parquet");
            if is_parquet && parse_source_month(&path).is_ok() {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Clean every discovered month into `output_dir`. A single failing
    /// month fails the whole run.
    pub fn clean_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<CleaningReport>> {
        let sources = self.discover_sources(input_dir)?;
        if sources.is_empty() {
            return Err(AnalyticsError::InvalidFormat(format!(
                "No monthly trip files found in {}",
                input_dir.display()
            )));
        }

        let processed = AtomicUsize::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| AnalyticsError::Config(e.to_string()))?;

        let mut reports: Vec<CleaningReport> = pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let report = self.cleaner.clean_file(source, output_dir);

                    let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    report
                })
                .collect::<Result<Vec<_>>>()
        })?;

        reports.sort_by(|a, b| a.source.cmp(&b.source));

        if let Some(p) = progress {
            p.finish_with_message(&format!("Cleaned {} monthly files", reports.len()));
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_sources_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "yellow_tripdata_2024-02.parquet",
            "yellow_tripdata_2024-01.parquet",
            "notes.txt",
            "other.parquet",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let sources = BatchCleaner::new(2).discover_sources(dir.path()).unwrap();
        let names: Vec<String> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "yellow_tripdata_2024-01.parquet",
                "yellow_tripdata_2024-02.parquet"
            ]
        );
    }

    #[test]
    fn test_clean_directory_rejects_empty_input() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let result = BatchCleaner::new(1).clean_directory(input.path(), output.path(), None);
        assert!(matches!(result, Err(AnalyticsError::InvalidFormat(_))));
    }
}
