use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::utils::catalog::{month_range, MonthRef};
use crate::utils::progress::ProgressReporter;

/// Downloads published raw monthly trip files into the raw data directory.
/// A convenience step only; the cleaner works from local paths.
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Download one published month into `dest_dir`, replacing any existing
    /// copy of that month
    pub async fn download_month(&self, month: MonthRef, dest_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest_dir)?;
        let url = month.source_url();
        info!(month = %month, url = %url, "downloading raw trip file");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let dest = dest_dir.join(month.source_filename());
        std::fs::write(&dest, &bytes)?;
        Ok(dest)
    }

    /// Download an inclusive month range sequentially, oldest first
    pub async fn download_range(
        &self,
        start: MonthRef,
        end: MonthRef,
        dest_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<PathBuf>> {
        let months = month_range(start, end);
        let mut paths = Vec::with_capacity(months.len());

        for (index, month) in months.into_iter().enumerate() {
            paths.push(self.download_month(month, dest_dir).await?);
            if let Some(p) = progress {
                p.update((index + 1) as u64);
            }
        }

        Ok(paths)
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}
