use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_CLEANED_DIR, DEFAULT_RAW_DIR, DEFAULT_ROW_GROUP_SIZE,
    DEFAULT_WINDOW_DAYS,
};

/// Runtime settings: defaults, overlaid by an optional settings file,
/// overlaid by TAXI_-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub raw_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub compression: String,
    pub row_group_size: usize,
    pub default_window_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            cleaned_dir: PathBuf::from(DEFAULT_CLEANED_DIR),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("raw_dir", DEFAULT_RAW_DIR)?
            .set_default("cleaned_dir", DEFAULT_CLEANED_DIR)?
            .set_default("compression", COMPRESSION_SNAPPY)?
            .set_default("row_group_size", DEFAULT_ROW_GROUP_SIZE as i64)?
            .set_default("default_window_days", DEFAULT_WINDOW_DAYS as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("TAXI"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Recognized default query interval: the configured window ending
    /// after `today`, so today's trips are included. Explicit bounds from
    /// the caller always take precedence.
    pub fn default_interval(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = today + Duration::days(1);
        let start = end - Duration::days(self.default_window_days as i64);
        (start, end)
    }
}
