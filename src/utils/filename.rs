use std::path::Path;

use crate::error::{AnalyticsError, Result};
use crate::utils::catalog::MonthRef;

/// Extract the year/month a raw monthly file covers from its filename
/// (e.g. yellow_tripdata_2024-01.parquet -> 2024-01)
pub fn parse_source_month(path: &Path) -> Result<MonthRef> {
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| AnalyticsError::InvalidFormat("Invalid file path".to_string()))?;

    let stem = filename.strip_suffix(".parquet").ok_or_else(|| {
        AnalyticsError::InvalidFormat(format!("Not a parquet filename: {}", filename))
    })?;

    // The published scheme ends in _YYYY-MM; anything after the last '_' is the month tag
    let month_tag = stem.rsplit('_').next().ok_or_else(|| {
        AnalyticsError::InvalidFormat(format!(
            "Filename does not carry a year-month tag: {}",
            filename
        ))
    })?;

    month_tag.parse().map_err(|_| {
        AnalyticsError::InvalidFormat(format!(
            "Could not extract year-month from filename: {}",
            filename
        ))
    })
}
