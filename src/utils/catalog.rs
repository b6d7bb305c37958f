use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::utils::constants::{CLEANED_FILE_PREFIX, SOURCE_FILE_PREFIX, TRIP_DATA_BASE_URL};

/// One month of the published trip dataset, e.g. 2024-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AnalyticsError::InvalidFormat(format!(
                "Month {} is outside 1-12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Filename the dataset is published under, e.g. yellow_tripdata_2024-01.parquet
    pub fn source_filename(&self) -> String {
        format!("{}{}.parquet", SOURCE_FILE_PREFIX, self)
    }

    pub fn source_url(&self) -> String {
        format!("{}/{}", TRIP_DATA_BASE_URL, self.source_filename())
    }

    /// Partition filename a cleaning run writes for this month
    pub fn cleaned_filename(&self) -> String {
        format!("{}{}.parquet", CLEANED_FILE_PREFIX, self)
    }

    fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthRef {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || AnalyticsError::InvalidFormat(format!("Expected YYYY-MM month reference, got '{}'", s));

        let (year_part, month_part) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        MonthRef::new(year, month)
    }
}

/// Inclusive range of published months, oldest first.
pub fn month_range(start: MonthRef, end: MonthRef) -> Vec<MonthRef> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = current.next();
    }
    months
}
