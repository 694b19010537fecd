use std::fmt;
use serde::{Deserialize, Serialize};
use crate::domain::error::IngestionError;

pub const QUARTER_END_MONTHS: [u8; 4] = [3, 6, 9, 12];

/// June 2015, the first period published under the `call-report-data-yyyy-mm.zip` layout.
pub const MODERN_LAYOUT_START: Quarter = Quarter { year: 2015, month: 6 };

/// One fiscal-quarter-end reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: u16,
    month: u8,
}

impl Quarter {
    pub fn new(year: u16, month: u8) -> Result<Self, IngestionError> {
        if !QUARTER_END_MONTHS.contains(&month) {
            return Err(IngestionError::InvalidQuarter(format!(
                "month {} is not a quarter-end month (expected one of 03, 06, 09, 12)",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Parses the `yyyy-mm` form used on the command line.
    pub fn parse(value: &str) -> Result<Self, IngestionError> {
        let invalid = || {
            IngestionError::InvalidQuarter(format!(
                "'{}' must be formatted as yyyy-mm, e.g. 2020-09",
                value
            ))
        };

        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(year) || !all_digits(month) || year.len() > 4 || month.len() > 2 {
            return Err(invalid());
        }

        let year = year.parse::<u16>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn yyyy(&self) -> String {
        format!("{:04}", self.year)
    }

    pub fn mm(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            let year = self.year.checked_add(1)?;
            Some(Self { year, month: 3 })
        } else {
            Some(Self { year: self.year, month: self.month + 3 })
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.yyyy(), self.mm())
    }
}

impl TryFrom<String> for Quarter {
    type Error = IngestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Quarter::parse(&value)
    }
}

impl From<Quarter> for String {
    fn from(quarter: Quarter) -> Self {
        quarter.to_string()
    }
}

/// Result of fetching a quarter's archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveDownload {
    Found(Vec<u8>),
    Unavailable { status: u16 },
}

/// Non-error outcome of one ingestion call. Hard failures come back as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuarterOutcome {
    Skipped { url: String, status: u16 },
    Uploaded { keys: Vec<String> },
}

impl QuarterOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, QuarterOutcome::Uploaded { .. })
    }
}
