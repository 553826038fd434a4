//! Calendar month used for archive addressing and catalog versions

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Validated `(year, month)` pair, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> chs_common::Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(chs_common::Error::InvalidInput(format!(
                "Month out of range: {}",
                month
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(chs_common::Error::InvalidInput(format!(
                "Year out of range: {}",
                year
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Catalog version label, e.g. `v2024-01`
    pub fn version_label(&self) -> String {
        format!("v{}", self)
    }

    /// Zero-padded month for archive URLs
    pub fn month_padded(&self) -> String {
        format!("{:02}", self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = chs_common::Error;

    /// Accepts `YYYY-MM` and `vYYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || chs_common::Error::InvalidInput(format!("Invalid year-month: {:?}", s));
        let text = s.trim();
        let text = text.strip_prefix('v').unwrap_or(text);

        let (year, month) = text.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
