use crate::Result;
use anyhow::{bail, Context};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Identifies the calendar month whose transactions are loaded from the server.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    // Field order matters for the derived `Ord`: years compare before months.
    year: i32,
    month: u32,
}

impl Period {
    /// Creates a `Period`, failing when `month` is not in `1..=12`.
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month {month}, expected a value from 1 to 12");
        }
        Ok(Self { year, month })
    }

    /// The period containing today's date on the local clock.
    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    /// The period that `date` falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns true if `date` falls within this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

/// Unvalidated wire form of a `Period`.
#[derive(Deserialize)]
struct RawPeriod {
    month: u32,
    year: i32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = anyhow::Error;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        Self::new(raw.month, raw.year)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    /// Parses the `YYYY-MM` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("Expected a period like 2024-02, got '{s}'"))?;
        let year = year
            .parse()
            .with_context(|| format!("Invalid year in period '{s}'"))?;
        let month = month
            .parse()
            .with_context(|| format!("Invalid month in period '{s}'"))?;
        Self::new(month, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_months() {
        assert!(Period::new(0, 2024).is_err());
        assert!(Period::new(13, 2024).is_err());
        assert!(Period::new(12, 2024).is_ok());
    }

    #[test]
    fn test_display_and_parse() {
        let period = Period::new(2, 2024).unwrap();
        assert_eq!(period.to_string(), "2024-02");
        assert_eq!(Period::from_str("2024-02").unwrap(), period);
        assert!(Period::from_str("2024").is_err());
        assert!(Period::from_str("2024-14").is_err());
    }

    #[test]
    fn test_contains() {
        let period = Period::new(3, 2024).unwrap();
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Period = serde_json::from_str(r#"{"month": 2, "year": 2024}"#).unwrap();
        assert_eq!(ok, Period::new(2, 2024).unwrap());
        assert!(serde_json::from_str::<Period>(r#"{"month": 13, "year": 2024}"#).is_err());
    }

    #[test]
    fn test_ordering() {
        let a = Period::new(12, 2023).unwrap();
        let b = Period::new(1, 2024).unwrap();
        assert!(a < b);
    }
}
