use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Label used for the synthetic transaction-weighted rollup row.
pub const ALL_TYPES: &str = "All Types";

/// A calendar month, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    /// Short display label such as `Mar 2024`.
    pub fn label(self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|date| date.format("%b %Y").to_string())
            .unwrap_or_else(|| self.to_string())
    }

    pub fn previous(self) -> Self {
        self.minus_months(1)
    }

    pub fn next(self) -> Self {
        let ordinal = self.ordinal() + 1;
        Self::from_ordinal(ordinal)
    }

    pub fn minus_months(self, months: u32) -> Self {
        Self::from_ordinal(self.ordinal() - i64::from(months))
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        let year = ordinal.div_euclid(12);
        let month = ordinal.rem_euclid(12) + 1;
        Self {
            year: year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            month: month as u32,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a YYYY-MM month")]
pub struct ParseYearMonthError(pub String);

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || ParseYearMonthError(raw.to_string());
        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One closed sale as delivered by upstream ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub segment: String,
    pub month: YearMonth,
    pub price: f64,
    pub listed_price: f64,
}

impl SaleRecord {
    pub fn new(
        segment: impl Into<String>,
        month: YearMonth,
        price: f64,
        listed_price: f64,
    ) -> Self {
        Self {
            segment: segment.into(),
            month,
            price,
            listed_price,
        }
    }
}

/// Relative change against the previous month and the same month a year earlier.
///
/// Values are fractions: `0.05` means +5%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaPair {
    pub month_over_month: f64,
    pub year_over_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBucket {
    pub segment: String,
    pub month: YearMonth,
    pub transaction_count: u64,
    pub avg_price: f64,
    pub median_price: f64,
    pub sale_to_list_ratio: f64,
    pub price_delta: DeltaPair,
    pub volume_delta: DeltaPair,
    pub pro_rated: bool,
}

impl MetricBucket {
    pub fn empty(segment: impl Into<String>, month: YearMonth) -> Self {
        Self {
            segment: segment.into(),
            month,
            transaction_count: 0,
            avg_price: 0.0,
            median_price: 0.0,
            sale_to_list_ratio: 0.0,
            price_delta: DeltaPair::default(),
            volume_delta: DeltaPair::default(),
            pro_rated: false,
        }
    }

    pub fn is_rollup(&self) -> bool {
        self.segment == ALL_TYPES
    }

    pub fn has_data(&self) -> bool {
        self.transaction_count > 0
    }
}

/// Divides, resolving a zero or non-finite outcome to `0.0`.
pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_parses_and_formats() {
        let month: YearMonth = "2024-03".parse().expect("valid month");
        assert_eq!(month, YearMonth::new(2024, 3).unwrap());
        assert_eq!(month.to_string(), "2024-03");
        assert_eq!(month.label(), "Mar 2024");
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
        assert!("24-03".parse::<YearMonth>().is_err());
    }

    #[test]
    fn month_arithmetic_crosses_year_boundaries() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth::new(2023, 12).unwrap());
        assert_eq!(jan.minus_months(12), YearMonth::new(2023, 1).unwrap());
        assert_eq!(YearMonth::new(2023, 12).unwrap().next(), jan);
    }

    #[test]
    fn year_month_serializes_as_label() {
        let month = YearMonth::new(2025, 7).unwrap();
        let json = serde_json::to_string(&month).expect("serialize");
        assert_eq!(json, "\"2025-07\"");
        let back: YearMonth = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, month);
    }

    #[test]
    fn ratio_never_produces_nan() {
        assert_eq!(ratio_or_zero(10.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(0.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(5.0, 2.0), 2.5);
    }
}
