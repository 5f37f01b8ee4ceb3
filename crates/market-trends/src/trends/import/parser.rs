use super::super::domain::{SaleRecord, YearMonth};
use super::super::segment::normalize_segment;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct ParsedRows {
    pub(crate) sales: Vec<(Option<String>, SaleRecord)>,
    pub(crate) skipped: usize,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<ParsedRows, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut sales = Vec::new();
    let mut skipped = 0;

    for row in csv_reader.deserialize::<SaleRow>() {
        let row = row?;
        match row.to_record() {
            Some(record) => {
                let location = row
                    .location
                    .as_deref()
                    .map(normalize_segment)
                    .filter(|location| !location.is_empty());
                sales.push((location, record));
            }
            None => skipped += 1,
        }
    }

    Ok(ParsedRows { sales, skipped })
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    #[serde(rename = "Property Type")]
    property_type: String,
    #[serde(
        rename = "Sold Date",
        alias = "Month",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    sold: Option<String>,
    #[serde(
        rename = "Sold Price",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    sold_price: Option<String>,
    #[serde(
        rename = "List Price",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    list_price: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
}

impl SaleRow {
    fn to_record(&self) -> Option<SaleRecord> {
        let segment = normalize_segment(&self.property_type);
        if segment.is_empty() {
            return None;
        }
        let month = self.sold.as_deref().and_then(parse_month)?;
        let price = self.sold_price.as_deref().and_then(parse_amount)?;
        let listed_price = self
            .list_price
            .as_deref()
            .and_then(parse_amount)
            .unwrap_or(0.0);

        Some(SaleRecord::new(segment, month, price, listed_price))
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts `YYYY-MM`, `YYYY-MM-DD` and RFC 3339 timestamps.
pub(crate) fn parse_month(value: &str) -> Option<YearMonth> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(YearMonth::from_date(dt.naive_utc().date()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(YearMonth::from_date(date));
    }

    trimmed.parse().ok()
}

/// Parses a currency amount such as `$1,250,000`; negatives and non-finite values are rejected.
pub(crate) fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}
