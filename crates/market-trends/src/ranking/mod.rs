//! Multi-location ranking tables.

use crate::trends::report::views::SegmentBreakdown;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub location_name: String,
    pub metric_value: f64,
    #[serde(default)]
    pub is_self: bool,
}

impl LocationCandidate {
    pub fn new(location_name: impl Into<String>, metric_value: f64) -> Self {
        Self {
            location_name: location_name.into(),
            metric_value,
            is_self: false,
        }
    }

    pub fn own(location_name: impl Into<String>, metric_value: f64) -> Self {
        Self {
            is_self: true,
            ..Self::new(location_name, metric_value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLocation {
    /// One-based position after sorting; ties keep input order and still get distinct ranks.
    pub rank: usize,
    pub location_name: String,
    pub metric_value: f64,
    pub is_self: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("only one location may be marked as self, found {0}")]
    MultipleSelf(usize),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker;

impl Ranker {
    pub fn rank(
        &self,
        candidates: Vec<LocationCandidate>,
        direction: MetricDirection,
    ) -> Result<Vec<RankedLocation>, RankingError> {
        let self_count = candidates.iter().filter(|candidate| candidate.is_self).count();
        if self_count > 1 {
            return Err(RankingError::MultipleSelf(self_count));
        }

        let mut sorted = candidates;
        sorted.sort_by(|a, b| compare(a.metric_value, b.metric_value, direction));

        Ok(sorted
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| RankedLocation {
                rank: position + 1,
                location_name: candidate.location_name,
                metric_value: candidate.metric_value,
                is_self: candidate.is_self,
            })
            .collect())
    }
}

/// Orders by direction with non-finite values after every finite one.
fn compare(a: f64, b: f64, direction: MetricDirection) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => match direction {
            MetricDirection::HigherIsBetter => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            MetricDirection::LowerIsBetter => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        },
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Metrics a location table can be ordered by, each with its own direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    AveragePrice,
    MedianPrice,
    TransactionCount,
    #[serde(rename = "price_change_yoy")]
    PriceChangeYearOverYear,
    SaleToListRatio,
    Affordability,
}

impl RankingMetric {
    pub const fn direction(self) -> MetricDirection {
        match self {
            Self::Affordability => MetricDirection::LowerIsBetter,
            Self::AveragePrice
            | Self::MedianPrice
            | Self::TransactionCount
            | Self::PriceChangeYearOverYear
            | Self::SaleToListRatio => MetricDirection::HigherIsBetter,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AveragePrice => "Average Price",
            Self::MedianPrice => "Median Price",
            Self::TransactionCount => "Sales Volume",
            Self::PriceChangeYearOverYear => "Price Change (YoY)",
            Self::SaleToListRatio => "Sale-to-List Ratio",
            Self::Affordability => "Affordability",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::AveragePrice => "average_price",
            Self::MedianPrice => "median_price",
            Self::TransactionCount => "transaction_count",
            Self::PriceChangeYearOverYear => "price_change_yoy",
            Self::SaleToListRatio => "sale_to_list_ratio",
            Self::Affordability => "affordability",
        }
    }

    pub fn value(self, breakdown: &SegmentBreakdown) -> f64 {
        let rollup = &breakdown.rollup;
        match self {
            Self::AveragePrice | Self::Affordability => rollup.avg_price,
            Self::MedianPrice => rollup.median_price,
            Self::TransactionCount => rollup.transaction_count as f64,
            Self::PriceChangeYearOverYear => rollup.price_delta.year_over_year,
            Self::SaleToListRatio => rollup.sale_to_list_ratio,
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ranking metric '{0}'")]
pub struct ParseRankingMetricError(pub String);

impl FromStr for RankingMetric {
    type Err = ParseRankingMetricError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_lowercase().replace('-', "_");
        [
            Self::AveragePrice,
            Self::MedianPrice,
            Self::TransactionCount,
            Self::PriceChangeYearOverYear,
            Self::SaleToListRatio,
            Self::Affordability,
        ]
        .into_iter()
        .find(|metric| metric.key() == key)
        .ok_or_else(|| ParseRankingMetricError(raw.to_string()))
    }
}

/// One location's headline breakdown, as fed to a ranking table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMarket {
    pub name: String,
    pub breakdown: SegmentBreakdown,
    #[serde(default)]
    pub is_self: bool,
}

/// Ranks locations by a metric read from their period rollup.
///
/// Locations without sales in the period carry a NaN value and sort last.
pub fn rank_markets(
    markets: &[LocationMarket],
    metric: RankingMetric,
) -> Result<Vec<RankedLocation>, RankingError> {
    let candidates = markets
        .iter()
        .map(|market| LocationCandidate {
            location_name: market.name.clone(),
            metric_value: if market.breakdown.rollup.has_data() {
                metric.value(&market.breakdown)
            } else {
                f64::NAN
            },
            is_self: market.is_self,
        })
        .collect();

    Ranker.rank(candidates, metric.direction())
}
