use super::super::domain::{DeltaPair, MetricBucket, YearMonth};
use super::super::palette::ColoredShare;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketView {
    pub month: YearMonth,
    pub month_label: String,
    pub transaction_count: u64,
    pub avg_price: f64,
    pub median_price: f64,
    pub sale_to_list_ratio: f64,
    pub price_change: DeltaPair,
    pub volume_change: DeltaPair,
    pub pro_rated: bool,
    pub status_label: &'static str,
}

impl From<&MetricBucket> for BucketView {
    fn from(bucket: &MetricBucket) -> Self {
        Self {
            month: bucket.month,
            month_label: bucket.month.label(),
            transaction_count: bucket.transaction_count,
            avg_price: bucket.avg_price,
            median_price: bucket.median_price,
            sale_to_list_ratio: bucket.sale_to_list_ratio,
            price_change: bucket.price_delta,
            volume_change: bucket.volume_delta,
            pro_rated: bucket.pro_rated,
            status_label: if bucket.pro_rated { "Pro-rated" } else { "Final" },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSeriesView {
    pub segment: String,
    pub color: String,
    pub share_percent: f64,
    pub total_transactions: f64,
    pub buckets: Vec<BucketView>,
}

/// Presentation payload shared by the chart, legend and table surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReportSummary {
    pub window_start: YearMonth,
    pub window_end: YearMonth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_complete_month: Option<YearMonth>,
    pub rollup: Vec<BucketView>,
    pub segments: Vec<SegmentSeriesView>,
    pub shares: Vec<ColoredShare>,
}

/// Current-period card for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    #[serde(flatten)]
    pub bucket: MetricBucket,
    pub color: String,
    pub share_percent: f64,
}

/// Per-segment statistics for the reporting period (the primary source payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
    pub period: YearMonth,
    pub pro_rated: bool,
    pub rollup: MetricBucket,
    pub segments: Vec<SegmentSnapshot>,
}

impl SegmentBreakdown {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && !self.rollup.has_data()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub month: YearMonth,
    pub transaction_count: u64,
    pub avg_price: f64,
    pub pro_rated: bool,
}

/// Monthly volume series across all included segments (the trend source payload).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub points: Vec<VolumePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDirection {
    Rising,
    Stable,
    Falling,
    InsufficientData,
}

impl MarketDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "Rising",
            Self::Stable => "Stable",
            Self::Falling => "Falling",
            Self::InsufficientData => "Insufficient Data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsights {
    pub period: YearMonth,
    pub direction: MarketDirection,
    pub direction_label: &'static str,
    pub price_change_yoy_pct: f64,
    pub volume_change_yoy_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest_growing_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_rated_notice: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
}
