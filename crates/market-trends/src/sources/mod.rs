//! Combines the per-segment breakdown with the monthly volume trend.
//!
//! The breakdown is required. A failed trend degrades the overview to the
//! breakdown alone.

use crate::trends::domain::MetricBucket;
use crate::trends::report::views::{SegmentBreakdown, SegmentSnapshot, TrendSeries, VolumePoint};
use serde::Serialize;
use std::future::Future;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("{source_name} is unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("{source_name} returned malformed data: {reason}")]
    Malformed { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombineError {
    #[error("primary market data source failed: {0}")]
    PrimarySource(#[source] SourceError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Available,
    Unavailable { reason: String },
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub breakdown: SegmentBreakdown,
    pub volume_series: Vec<VolumePoint>,
    pub trend: SourceStatus,
}

impl MarketOverview {
    /// `false` when the sources succeeded but recorded no sales for the period.
    pub fn has_data(&self) -> bool {
        !self.breakdown.is_empty()
    }

    pub fn rollup(&self) -> &MetricBucket {
        &self.breakdown.rollup
    }

    pub fn segments(&self) -> &[SegmentSnapshot] {
        &self.breakdown.segments
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCombiner;

impl SourceCombiner {
    /// Awaits both sources concurrently and merges them.
    pub async fn combine<B, T>(
        &self,
        breakdown: B,
        trend: T,
    ) -> Result<MarketOverview, CombineError>
    where
        B: Future<Output = Result<SegmentBreakdown, SourceError>>,
        T: Future<Output = Result<TrendSeries, SourceError>>,
    {
        let (breakdown, trend) = tokio::join!(breakdown, trend);
        let breakdown = breakdown.map_err(CombineError::PrimarySource)?;

        let (volume_series, trend) = match trend {
            Ok(series) => (series.points, SourceStatus::Available),
            Err(err) => {
                warn!(
                    error = %err,
                    period = %breakdown.period,
                    "trend source failed; serving breakdown only"
                );
                (
                    Vec::new(),
                    SourceStatus::Unavailable {
                        reason: err.to_string(),
                    },
                )
            }
        };

        Ok(MarketOverview {
            breakdown,
            volume_series,
            trend,
        })
    }
}
