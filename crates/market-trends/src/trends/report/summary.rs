use super::super::aggregator::{AggregatedSeries, Aggregator, YEAR_OVER_YEAR_OFFSET};
use super::super::bucketer::TimeBucketer;
use super::super::domain::{MetricBucket, SaleRecord, YearMonth, ALL_TYPES};
use super::super::palette::{ColorCycler, ColoredShare};
use super::super::share::ShareFilter;
use super::super::window::{ReportingWindow, WindowError};
use super::views::{
    BucketView, MarketInsights, SegmentBreakdown, SegmentSeriesView, SegmentSnapshot,
    TrendReportSummary, TrendSeries, VolumePoint,
};
use crate::config::TrendsConfig;
use chrono::NaiveDate;
use tracing::info;

/// Runs bucketing, aggregation, pro-ration and share filtering in one pass.
#[derive(Debug, Clone)]
pub struct TrendEngine {
    config: TrendsConfig,
    bucketer: TimeBucketer,
    aggregator: Aggregator,
    share_filter: ShareFilter,
}

impl TrendEngine {
    pub fn new(config: TrendsConfig) -> Self {
        Self {
            bucketer: TimeBucketer::new(&config.excluded_segments),
            aggregator: Aggregator,
            share_filter: ShareFilter::new(config.min_share_pct),
            config,
        }
    }

    pub fn config(&self) -> &TrendsConfig {
        &self.config
    }

    /// Trailing window of the configured length ending at `end`.
    pub fn window_ending(&self, end: YearMonth) -> Result<ReportingWindow, WindowError> {
        ReportingWindow::trailing(end, self.config.window_months)
    }

    /// Trailing window ending at the calendar month containing `now`.
    pub fn window_for(&self, now: NaiveDate) -> Result<ReportingWindow, WindowError> {
        self.window_ending(YearMonth::from_date(now))
    }

    pub fn build<'a, I>(&self, window: &ReportingWindow, records: I, now: NaiveDate) -> TrendReport
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        let buckets = self.bucketer.bucket(window, records);
        let last_complete_index = self.config.proration.last_complete_index(window, now);
        let series = self
            .aggregator
            .aggregate(&buckets)
            .with_pro_ration(last_complete_index);

        let shares = self.share_filter.filter_series(&series);
        let shares = ColorCycler::new(&self.config.palette).assign(&shares);

        info!(
            window_start = %window.first(),
            window_end = %window.last(),
            segments = series.segments.len(),
            visible_segments = shares.len(),
            last_complete = ?last_complete_index.map(|index| window.months()[index]),
            "trend report assembled"
        );

        TrendReport {
            series,
            last_complete_index,
            shares,
            skipped_records: buckets.dropped_out_of_window() + buckets.dropped_excluded(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub series: AggregatedSeries,
    pub last_complete_index: Option<usize>,
    /// Visible segments, largest first, with their palette slot.
    pub shares: Vec<ColoredShare>,
    pub skipped_records: usize,
}

impl TrendReport {
    pub fn window(&self) -> &ReportingWindow {
        &self.series.window
    }

    pub fn last_complete_month(&self) -> Option<YearMonth> {
        self.last_complete_index
            .map(|index| self.series.window.months()[index])
    }

    pub fn has_data(&self) -> bool {
        self.series.rollup.iter().any(MetricBucket::has_data)
    }

    /// Index of the headline period: the last complete bucket, else the newest one.
    fn period_index(&self) -> usize {
        self.last_complete_index
            .unwrap_or_else(|| self.series.window.len().saturating_sub(1))
    }

    /// Per-segment cards for the headline period, restricted to visible segments.
    pub fn breakdown(&self) -> SegmentBreakdown {
        let index = self.period_index();
        let period = self.series.window.months()[index];
        let rollup = self
            .series
            .rollup
            .get(index)
            .cloned()
            .unwrap_or_else(|| MetricBucket::empty(ALL_TYPES, period));

        let segments = self
            .shares
            .iter()
            .filter_map(|colored| {
                let series = self.series.segment(&colored.share.name)?;
                let bucket = series.buckets.get(index)?.clone();
                Some(SegmentSnapshot {
                    bucket,
                    color: colored.slot.color.clone(),
                    share_percent: colored.share.percent,
                })
            })
            .collect();

        SegmentBreakdown {
            period,
            pro_rated: rollup.pro_rated,
            rollup,
            segments,
        }
    }

    /// Monthly totals across all included segments.
    pub fn volume_series(&self) -> TrendSeries {
        TrendSeries {
            points: self
                .series
                .rollup
                .iter()
                .map(|bucket| VolumePoint {
                    month: bucket.month,
                    transaction_count: bucket.transaction_count,
                    avg_price: bucket.avg_price,
                    pro_rated: bucket.pro_rated,
                })
                .collect(),
        }
    }

    pub fn summary(&self) -> TrendReportSummary {
        let segments = self
            .shares
            .iter()
            .filter_map(|colored| {
                self.series
                    .segment(&colored.share.name)
                    .map(|series| SegmentSeriesView {
                        segment: series.segment.clone(),
                        color: colored.slot.color.clone(),
                        share_percent: colored.share.percent,
                        total_transactions: colored.share.total,
                        buckets: series.buckets.iter().map(BucketView::from).collect(),
                    })
            })
            .collect();

        TrendReportSummary {
            window_start: self.series.window.first(),
            window_end: self.series.window.last(),
            last_complete_month: self.last_complete_month(),
            rollup: self.series.rollup.iter().map(BucketView::from).collect(),
            segments,
            shares: self.shares.clone(),
        }
    }

    pub fn insights(&self) -> MarketInsights {
        let year_over_year_available = self.period_index() >= YEAR_OVER_YEAR_OFFSET;
        super::generate_insights(&self.breakdown(), year_over_year_available)
    }
}
