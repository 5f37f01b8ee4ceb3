use super::aggregator::AggregatedSeries;
use serde::Serialize;

/// Default presentation threshold, in percentage points.
pub const DEFAULT_MIN_SHARE_PCT: f64 = 0.1;

/// Absorbs rounding noise so values sitting exactly on the threshold survive.
const THRESHOLD_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareEntry {
    pub name: String,
    pub total: f64,
    /// Percentage points of the surviving grand total.
    pub percent: f64,
}

/// Two-pass percentage-of-total filter for pie, legend and table surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareFilter {
    min_share_pct: f64,
}

impl Default for ShareFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SHARE_PCT)
    }
}

impl ShareFilter {
    pub fn new(min_share_pct: f64) -> Self {
        let min_share_pct = if min_share_pct.is_finite() {
            min_share_pct.max(0.0)
        } else {
            DEFAULT_MIN_SHARE_PCT
        };
        Self { min_share_pct }
    }

    pub fn min_share_pct(&self) -> f64 {
        self.min_share_pct
    }

    pub fn filter<I, S>(&self, totals: I) -> Vec<ShareEntry>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let candidates: Vec<(String, f64)> = totals
            .into_iter()
            .map(|(name, total)| (name.into(), total))
            .filter(|(_, total)| total.is_finite() && *total > 0.0)
            .collect();

        let provisional_total: f64 = candidates.iter().map(|(_, total)| total).sum();
        let threshold = self.min_share_pct / 100.0;

        let survivors: Vec<(String, f64)> = candidates
            .into_iter()
            .filter(|(_, total)| total / provisional_total + THRESHOLD_TOLERANCE >= threshold)
            .collect();

        let grand_total: f64 = survivors.iter().map(|(_, total)| total).sum();

        let mut entries: Vec<ShareEntry> = survivors
            .into_iter()
            .map(|(name, total)| ShareEntry {
                percent: total / grand_total * 100.0,
                name,
                total,
            })
            .collect();

        entries.sort_by(|a, b| b.total.total_cmp(&a.total));
        entries
    }

    /// Filters segments by their transactions summed across the whole window.
    pub fn filter_series(&self, series: &AggregatedSeries) -> Vec<ShareEntry> {
        self.filter(segment_totals(series))
    }
}

pub fn segment_totals(series: &AggregatedSeries) -> Vec<(String, f64)> {
    series
        .segments
        .iter()
        .map(|segment| (segment.segment.clone(), segment.total_transactions() as f64))
        .collect()
}
