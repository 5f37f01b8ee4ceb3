use super::domain::YearMonth;
use super::window::ReportingWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reporting-lag policy deciding which trailing bucket is still pro-rated.
///
/// Without a cutover the newest bucket is always treated as incomplete. Once
/// `now` reaches the configured cutover month the last complete bucket is
/// pinned: to `pinned_index` when one is given, otherwise to the month two
/// months before the cutover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProRationPolicy {
    pub cutover: Option<YearMonth>,
    #[serde(default)]
    pub pinned_index: Option<usize>,
}

/// Months between the last complete bucket and the cutover month.
const CUTOVER_LAG_MONTHS: u32 = 2;

impl ProRationPolicy {
    pub const fn trailing() -> Self {
        Self {
            cutover: None,
            pinned_index: None,
        }
    }

    /// Cutover that pins the month two months before it as last complete.
    pub const fn from_cutover(cutover: YearMonth) -> Self {
        Self {
            cutover: Some(cutover),
            pinned_index: None,
        }
    }

    pub const fn with_cutover(cutover: YearMonth, pinned_index: usize) -> Self {
        Self {
            cutover: Some(cutover),
            pinned_index: Some(pinned_index),
        }
    }

    /// Index of the last complete bucket, or `None` when no bucket is complete.
    pub fn last_complete_index(&self, window: &ReportingWindow, now: NaiveDate) -> Option<usize> {
        let len = window.len();
        if len < 2 {
            return None;
        }

        match self.cutover {
            Some(cutover) if YearMonth::from_date(now) >= cutover => {
                self.pinned_position(cutover, window)
            }
            _ => Some(len - 2),
        }
    }

    fn pinned_position(&self, cutover: YearMonth, window: &ReportingWindow) -> Option<usize> {
        let last = window.len() - 1;
        if let Some(index) = self.pinned_index {
            return Some(index.min(last));
        }

        let month = cutover.minus_months(CUTOVER_LAG_MONTHS);
        if month < window.first() {
            return None;
        }
        Some(window.position(month).unwrap_or(last))
    }

    pub fn is_pro_rated(&self, window: &ReportingWindow, now: NaiveDate, index: usize) -> bool {
        self.last_complete_index(window, now)
            .map_or(true, |last| index > last)
    }
}
