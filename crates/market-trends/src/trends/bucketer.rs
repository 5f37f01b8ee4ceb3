use super::domain::{SaleRecord, YearMonth};
use super::segment::{normalize_segment, segment_key};
use super::window::ReportingWindow;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Price pair kept per transaction once a record has been bucketed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transaction {
    pub price: f64,
    pub listed_price: f64,
}

/// Transactions of one segment, one slot per window month.
#[derive(Debug, Clone)]
pub struct SegmentTransactions {
    pub segment: String,
    pub months: Vec<Vec<Transaction>>,
}

impl SegmentTransactions {
    pub fn total_transactions(&self) -> usize {
        self.months.iter().map(Vec::len).sum()
    }
}

/// Output of [`TimeBucketer::bucket`]; segments keep first-encounter order.
#[derive(Debug, Clone)]
pub struct SegmentBuckets {
    window: ReportingWindow,
    segments: Vec<SegmentTransactions>,
    dropped_out_of_window: usize,
    dropped_excluded: usize,
}

impl SegmentBuckets {
    pub fn window(&self) -> &ReportingWindow {
        &self.window
    }

    pub fn segments(&self) -> &[SegmentTransactions] {
        &self.segments
    }

    pub fn get(&self, segment: &str, month: YearMonth) -> Option<&[Transaction]> {
        let index = self.window.position(month)?;
        let key = segment_key(segment);
        self.segments
            .iter()
            .find(|entry| segment_key(&entry.segment) == key)
            .map(|entry| entry.months[index].as_slice())
    }

    pub fn dropped_out_of_window(&self) -> usize {
        self.dropped_out_of_window
    }

    pub fn dropped_excluded(&self) -> usize {
        self.dropped_excluded
    }
}

/// Groups sale records into `(segment, month)` buckets over a reporting window.
#[derive(Debug, Clone, Default)]
pub struct TimeBucketer {
    excluded: HashSet<String>,
}

impl TimeBucketer {
    pub fn new<I, S>(excluded_segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = excluded_segments
            .into_iter()
            .map(|segment| segment_key(segment.as_ref()))
            .filter(|key| !key.is_empty())
            .collect();
        Self { excluded }
    }

    pub fn is_excluded(&self, segment: &str) -> bool {
        self.excluded.contains(&segment_key(segment))
    }

    pub fn bucket<'a, I>(&self, window: &ReportingWindow, records: I) -> SegmentBuckets
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        let mut segments: Vec<SegmentTransactions> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();
        let mut dropped_out_of_window = 0;
        let mut dropped_excluded = 0;

        for record in records {
            let key = segment_key(&record.segment);
            if self.excluded.contains(&key) {
                dropped_excluded += 1;
                continue;
            }

            let Some(position) = window.position(record.month) else {
                dropped_out_of_window += 1;
                continue;
            };

            let slot = *index_by_key.entry(key).or_insert_with(|| {
                segments.push(SegmentTransactions {
                    segment: normalize_segment(&record.segment),
                    months: vec![Vec::new(); window.len()],
                });
                segments.len() - 1
            });

            segments[slot].months[position].push(Transaction {
                price: record.price,
                listed_price: record.listed_price,
            });
        }

        if dropped_out_of_window > 0 || dropped_excluded > 0 {
            debug!(
                dropped_out_of_window,
                dropped_excluded,
                window_start = %window.first(),
                window_end = %window.last(),
                "sale records skipped while bucketing"
            );
        }

        SegmentBuckets {
            window: window.clone(),
            segments,
            dropped_out_of_window,
            dropped_excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    fn window() -> ReportingWindow {
        ReportingWindow::trailing(ym(2024, 3), 3).expect("window")
    }

    #[test]
    fn groups_records_by_segment_and_month() {
        let records = vec![
            SaleRecord::new("Condo", ym(2024, 1), 500_000.0, 510_000.0),
            SaleRecord::new("Detached", ym(2024, 1), 900_000.0, 880_000.0),
            SaleRecord::new("Condo", ym(2024, 3), 520_000.0, 520_000.0),
            SaleRecord::new("condo ", ym(2024, 3), 540_000.0, 530_000.0),
        ];

        let buckets = TimeBucketer::default().bucket(&window(), &records);

        let names: Vec<_> = buckets.segments().iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(names, vec!["Condo", "Detached"]);
        assert_eq!(buckets.get("Condo", ym(2024, 1)).map(|txs| txs.len()), Some(1));
        assert_eq!(buckets.get("Condo", ym(2024, 2)).map(|txs| txs.len()), Some(0));
        assert_eq!(buckets.get("Condo", ym(2024, 3)).map(|txs| txs.len()), Some(2));
        assert!(buckets.get("Townhouse", ym(2024, 1)).is_none());
    }

    #[test]
    fn records_outside_window_are_dropped_silently() {
        let records = vec![
            SaleRecord::new("Condo", ym(2023, 12), 400_000.0, 400_000.0),
            SaleRecord::new("Condo", ym(2024, 4), 600_000.0, 600_000.0),
            SaleRecord::new("Condo", ym(2024, 2), 500_000.0, 500_000.0),
        ];

        let buckets = TimeBucketer::default().bucket(&window(), &records);

        assert_eq!(buckets.dropped_out_of_window(), 2);
        assert_eq!(buckets.segments()[0].total_transactions(), 1);
    }

    #[test]
    fn excluded_segments_never_appear() {
        let records = vec![
            SaleRecord::new("Commercial", ym(2024, 1), 2_000_000.0, 2_100_000.0),
            SaleRecord::new("Condo", ym(2024, 1), 500_000.0, 500_000.0),
            SaleRecord::new(" land", ym(2024, 2), 150_000.0, 160_000.0),
        ];

        let bucketer = TimeBucketer::new(["Commercial", "Land"]);
        let buckets = bucketer.bucket(&window(), &records);

        assert_eq!(buckets.segments().len(), 1);
        assert_eq!(buckets.segments()[0].segment, "Condo");
        assert_eq!(buckets.dropped_excluded(), 2);
        assert!(bucketer.is_excluded("COMMERCIAL"));
    }
}
