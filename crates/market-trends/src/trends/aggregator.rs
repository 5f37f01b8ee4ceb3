use super::bucketer::{SegmentBuckets, Transaction};
use super::domain::{ratio_or_zero, DeltaPair, MetricBucket, YearMonth, ALL_TYPES};
use super::window::ReportingWindow;
use serde::Serialize;

/// Offset, in window positions, of the year-over-year comparison bucket.
pub(crate) const YEAR_OVER_YEAR_OFFSET: usize = 12;

/// Monthly buckets of one segment, aligned with the reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSeries {
    pub segment: String,
    pub buckets: Vec<MetricBucket>,
}

impl SegmentSeries {
    pub fn total_transactions(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.transaction_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub window: ReportingWindow,
    pub segments: Vec<SegmentSeries>,
    pub rollup: Vec<MetricBucket>,
}

impl AggregatedSeries {
    pub fn segment(&self, name: &str) -> Option<&SegmentSeries> {
        self.segments.iter().find(|series| series.segment == name)
    }

    /// Returns a copy with every bucket after `last_complete` flagged as pro-rated.
    ///
    /// `None` flags the whole window.
    pub fn with_pro_ration(self, last_complete: Option<usize>) -> Self {
        let flag = |index: usize| last_complete.map_or(true, |last| index > last);
        let mark = |buckets: Vec<MetricBucket>| -> Vec<MetricBucket> {
            buckets
                .into_iter()
                .enumerate()
                .map(|(index, bucket)| MetricBucket {
                    pro_rated: flag(index),
                    ..bucket
                })
                .collect()
        };

        Self {
            window: self.window,
            segments: self
                .segments
                .into_iter()
                .map(|series| SegmentSeries {
                    segment: series.segment,
                    buckets: mark(series.buckets),
                })
                .collect(),
            rollup: mark(self.rollup),
        }
    }
}

/// Computes bucket statistics, deltas and the transaction-weighted rollup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn aggregate(&self, buckets: &SegmentBuckets) -> AggregatedSeries {
        let window = buckets.window();

        let segments: Vec<SegmentSeries> = buckets
            .segments()
            .iter()
            .map(|entry| {
                let stats = window
                    .months()
                    .iter()
                    .zip(&entry.months)
                    .map(|(month, transactions)| {
                        bucket_stats(&entry.segment, *month, transactions.iter())
                    })
                    .collect();
                SegmentSeries {
                    segment: entry.segment.clone(),
                    buckets: with_deltas(stats),
                }
            })
            .collect();

        let rollup = window
            .months()
            .iter()
            .enumerate()
            .map(|(index, month)| rollup_bucket(*month, index, buckets, &segments))
            .collect();

        AggregatedSeries {
            window: window.clone(),
            segments,
            rollup,
        }
    }
}

fn bucket_stats<'a, I>(segment: &str, month: YearMonth, transactions: I) -> MetricBucket
where
    I: Iterator<Item = &'a Transaction>,
{
    let (prices, listed_total) =
        transactions.fold((Vec::new(), 0.0), |(mut prices, listed), transaction| {
            prices.push(transaction.price);
            (prices, listed + transaction.listed_price)
        });

    let count = prices.len();
    let price_total: f64 = prices.iter().sum();

    MetricBucket {
        transaction_count: count as u64,
        avg_price: ratio_or_zero(price_total, count as f64),
        median_price: median(prices),
        sale_to_list_ratio: ratio_or_zero(price_total, listed_total),
        ..MetricBucket::empty(segment, month)
    }
}

/// Standard median; even-length inputs average the two middle values.
pub(crate) fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// `(current - previous) / previous`, or 0 when there is nothing to compare against.
pub(crate) fn relative_change(current: f64, previous: Option<f64>) -> f64 {
    match previous {
        Some(previous) if previous != 0.0 => ratio_or_zero(current - previous, previous),
        _ => 0.0,
    }
}

fn with_deltas(stats: Vec<MetricBucket>) -> Vec<MetricBucket> {
    let comparison = |index: usize, offset: usize| index.checked_sub(offset).map(|i| &stats[i]);

    stats
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            let previous = comparison(index, 1);
            let year_ago = comparison(index, YEAR_OVER_YEAR_OFFSET);

            let price_delta = if bucket.has_data() {
                DeltaPair {
                    month_over_month: relative_change(bucket.avg_price, comparable_price(previous)),
                    year_over_year: relative_change(bucket.avg_price, comparable_price(year_ago)),
                }
            } else {
                DeltaPair::default()
            };

            let volume_delta = DeltaPair {
                month_over_month: relative_change(
                    bucket.transaction_count as f64,
                    previous.map(|b| b.transaction_count as f64),
                ),
                year_over_year: relative_change(
                    bucket.transaction_count as f64,
                    year_ago.map(|b| b.transaction_count as f64),
                ),
            };

            MetricBucket {
                price_delta,
                volume_delta,
                ..bucket.clone()
            }
        })
        .collect()
}

fn comparable_price(bucket: Option<&MetricBucket>) -> Option<f64> {
    bucket.filter(|b| b.has_data()).map(|b| b.avg_price)
}

fn rollup_bucket(
    month: YearMonth,
    index: usize,
    buckets: &SegmentBuckets,
    segments: &[SegmentSeries],
) -> MetricBucket {
    let current: Vec<&MetricBucket> = segments
        .iter()
        .map(|series| &series.buckets[index])
        .collect();
    let transaction_count: u64 = current.iter().map(|bucket| bucket.transaction_count).sum();

    if transaction_count == 0 {
        return MetricBucket::empty(ALL_TYPES, month);
    }

    let pooled = buckets
        .segments()
        .iter()
        .flat_map(|entry| entry.months[index].iter());
    let pooled = bucket_stats(ALL_TYPES, month, pooled);

    MetricBucket {
        transaction_count,
        avg_price: weighted_mean(&current, |b| b.avg_price),
        median_price: pooled.median_price,
        sale_to_list_ratio: pooled.sale_to_list_ratio,
        price_delta: DeltaPair {
            month_over_month: weighted_mean(&current, |b| b.price_delta.month_over_month),
            year_over_year: weighted_mean(&current, |b| b.price_delta.year_over_year),
        },
        volume_delta: DeltaPair {
            month_over_month: weighted_mean(&current, |b| b.volume_delta.month_over_month),
            year_over_year: weighted_mean(&current, |b| b.volume_delta.year_over_year),
        },
        ..MetricBucket::empty(ALL_TYPES, month)
    }
}

/// Mean of `value` across buckets, weighted by each bucket's transaction count.
fn weighted_mean(buckets: &[&MetricBucket], value: impl Fn(&MetricBucket) -> f64) -> f64 {
    let (sum, weight) = buckets.iter().fold((0.0, 0.0), |(sum, weight), bucket| {
        let count = bucket.transaction_count as f64;
        (sum + value(*bucket) * count, weight + count)
    });
    ratio_or_zero(sum, weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::bucketer::TimeBucketer;
    use crate::trends::domain::SaleRecord;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    fn aggregate(window: &ReportingWindow, records: &[SaleRecord]) -> AggregatedSeries {
        let buckets = TimeBucketer::default().bucket(window, records);
        Aggregator.aggregate(&buckets)
    }

    fn repeat(segment: &str, month: YearMonth, price: f64, count: usize) -> Vec<SaleRecord> {
        (0..count)
            .map(|_| SaleRecord::new(segment, month, price, price))
            .collect()
    }

    #[test]
    fn median_handles_odd_and_even_counts() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(Vec::new()), 0.0);
    }

    #[test]
    fn empty_previous_month_reports_zero_change() {
        let window = ReportingWindow::trailing(ym(2024, 3), 3).expect("window");
        let mut records = repeat("Condo", ym(2024, 1), 500_000.0, 10);
        records.extend(repeat("Condo", ym(2024, 3), 520_000.0, 5));

        let series = aggregate(&window, &records);
        let condo = series.segment("Condo").expect("condo series");

        let counts: Vec<u64> = condo.buckets.iter().map(|b| b.transaction_count).collect();
        assert_eq!(counts, vec![10, 0, 5]);

        let march = &condo.buckets[2];
        assert_eq!(march.avg_price, 520_000.0);
        assert_eq!(march.price_delta.month_over_month, 0.0);
        assert_eq!(march.volume_delta.month_over_month, 0.0);

        let february = &condo.buckets[1];
        assert_eq!(february.avg_price, 0.0);
        assert_eq!(february.price_delta.month_over_month, 0.0);
        assert_eq!(february.volume_delta.month_over_month, -1.0);
    }

    #[test]
    fn year_over_year_compares_twelve_months_back() {
        let window = ReportingWindow::trailing(ym(2024, 1), 13).expect("window");
        let mut records = repeat("Detached", ym(2023, 1), 800_000.0, 4);
        records.extend(repeat("Detached", ym(2024, 1), 880_000.0, 6));

        let series = aggregate(&window, &records);
        let latest = series.segments[0].buckets.last().expect("latest bucket");

        assert!((latest.price_delta.year_over_year - 0.10).abs() < 1e-12);
        assert!((latest.volume_delta.year_over_year - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rollup_is_transaction_weighted() {
        let window = ReportingWindow::trailing(ym(2024, 2), 2).expect("window");
        let mut records = repeat("Condo", ym(2024, 1), 400_000.0, 1);
        records.extend(repeat("Detached", ym(2024, 1), 1_000_000.0, 1));
        records.extend(repeat("Condo", ym(2024, 2), 600_000.0, 9));
        records.extend(repeat("Detached", ym(2024, 2), 500_000.0, 1));

        let series = aggregate(&window, &records);
        let february = &series.rollup[1];

        assert_eq!(february.segment, ALL_TYPES);
        assert_eq!(february.transaction_count, 10);
        assert!((february.avg_price - 590_000.0).abs() < 1e-6);
        // Condo +50% weighted by 9, Detached -50% weighted by 1.
        assert!((february.price_delta.month_over_month - 0.4).abs() < 1e-12);
        assert_eq!(february.median_price, 600_000.0);
    }

    #[test]
    fn rollup_count_matches_segment_sum_every_month() {
        let window = ReportingWindow::trailing(ym(2024, 4), 4).expect("window");
        let mut records = repeat("Condo", ym(2024, 1), 450_000.0, 3);
        records.extend(repeat("Townhouse", ym(2024, 2), 650_000.0, 2));
        records.extend(repeat("Detached", ym(2024, 4), 950_000.0, 7));
        records.extend(repeat("Condo", ym(2024, 4), 470_000.0, 1));

        let series = aggregate(&window, &records);

        for (index, rollup) in series.rollup.iter().enumerate() {
            let sum: u64 = series
                .segments
                .iter()
                .map(|s| s.buckets[index].transaction_count)
                .sum();
            assert_eq!(rollup.transaction_count, sum);
        }
    }

    #[test]
    fn empty_month_rollup_is_zeroed() {
        let window = ReportingWindow::trailing(ym(2024, 2), 2).expect("window");
        let records = repeat("Condo", ym(2024, 1), 450_000.0, 3);

        let series = aggregate(&window, &records);
        let february = &series.rollup[1];

        assert_eq!(february.transaction_count, 0);
        assert_eq!(february.avg_price, 0.0);
        assert_eq!(february.price_delta, DeltaPair::default());
        assert!(series.rollup.iter().all(|b| b.avg_price.is_finite()));
    }

    #[test]
    fn pro_ration_flags_trailing_buckets() {
        let window = ReportingWindow::trailing(ym(2024, 3), 3).expect("window");
        let records = repeat("Condo", ym(2024, 3), 450_000.0, 1);

        let series = aggregate(&window, &records).with_pro_ration(Some(1));

        let flags: Vec<bool> = series.rollup.iter().map(|b| b.pro_rated).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert!(series.segments[0].buckets[2].pro_rated);
    }
}
