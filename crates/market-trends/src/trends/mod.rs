//! Monthly market statistics per property segment: bucketing, aggregation,
//! pro-ration, share filtering and color assignment.

pub mod aggregator;
pub mod bucketer;
pub mod domain;
pub mod import;
pub mod palette;
pub mod proration;
pub mod report;
mod segment;
pub mod share;
pub mod window;

pub use aggregator::{AggregatedSeries, Aggregator, SegmentSeries};
pub use bucketer::{SegmentBuckets, TimeBucketer};
pub use domain::{DeltaPair, MetricBucket, SaleRecord, YearMonth, ALL_TYPES};
pub use import::{ImportError, SaleImport, SaleRecordImporter};
pub use palette::{ColorCycler, ColoredShare, Palette, PaletteError};
pub use proration::ProRationPolicy;
pub use report::{TrendEngine, TrendReport};
pub use share::{ShareEntry, ShareFilter};
pub use window::{ReportingWindow, WindowError};
