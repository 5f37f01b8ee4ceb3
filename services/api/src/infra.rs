use chrono::NaiveDate;
use market_trends::sources::SourceError;
use market_trends::trends::report::views::{SegmentBreakdown, TrendSeries};
use market_trends::trends::{TrendEngine, TrendReport, YearMonth};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<TrendEngine>,
}

/// Serves both market data feeds from one assembled report.
#[derive(Debug, Clone)]
pub(crate) struct InMemoryMarketSource {
    report: Arc<TrendReport>,
}

impl InMemoryMarketSource {
    pub(crate) fn new(report: TrendReport) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    pub(crate) fn report(&self) -> &TrendReport {
        &self.report
    }

    pub(crate) async fn breakdown(&self) -> Result<SegmentBreakdown, SourceError> {
        Ok(self.report.breakdown())
    }

    /// The trend feed needs at least two months to draw a line.
    pub(crate) async fn trend(&self) -> Result<TrendSeries, SourceError> {
        if self.report.window().len() < 2 {
            return Err(SourceError::unavailable(
                "volume trend",
                "reporting window is shorter than two months",
            ));
        }
        Ok(self.report.volume_series())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_month(raw: &str) -> Result<YearMonth, String> {
    raw.parse::<YearMonth>().map_err(|err| err.to_string())
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
