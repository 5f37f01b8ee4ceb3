use crate::infra::{deserialize_optional_date, AppState, InMemoryMarketSource};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use market_trends::error::AppError;
use market_trends::ranking::{
    rank_markets, LocationMarket, MetricDirection, RankedLocation, RankingMetric,
};
use market_trends::sources::{MarketOverview, SourceCombiner};
use market_trends::trends::report::views::{MarketInsights, TrendReportSummary};
use market_trends::trends::{
    ReportingWindow, SaleRecord, SaleRecordImporter, TrendEngine, YearMonth,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;

#[derive(Debug, Deserialize)]
pub(crate) struct TrendReportRequest {
    #[serde(default)]
    pub(crate) records: Vec<SaleRecord>,
    /// Sales export in CSV form; takes precedence over `records`.
    #[serde(default)]
    pub(crate) csv: Option<String>,
    #[serde(default)]
    pub(crate) end: Option<YearMonth>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrendReportResponse {
    pub(crate) today: NaiveDate,
    pub(crate) data_source: TrendDataSource,
    pub(crate) skipped_records: usize,
    pub(crate) summary: TrendReportSummary,
    pub(crate) insights: MarketInsights,
    pub(crate) overview: MarketOverview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TrendDataSource {
    Csv,
    Records,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationRecords {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) is_self: bool,
    #[serde(default)]
    pub(crate) records: Vec<SaleRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RankingRequest {
    pub(crate) metric: RankingMetric,
    pub(crate) locations: Vec<LocationRecords>,
    #[serde(default)]
    pub(crate) end: Option<YearMonth>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RankingResponse {
    pub(crate) metric: RankingMetric,
    pub(crate) metric_label: &'static str,
    pub(crate) direction: MetricDirection,
    pub(crate) rankings: Vec<RankedLocation>,
}

pub(crate) fn trend_routes() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/trends/report",
            axum::routing::post(trend_report_endpoint),
        )
        .route(
            "/api/v1/trends/rankings",
            axum::routing::post(rankings_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn reporting_window(
    engine: &TrendEngine,
    end: Option<YearMonth>,
    today: NaiveDate,
) -> Result<ReportingWindow, AppError> {
    let window = match end {
        Some(end) => engine.window_ending(end)?,
        None => engine.window_for(today)?,
    };
    Ok(window)
}

pub(crate) async fn trend_report_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<TrendReportRequest>,
) -> Result<Json<TrendReportResponse>, AppError> {
    let TrendReportRequest {
        records,
        csv,
        end,
        today,
    } = payload;

    let (records, data_source, rejected_rows) = match csv {
        Some(csv) => {
            let import = SaleRecordImporter::from_reader(Cursor::new(csv.into_bytes()))?;
            let records = import.records().cloned().collect();
            (records, TrendDataSource::Csv, import.skipped_rows)
        }
        None => (records, TrendDataSource::Records, 0),
    };

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let window = reporting_window(&state.engine, end, today)?;
    let source = InMemoryMarketSource::new(state.engine.build(&window, &records, today));

    let overview = SourceCombiner
        .combine(source.breakdown(), source.trend())
        .await?;
    let report = source.report();

    Ok(Json(TrendReportResponse {
        today,
        data_source,
        skipped_records: report.skipped_records + rejected_rows,
        summary: report.summary(),
        insights: report.insights(),
        overview,
    }))
}

pub(crate) async fn rankings_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RankingRequest>,
) -> Result<Json<RankingResponse>, AppError> {
    let RankingRequest {
        metric,
        locations,
        end,
        today,
    } = payload;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let window = reporting_window(&state.engine, end, today)?;

    let markets: Vec<LocationMarket> = locations
        .into_iter()
        .map(|location| LocationMarket {
            breakdown: state
                .engine
                .build(&window, &location.records, today)
                .breakdown(),
            name: location.name,
            is_self: location.is_self,
        })
        .collect();

    Ok(Json(RankingResponse {
        metric,
        metric_label: metric.label(),
        direction: metric.direction(),
        rankings: rank_markets(&markets, metric)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use market_trends::config::TrendsConfig;
    use market_trends::sources::SourceStatus;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(window_months: usize) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            engine: Arc::new(TrendEngine::new(TrendsConfig {
                window_months,
                ..TrendsConfig::default()
            })),
        }
    }

    fn today() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, 15)
    }

    fn sale(segment: &str, month: u32, price: f64) -> SaleRecord {
        SaleRecord::new(
            segment,
            YearMonth::new(2024, month).expect("valid month"),
            price,
            price,
        )
    }

    #[tokio::test]
    async fn trend_report_endpoint_combines_sources() {
        let request = TrendReportRequest {
            records: vec![
                sale("Condo", 1, 400_000.0),
                sale("Condo", 2, 420_000.0),
                sale("Detached", 2, 900_000.0),
                sale("Commercial", 2, 2_000_000.0),
            ],
            csv: None,
            end: None,
            today: today(),
        };

        let Json(body) = trend_report_endpoint(Extension(state(3)), Json(request))
            .await
            .expect("report builds");

        assert_eq!(body.data_source, TrendDataSource::Records);
        assert_eq!(body.skipped_records, 1);
        assert_eq!(body.overview.breakdown.period, YearMonth::new(2024, 2).unwrap());
        assert_eq!(body.overview.trend, SourceStatus::Available);
        assert_eq!(body.overview.volume_series.len(), 3);
        assert_eq!(body.summary.segments.len(), 2);
    }

    #[tokio::test]
    async fn trend_report_endpoint_degrades_without_trend() {
        let request = TrendReportRequest {
            records: vec![sale("Condo", 3, 400_000.0)],
            csv: None,
            end: None,
            today: today(),
        };

        let Json(body) = trend_report_endpoint(Extension(state(1)), Json(request))
            .await
            .expect("breakdown alone is served");

        assert!(body.overview.volume_series.is_empty());
        assert!(!body.overview.trend.is_available());
        assert!(body.overview.breakdown.pro_rated);
    }

    #[tokio::test]
    async fn trend_report_endpoint_reads_csv() {
        let request = TrendReportRequest {
            records: Vec::new(),
            csv: Some(
                "Property Type,Sold Date,Sold Price,List Price\n\
Condo,2024-02-03,$500000,$510000\n\
Condo,not-a-date,$500000,$510000\n"
                    .to_string(),
            ),
            end: Some(YearMonth::new(2024, 3).unwrap()),
            today: today(),
        };

        let Json(body) = trend_report_endpoint(Extension(state(3)), Json(request))
            .await
            .expect("report builds");

        assert_eq!(body.data_source, TrendDataSource::Csv);
        assert_eq!(body.skipped_records, 1);
        assert_eq!(body.overview.rollup().transaction_count, 1);
    }

    #[tokio::test]
    async fn rankings_endpoint_orders_locations_by_metric() {
        let request = RankingRequest {
            metric: RankingMetric::AveragePrice,
            locations: vec![
                LocationRecords {
                    name: "Surrey".to_string(),
                    is_self: true,
                    records: vec![sale("Condo", 2, 450_000.0)],
                },
                LocationRecords {
                    name: "Richmond".to_string(),
                    is_self: false,
                    records: vec![sale("Condo", 2, 720_000.0)],
                },
                LocationRecords {
                    name: "Hope".to_string(),
                    is_self: false,
                    records: Vec::new(),
                },
            ],
            end: None,
            today: today(),
        };

        let Json(body) = rankings_endpoint(Extension(state(3)), Json(request))
            .await
            .expect("rankings build");

        let names: Vec<_> = body
            .rankings
            .iter()
            .map(|entry| entry.location_name.as_str())
            .collect();
        assert_eq!(names, vec!["Richmond", "Surrey", "Hope"]);
        assert!(body.rankings[1].is_self);
        assert_eq!(body.direction, MetricDirection::HigherIsBetter);
    }

    #[tokio::test]
    async fn rankings_endpoint_rejects_two_self_locations() {
        let own = |name: &str| LocationRecords {
            name: name.to_string(),
            is_self: true,
            records: Vec::new(),
        };
        let request = RankingRequest {
            metric: RankingMetric::TransactionCount,
            locations: vec![own("A"), own("B")],
            end: None,
            today: today(),
        };

        let err = rankings_endpoint(Extension(state(3)), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn router_serves_health_and_readiness() {
        let app = trend_routes().layer(Extension(state(13)));

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("health responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("ready responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_rejects_unknown_metric() {
        let app = trend_routes().layer(Extension(state(13)));
        let request = Request::post("/api/v1/trends/rankings")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"metric":"rent","locations":[]}"#))
            .unwrap();

        let response = app.oneshot(request).await.expect("responds");
        assert!(response.status().is_client_error());
    }
}
