use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::trend_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use market_trends::config::AppConfig;
use market_trends::error::AppError;
use market_trends::telemetry;
use market_trends::trends::TrendEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::new(TrendEngine::new(config.trends.clone())),
    };

    let app = trend_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        window_months = config.trends.window_months,
        min_share_pct = config.trends.min_share_pct,
        "market trends service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
