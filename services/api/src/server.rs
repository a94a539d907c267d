use crate::cli::ServeArgs;
use crate::infra::{build_runtime, AppState};
use crate::routes::with_sourcing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sourcing::config::AppConfig;
use sourcing::error::AppError;
use sourcing::telemetry;
use sourcing::workflows::rfq::SystemClock;
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
    };

    let runtime = build_runtime(&config.sourcing, Arc::new(SystemClock))?;
    let app = with_sourcing_routes(runtime.service, runtime.rates)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        base_currency = %config.sourcing.base_currency,
        "part sourcing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
