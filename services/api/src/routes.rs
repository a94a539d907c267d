use crate::infra::{AppState, RateTable, SourcingService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sourcing::error::AppError;
use sourcing::workflows::rfq::{rfq_router, CurrencyRateSnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct RatePublishRequest {
    /// Units of base currency per unit of each listed currency.
    pub(crate) rates: BTreeMap<String, Decimal>,
}

pub(crate) fn with_sourcing_routes(
    service: Arc<SourcingService>,
    rates: Arc<RateTable>,
) -> axum::Router {
    rfq_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/currency-rates",
            axum::routing::get(current_rates_endpoint).post(publish_rates_endpoint),
        )
        .layer(Extension(rates))
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

pub(crate) async fn current_rates_endpoint(
    Extension(rates): Extension<Arc<RateTable>>,
) -> Json<CurrencyRateSnapshot> {
    Json(rates.current())
}

/// Replace the whole rate table; comparisons started afterwards see the new version.
pub(crate) async fn publish_rates_endpoint(
    Extension(rates): Extension<Arc<RateTable>>,
    Json(payload): Json<RatePublishRequest>,
) -> Result<(StatusCode, Json<CurrencyRateSnapshot>), AppError> {
    let snapshot = rates.publish(payload.rates, Utc::now())?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}
