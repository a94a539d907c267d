use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    OrderId, QuoteRequestDraft, QuoteRequestId, QuoteResponseId, QuoteSubmission, SupplierId,
};
use super::methods;
use super::orders::OrderStatusUpdate;
use super::repository::{QuoteStore, RepositoryError};
use super::service::{QuoteServiceError, QuoteWorkflowService};

const PUBLIC_ACCESS_DENIED: &str = "access link is invalid or has expired";

/// Router exposing buyer endpoints and the public supplier form.
pub fn rfq_router<S>(service: Arc<QuoteWorkflowService<S>>) -> Router
where
    S: QuoteStore + 'static,
{
    Router::new()
        .route("/api/v1/rfqs", post(create_handler::<S>))
        .route("/api/v1/rfqs/:request_id", get(overview_handler::<S>))
        .route(
            "/api/v1/rfqs/:request_id/dispatch",
            post(dispatch_handler::<S>),
        )
        .route("/api/v1/rfqs/:request_id/cancel", post(cancel_handler::<S>))
        .route(
            "/api/v1/rfqs/:request_id/comparison",
            get(comparison_handler::<S>),
        )
        .route(
            "/api/v1/rfqs/:request_id/approve",
            post(approve_handler::<S>),
        )
        .route(
            "/api/v1/public/rfqs/:request_id/suppliers/:supplier_id",
            get(public_form_handler::<S>).post(public_submit_handler::<S>),
        )
        .route("/api/v1/orders/:order_id", get(order_handler::<S>))
        .route(
            "/api/v1/orders/:order_id/status",
            post(order_status_handler::<S>),
        )
        .route(
            "/api/v1/suppliers/:supplier_id/performance",
            get(performance_handler::<S>),
        )
        .route("/api/v1/manufacturing-methods", get(methods_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DispatchBody {
    #[serde(default)]
    pub supplier_ids: Option<Vec<SupplierId>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveBody {
    pub response_id: QuoteResponseId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Supplier form post; the token travels in the body, never in a header.
#[derive(Debug, Deserialize)]
pub(crate) struct PublicSubmission {
    pub token: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub delivery_date: NaiveDate,
    pub payment_terms_days: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    axum::Json(draft): axum::Json<QuoteRequestDraft>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.create_request(draft) {
        Ok(overview) => (StatusCode::CREATED, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn overview_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.request_overview(&QuoteRequestId(request_id)) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dispatch_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<DispatchBody>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.dispatch_invitations(&QuoteRequestId(request_id), body.supplier_ids) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.cancel(&QuoteRequestId(request_id)) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn comparison_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.compare(&QuoteRequestId(request_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<ApproveBody>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.approve(&QuoteRequestId(request_id), &body.response_id) {
        Ok(order) => (StatusCode::CREATED, axum::Json(order)).into_response(),
        Err(QuoteServiceError::AlreadyApproved(order)) => {
            let payload = json!({
                "error": "request already approved",
                "order": order,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn public_form_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path((request_id, supplier_id)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> Response
where
    S: QuoteStore + 'static,
{
    let token = query.token.unwrap_or_default();
    match service.public_form(
        &QuoteRequestId(request_id),
        &SupplierId(supplier_id),
        &token,
    ) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(error) => public_error_response(error),
    }
}

pub(crate) async fn public_submit_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path((request_id, supplier_id)): Path<(String, String)>,
    axum::Json(body): axum::Json<PublicSubmission>,
) -> Response
where
    S: QuoteStore + 'static,
{
    let submission = QuoteSubmission {
        unit_price: body.unit_price,
        currency: body.currency,
        delivery_date: body.delivery_date,
        payment_terms_days: body.payment_terms_days,
        notes: body.notes,
    };
    match service.submit_response(
        &QuoteRequestId(request_id),
        &SupplierId(supplier_id),
        &body.token,
        submission,
    ) {
        Ok(response) => (StatusCode::CREATED, axum::Json(response)).into_response(),
        Err(error) => public_error_response(error),
    }
}

pub(crate) async fn order_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(order_id): Path<String>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.order(&OrderId(order_id)) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn order_status_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(order_id): Path<String>,
    axum::Json(update): axum::Json<OrderStatusUpdate>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.update_order_status(&OrderId(order_id), update) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn performance_handler<S>(
    State(service): State<Arc<QuoteWorkflowService<S>>>,
    Path(supplier_id): Path<String>,
) -> Response
where
    S: QuoteStore + 'static,
{
    match service.supplier_performance(&SupplierId(supplier_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn methods_handler() -> Response {
    (StatusCode::OK, axum::Json(methods::catalog())).into_response()
}

/// Suppliers learn nothing about why a link was refused.
fn public_error_response(error: QuoteServiceError) -> Response {
    match error {
        QuoteServiceError::InvalidToken
        | QuoteServiceError::Expired
        | QuoteServiceError::InvalidParticipant
        | QuoteServiceError::NotFound(_) => {
            let payload = json!({
                "error": PUBLIC_ACCESS_DENIED,
            });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        other => error_response(other),
    }
}

fn error_response(error: QuoteServiceError) -> Response {
    let status = match &error {
        QuoteServiceError::Validation(_) | QuoteServiceError::InvalidParticipant => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        QuoteServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        QuoteServiceError::InvalidToken | QuoteServiceError::Expired => StatusCode::FORBIDDEN,
        QuoteServiceError::DuplicateResponse
        | QuoteServiceError::AlreadyApproved(_)
        | QuoteServiceError::InvalidTransition(_)
        | QuoteServiceError::Repository(RepositoryError::Conflict)
        | QuoteServiceError::Repository(RepositoryError::Stale) => StatusCode::CONFLICT,
        QuoteServiceError::MissingRate(_) => StatusCode::FAILED_DEPENDENCY,
        QuoteServiceError::Rates(_)
        | QuoteServiceError::Directory(_)
        | QuoteServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        QuoteServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
