use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::currency::{normalize_currency_code, ConversionError, MissingRate, RateError};
use super::domain::{
    Order, OrderId, OrderStatus, PartSummary, QuoteRequest, QuoteRequestDraft, QuoteRequestId,
    QuoteRequestStatus, QuoteResponse, QuoteResponseId, QuoteSubmission, SupplierId,
    SupplierPerformanceRecord,
};
use super::methods;
use super::orders::{self, OrderStatusUpdate};
use super::performance;
use super::repository::{
    Clock, DirectoryError, InvitationEmail, Mailer, PartDirectory, QuoteStore, RateSource,
    RepositoryError, SupplierDirectory,
};
use super::scoring::{ScoreBreakdown, ScoringConfig, ScoringEngine};
use super::status::{derive_status, StatusFacts};
use super::token::{self, AccessToken, TokenError};

const MAX_NOTES_CHARS: usize = 2000;

/// External systems the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub parts: Arc<dyn PartDirectory>,
    pub suppliers: Arc<dyn SupplierDirectory>,
    pub mailer: Arc<dyn Mailer>,
    pub rates: Arc<dyn RateSource>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub scoring: ScoringConfig,
    /// Base of the supplier-facing form link; request and supplier ids are appended.
    pub public_form_url: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            public_form_url: "http://localhost:8080/quote".to_string(),
        }
    }
}

/// Request with its derived status, as shown to buyers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOverview {
    #[serde(flatten)]
    pub request: QuoteRequest,
    pub status: QuoteRequestStatus,
    pub response_count: usize,
    pub invited_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { supplier_id: SupplierId },
    Failed { supplier_id: SupplierId, reason: String },
}

impl DispatchOutcome {
    pub fn supplier_id(&self) -> &SupplierId {
        match self {
            DispatchOutcome::Sent { supplier_id } | DispatchOutcome::Failed { supplier_id, .. } => {
                supplier_id
            }
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub request_id: QuoteRequestId,
    pub outcomes: Vec<DispatchOutcome>,
}

/// What a supplier sees behind the access link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuoteForm {
    pub request_id: QuoteRequestId,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub part_code: String,
    pub part_name: String,
    pub quantity: u32,
    pub manufacturing_method: String,
    pub manufacturing_method_name: Option<String>,
    pub deadline: NaiveDate,
    pub notes: Option<String>,
    pub already_responded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub rank: usize,
    pub response_id: QuoteResponseId,
    pub supplier_id: SupplierId,
    pub supplier_name: Option<String>,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub normalized_price: Decimal,
    pub delivery_date: NaiveDate,
    pub payment_terms_days: u32,
    pub scores: ScoreBreakdown,
    pub total: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub request_id: QuoteRequestId,
    pub status: QuoteRequestStatus,
    pub base_currency: String,
    pub rate_snapshot_version: u64,
    pub entries: Vec<ComparisonEntry>,
}

/// Orchestrates the request-for-quote lifecycle over a [`QuoteStore`].
pub struct QuoteWorkflowService<S> {
    store: Arc<S>,
    collaborators: Collaborators,
    engine: ScoringEngine,
    public_form_url: String,
}

impl<S> QuoteWorkflowService<S>
where
    S: QuoteStore + 'static,
{
    pub fn new(store: Arc<S>, collaborators: Collaborators, settings: ServiceSettings) -> Self {
        Self {
            store,
            collaborators,
            engine: ScoringEngine::new(settings.scoring),
            public_form_url: settings.public_form_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validate a buyer draft against the catalogs and persist a new request.
    pub fn create_request(
        &self,
        draft: QuoteRequestDraft,
    ) -> Result<RequestOverview, QuoteServiceError> {
        let today = self.collaborators.clock.today();

        if draft.supplier_ids.is_empty() {
            return Err(validation("at least one supplier must be invited"));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = draft.supplier_ids.iter().find(|id| !seen.insert(*id)) {
            return Err(validation(format!("supplier {duplicate} is listed twice")));
        }
        if draft.deadline < today {
            return Err(validation("deadline must not be in the past"));
        }
        let method = draft.manufacturing_method.trim();
        if methods::lookup(method).is_none() {
            return Err(validation(format!("unknown manufacturing method {method}")));
        }
        let notes = bounded_notes(draft.notes)?;

        match self.collaborators.parts.part(&draft.part_id)? {
            None => return Err(validation(format!("unknown part {}", draft.part_id))),
            Some(part) if part.quantity == 0 => {
                return Err(validation(format!("part {} has no quantity to quote", part.id)));
            }
            Some(_) => {}
        }
        for supplier_id in &draft.supplier_ids {
            if self.collaborators.suppliers.supplier(supplier_id)?.is_none() {
                return Err(validation(format!("unknown supplier {supplier_id}")));
            }
        }

        let request = QuoteRequest {
            id: QuoteRequestId::generate(),
            part_id: draft.part_id,
            manufacturing_method: method.to_string(),
            supplier_ids: draft.supplier_ids,
            deadline: draft.deadline,
            notes,
            created_at: self.collaborators.clock.now(),
            approved_order: None,
            cancelled_at: None,
            review_opened: false,
        };
        let stored = self.store.insert_request(request)?;
        info!(
            request_id = %stored.id,
            part_id = %stored.part_id,
            invited = stored.supplier_ids.len(),
            deadline = %stored.deadline,
            "quote request created"
        );
        self.overview_of(stored)
    }

    pub fn request_overview(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<RequestOverview, QuoteServiceError> {
        let request = self.load_request(request_id)?;
        self.overview_of(request)
    }

    /// Mint a token for one invited supplier, replacing any earlier grant.
    pub fn issue_token(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
    ) -> Result<AccessToken, QuoteServiceError> {
        let request = self.load_request(request_id)?;
        let (token, grant) = token::issue(&request, supplier_id, self.collaborators.clock.now())?;
        self.store.store_token_grant(grant)?;
        Ok(token)
    }

    /// Send invitations to `recipients` (all invited suppliers when `None`). Each recipient gets
    /// a fresh token; failures are reported per supplier and never abort the batch.
    pub fn dispatch_invitations(
        &self,
        request_id: &QuoteRequestId,
        recipients: Option<Vec<SupplierId>>,
    ) -> Result<DispatchReport, QuoteServiceError> {
        let overview = self.request_overview(request_id)?;
        if overview.status.is_terminal() {
            return Err(QuoteServiceError::InvalidTransition(format!(
                "cannot dispatch invitations for a {} request",
                overview.status.label()
            )));
        }
        let request = overview.request;
        let part = self.load_part(&request)?;
        let method_name = methods::lookup(&request.manufacturing_method)
            .map(|method| method.name.to_string())
            .unwrap_or_else(|| request.manufacturing_method.clone());

        let recipients = recipients.unwrap_or_else(|| request.supplier_ids.clone());
        let outcomes = recipients
            .into_iter()
            .map(|supplier_id| {
                match self.invite(&request, &part, &method_name, &supplier_id) {
                    Ok(()) => DispatchOutcome::Sent { supplier_id },
                    Err(reason) => {
                        warn!(
                            request_id = %request.id,
                            supplier_id = %supplier_id,
                            reason = %reason,
                            "invitation not delivered"
                        );
                        DispatchOutcome::Failed {
                            supplier_id,
                            reason,
                        }
                    }
                }
            })
            .collect::<Vec<_>>();

        info!(
            request_id = %request.id,
            sent = outcomes.iter().filter(|outcome| outcome.is_sent()).count(),
            failed = outcomes.iter().filter(|outcome| !outcome.is_sent()).count(),
            "invitations dispatched"
        );
        Ok(DispatchReport {
            request_id: request.id,
            outcomes,
        })
    }

    fn invite(
        &self,
        request: &QuoteRequest,
        part: &PartSummary,
        method_name: &str,
        supplier_id: &SupplierId,
    ) -> Result<(), String> {
        let contact = self
            .collaborators
            .suppliers
            .supplier(supplier_id)
            .map_err(|error| error.to_string())?
            .ok_or_else(|| "supplier has no contact record".to_string())?;
        let (token, grant) = token::issue(request, supplier_id, self.collaborators.clock.now())
            .map_err(|error| error.to_string())?;
        self.store
            .store_token_grant(grant)
            .map_err(|error| error.to_string())?;

        let invitation = InvitationEmail {
            request_id: request.id.clone(),
            supplier_id: supplier_id.clone(),
            supplier_name: contact.name,
            part_code: part.code.clone(),
            part_name: part.name.clone(),
            quantity: part.quantity,
            manufacturing_method: method_name.to_string(),
            deadline: request.deadline,
            form_url: format!(
                "{}/{}/{}?token={}",
                self.public_form_url,
                request.id,
                supplier_id,
                token.as_str()
            ),
        };
        self.collaborators
            .mailer
            .send(&contact.email, &invitation)
            .map_err(|error| error.to_string())
    }

    /// Form context for a supplier holding a valid token.
    pub fn public_form(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
        presented: &str,
    ) -> Result<PublicQuoteForm, QuoteServiceError> {
        let request = self.authorize(request_id, supplier_id, presented)?;
        let part = self.load_part(&request)?;
        let supplier = self
            .collaborators
            .suppliers
            .supplier(supplier_id)?
            .ok_or(QuoteServiceError::NotFound("supplier"))?;
        let already_responded = self
            .store
            .responses_for(request_id)?
            .iter()
            .any(|response| &response.supplier_id == supplier_id);

        Ok(PublicQuoteForm {
            request_id: request.id,
            supplier_id: supplier.id,
            supplier_name: supplier.name,
            part_code: part.code,
            part_name: part.name,
            quantity: part.quantity,
            manufacturing_method_name: methods::lookup(&request.manufacturing_method)
                .map(|method| method.name.to_string()),
            manufacturing_method: request.manufacturing_method,
            deadline: request.deadline,
            notes: request.notes,
            already_responded,
        })
    }

    /// Record a supplier quote. The token is checked again here, not only on form fetch.
    pub fn submit_response(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
        presented: &str,
        submission: QuoteSubmission,
    ) -> Result<QuoteResponse, QuoteServiceError> {
        let request = self.authorize(request_id, supplier_id, presented)?;
        if request.is_approved() || request.is_cancelled() {
            return Err(QuoteServiceError::InvalidTransition(
                "request is no longer accepting quotes".to_string(),
            ));
        }

        let today = self.collaborators.clock.today();
        if submission.unit_price <= Decimal::ZERO {
            return Err(validation("unit price must be positive"));
        }
        if submission.delivery_date < today {
            return Err(validation("delivery date must not be in the past"));
        }
        let currency = normalize_currency_code(&submission.currency).ok_or_else(|| {
            validation(format!("invalid currency code {}", submission.currency.trim()))
        })?;
        let notes = bounded_notes(submission.notes)?;
        let part = self.load_part(&request)?;
        if part.quantity == 0 {
            return Err(validation(format!("part {} has no quantity to quote", part.id)));
        }
        let total_price = submission
            .unit_price
            .checked_mul(Decimal::from(part.quantity))
            .ok_or_else(|| validation("unit price is out of range"))?;

        let response = QuoteResponse {
            id: QuoteResponseId::generate(),
            request_id: request.id.clone(),
            supplier_id: supplier_id.clone(),
            unit_price: submission.unit_price,
            total_price,
            currency,
            delivery_date: submission.delivery_date,
            payment_terms_days: submission.payment_terms_days,
            notes,
            created_at: self.collaborators.clock.now(),
        };

        let stored = self
            .store
            .insert_response(response)
            .map_err(|error| match error {
                RepositoryError::Conflict => QuoteServiceError::DuplicateResponse,
                other => other.into(),
            })?;
        info!(
            request_id = %stored.request_id,
            supplier_id = %stored.supplier_id,
            total_price = %stored.total_price,
            currency = %stored.currency,
            "quote received"
        );
        Ok(stored)
    }

    /// Rank every response against the current rate snapshot and flag the request as reviewed.
    pub fn compare(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<ComparisonReport, QuoteServiceError> {
        let request = self.load_request(request_id)?;
        if request.is_cancelled() {
            return Err(QuoteServiceError::InvalidTransition(
                "cannot compare quotes for a cancelled request".to_string(),
            ));
        }

        let snapshot = self.collaborators.rates.snapshot()?;
        let responses = self.store.responses_for(request_id)?;
        let mut history = BTreeMap::new();
        for response in &responses {
            if let Some(record) = self.store.performance(&response.supplier_id)? {
                history.insert(response.supplier_id.clone(), record);
            }
        }

        let comparison = self
            .engine
            .compare(request_id, &responses, &history, &snapshot)
            .inspect_err(|error| {
                warn!(request_id = %request_id, reason = %error, "comparison aborted");
            })?;

        if !request.is_approved() && !request.review_opened {
            self.store.mark_review_opened(request_id)?;
        }
        let status = self.request_overview(request_id)?.status;

        let mut entries = Vec::with_capacity(comparison.entries.len());
        for ranked in comparison.entries {
            let supplier_name = self
                .collaborators
                .suppliers
                .supplier(&ranked.supplier_id)?
                .map(|contact| contact.name);
            entries.push(ComparisonEntry {
                rank: ranked.rank,
                response_id: ranked.response.id,
                supplier_id: ranked.supplier_id,
                supplier_name,
                unit_price: ranked.response.unit_price,
                total_price: ranked.response.total_price,
                currency: ranked.response.currency,
                normalized_price: ranked.normalized_price,
                delivery_date: ranked.response.delivery_date,
                payment_terms_days: ranked.response.payment_terms_days,
                scores: ranked.scores,
                total: ranked.total,
            });
        }

        Ok(ComparisonReport {
            request_id: comparison.request_id,
            status,
            base_currency: comparison.base_currency,
            rate_snapshot_version: comparison.rate_snapshot_version,
            entries,
        })
    }

    /// Convert the chosen response into the request's single order.
    pub fn approve(
        &self,
        request_id: &QuoteRequestId,
        response_id: &QuoteResponseId,
    ) -> Result<Order, QuoteServiceError> {
        let request = self.load_request(request_id)?;
        if request.is_cancelled() {
            return Err(QuoteServiceError::InvalidTransition(
                "cannot approve a cancelled request".to_string(),
            ));
        }
        if let Some(order_id) = &request.approved_order {
            let existing = self
                .store
                .fetch_order(order_id)?
                .ok_or(QuoteServiceError::NotFound("order"))?;
            return Err(QuoteServiceError::AlreadyApproved(Box::new(existing)));
        }

        let response = self
            .store
            .fetch_response(response_id)?
            .ok_or(QuoteServiceError::NotFound("quote response"))?;
        if &response.request_id != request_id {
            return Err(validation("response does not belong to this request"));
        }
        let part = self.load_part(&request)?;

        let order = orders::order_from_response(&response, &part, self.collaborators.clock.now());
        let order = self.store.commit_approval(order)?;
        info!(
            request_id = %request_id,
            order_code = %order.code,
            supplier_id = %order.supplier_id,
            total_price = %order.total_price,
            currency = %order.currency,
            "quote approved"
        );
        Ok(order)
    }

    pub fn cancel(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<RequestOverview, QuoteServiceError> {
        let request = self
            .store
            .cancel_request(request_id, self.collaborators.clock.now())
            .map_err(|error| match error {
                RepositoryError::Closed => QuoteServiceError::InvalidTransition(
                    "request is already approved or cancelled".to_string(),
                ),
                other => other.into(),
            })?;
        info!(request_id = %request_id, "quote request cancelled");
        self.overview_of(request)
    }

    pub fn order(&self, order_id: &OrderId) -> Result<Order, QuoteServiceError> {
        self.store
            .fetch_order(order_id)?
            .ok_or(QuoteServiceError::NotFound("order"))
    }

    /// Move an order forward. Delivery feeds the supplier's performance record exactly once.
    pub fn update_order_status(
        &self,
        order_id: &OrderId,
        update: OrderStatusUpdate,
    ) -> Result<Order, QuoteServiceError> {
        let current = self.order(order_id)?;
        let next = orders::apply_update(&current, &update)
            .map_err(|error| QuoteServiceError::InvalidTransition(error.to_string()))?;
        self.store.transition_order(next.clone(), current.status)?;
        info!(
            order_code = %next.code,
            from = current.status.label(),
            to = next.status.label(),
            "order status updated"
        );

        if next.status == OrderStatus::Delivered {
            let recorded_at = self.collaborators.clock.now();
            let mut assessment = None;
            let record = self.store.apply_performance(
                &next.supplier_id,
                &mut |record: &mut SupplierPerformanceRecord| {
                    assessment = Some(performance::record_outcome(record, &next, recorded_at));
                },
            )?;
            if let Some(assessment) = assessment {
                info!(
                    supplier_id = %record.supplier_id,
                    on_time = assessment.on_time,
                    rejected = assessment.rejected,
                    total_score = record.total_score,
                    "supplier performance updated"
                );
            }
        }

        Ok(next)
    }

    /// Stored record, or the neutral starting record for a known supplier without orders.
    pub fn supplier_performance(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<SupplierPerformanceRecord, QuoteServiceError> {
        let mut record = match self.store.performance(supplier_id)? {
            Some(record) => record,
            None => self
                .collaborators
                .suppliers
                .supplier(supplier_id)?
                .map(|contact| SupplierPerformanceRecord::new(contact.id))
                .ok_or(QuoteServiceError::NotFound("supplier"))?,
        };
        // report the quality the comparison would use for a supplier without deliveries
        if !record.has_history() {
            record.quality_score = self.engine.config().default_quality_score;
            record.total_score = record.component_sum();
        }
        Ok(record)
    }

    fn load_request(&self, request_id: &QuoteRequestId) -> Result<QuoteRequest, QuoteServiceError> {
        self.store
            .fetch_request(request_id)?
            .ok_or(QuoteServiceError::NotFound("quote request"))
    }

    fn load_part(&self, request: &QuoteRequest) -> Result<PartSummary, QuoteServiceError> {
        self.collaborators
            .parts
            .part(&request.part_id)?
            .ok_or(QuoteServiceError::NotFound("part"))
    }

    fn overview_of(&self, request: QuoteRequest) -> Result<RequestOverview, QuoteServiceError> {
        let response_count = self.store.responses_for(&request.id)?.len();
        let facts =
            StatusFacts::for_request(&request, response_count, self.collaborators.clock.today());
        Ok(RequestOverview {
            status: derive_status(&facts),
            response_count,
            invited_count: request.supplier_ids.len(),
            request,
        })
    }

    fn authorize(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
        presented: &str,
    ) -> Result<QuoteRequest, QuoteServiceError> {
        let request = self.store.fetch_request(request_id)?;
        let grant = self.store.token_grant(request_id, supplier_id)?;
        token::validate(
            request.as_ref(),
            grant.as_ref(),
            supplier_id,
            presented,
            self.collaborators.clock.today(),
        )
        .inspect_err(|error| {
            warn!(
                request_id = %request_id,
                supplier_id = %supplier_id,
                reason = %error,
                "quote form access rejected"
            );
        })?;
        request.ok_or(QuoteServiceError::InvalidToken)
    }
}

fn validation(message: impl Into<String>) -> QuoteServiceError {
    QuoteServiceError::Validation(message.into())
}

fn bounded_notes(notes: Option<String>) -> Result<Option<String>, QuoteServiceError> {
    match notes.map(|text| text.trim().to_string()) {
        Some(text) if text.chars().count() > MAX_NOTES_CHARS => Err(validation(format!(
            "notes must be at most {MAX_NOTES_CHARS} characters"
        ))),
        Some(text) if text.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Error raised by the quote workflow service.
#[derive(Debug, thiserror::Error)]
pub enum QuoteServiceError {
    #[error("supplier is not invited to this request")]
    InvalidParticipant,
    #[error("access link has expired")]
    Expired,
    #[error("access link is invalid")]
    InvalidToken,
    #[error("supplier has already responded to this request")]
    DuplicateResponse,
    #[error("{0}")]
    Validation(String),
    #[error("request already approved as order {}", .0.code)]
    AlreadyApproved(Box<Order>),
    #[error(transparent)]
    MissingRate(#[from] MissingRate),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Rates(#[from] RateError),
}

impl From<TokenError> for QuoteServiceError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::InvalidParticipant => QuoteServiceError::InvalidParticipant,
            TokenError::InvalidToken => QuoteServiceError::InvalidToken,
            TokenError::Expired => QuoteServiceError::Expired,
        }
    }
}

impl From<ConversionError> for QuoteServiceError {
    fn from(error: ConversionError) -> Self {
        match error {
            ConversionError::MissingRate(missing) => QuoteServiceError::MissingRate(missing),
            out_of_range @ ConversionError::OutOfRange { .. } => {
                QuoteServiceError::Validation(out_of_range.to_string())
            }
        }
    }
}

impl From<RepositoryError> for QuoteServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => QuoteServiceError::NotFound("record"),
            RepositoryError::AlreadyApproved(order) => QuoteServiceError::AlreadyApproved(order),
            RepositoryError::Closed => {
                QuoteServiceError::InvalidTransition("request is closed".to_string())
            }
            other => QuoteServiceError::Repository(other),
        }
    }
}
