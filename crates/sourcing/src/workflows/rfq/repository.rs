use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::currency::{CurrencyRateSnapshot, RateError};
use super::domain::{
    Order, OrderId, OrderStatus, PartId, PartSummary, QuoteRequest, QuoteRequestId,
    QuoteResponse, QuoteResponseId, SupplierContact, SupplierId, SupplierPerformanceRecord,
};
use super::token::TokenGrant;

/// Storage abstraction for requests, responses, token grants, orders, and supplier performance.
///
/// Implementations own the race-sensitive invariants: `insert_response` is insert-if-absent on
/// (request, supplier) and refuses closed requests, `commit_approval` creates at most one order
/// per request and closes the request in the same step.
pub trait QuoteStore: Send + Sync {
    fn insert_request(&self, request: QuoteRequest) -> Result<QuoteRequest, RepositoryError>;
    fn fetch_request(&self, id: &QuoteRequestId) -> Result<Option<QuoteRequest>, RepositoryError>;
    fn mark_review_opened(&self, id: &QuoteRequestId) -> Result<(), RepositoryError>;
    fn cancel_request(
        &self,
        id: &QuoteRequestId,
        at: DateTime<Utc>,
    ) -> Result<QuoteRequest, RepositoryError>;

    fn store_token_grant(&self, grant: TokenGrant) -> Result<(), RepositoryError>;
    fn token_grant(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
    ) -> Result<Option<TokenGrant>, RepositoryError>;

    fn insert_response(&self, response: QuoteResponse) -> Result<QuoteResponse, RepositoryError>;
    fn fetch_response(
        &self,
        id: &QuoteResponseId,
    ) -> Result<Option<QuoteResponse>, RepositoryError>;
    fn responses_for(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<Vec<QuoteResponse>, RepositoryError>;

    fn commit_approval(&self, order: Order) -> Result<Order, RepositoryError>;
    fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    fn transition_order(&self, order: Order, expected: OrderStatus) -> Result<(), RepositoryError>;

    fn performance(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<Option<SupplierPerformanceRecord>, RepositoryError>;
    fn apply_performance(
        &self,
        supplier_id: &SupplierId,
        apply: &mut dyn FnMut(&mut SupplierPerformanceRecord),
    ) -> Result<SupplierPerformanceRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("request is closed")]
    Closed,
    #[error("request already approved as order {}", .0.code)]
    AlreadyApproved(Box<Order>),
    #[error("record changed concurrently")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only part lookup.
pub trait PartDirectory: Send + Sync {
    fn part(&self, id: &PartId) -> Result<Option<PartSummary>, DirectoryError>;
}

/// Read-only supplier contact lookup.
pub trait SupplierDirectory: Send + Sync {
    fn supplier(&self, id: &SupplierId) -> Result<Option<SupplierContact>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of the current operator-maintained rate table.
pub trait RateSource: Send + Sync {
    fn snapshot(&self) -> Result<CurrencyRateSnapshot, RateError>;
}

/// Outbound invitation transport (e-mail adapter, queue, ...).
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, invitation: &InvitationEmail) -> Result<(), MailError>;
}

/// Template data for a supplier invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationEmail {
    pub request_id: QuoteRequestId,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub part_code: String,
    pub part_name: String,
    pub quantity: u32,
    pub manufacturing_method: String,
    pub deadline: NaiveDate,
    pub form_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for demos and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
