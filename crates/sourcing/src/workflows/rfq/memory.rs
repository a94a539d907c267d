use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Utc};

use super::domain::{
    Order, OrderId, OrderStatus, QuoteRequest, QuoteRequestId, QuoteResponse, QuoteResponseId,
    SupplierId, SupplierPerformanceRecord,
};
use super::repository::{QuoteStore, RepositoryError};
use super::token::TokenGrant;

#[derive(Default)]
struct Tables {
    requests: HashMap<QuoteRequestId, QuoteRequest>,
    grants: HashMap<(QuoteRequestId, SupplierId), TokenGrant>,
    responses: BTreeMap<QuoteResponseId, QuoteResponse>,
    response_keys: HashMap<(QuoteRequestId, SupplierId), QuoteResponseId>,
    orders: HashMap<OrderId, Order>,
    order_by_request: HashMap<QuoteRequestId, OrderId>,
    performance: HashMap<SupplierId, SupplierPerformanceRecord>,
}

/// Process-local store. One mutex guards every table so each write is a single critical
/// section; the key maps play the role of unique indexes.
#[derive(Default, Clone)]
pub struct InMemoryQuoteStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryQuoteStore {
    pub fn order_count(&self) -> usize {
        self.tables.lock().expect("store mutex poisoned").orders.len()
    }
}

fn next_order_code(tables: &Tables, created_at: DateTime<Utc>) -> String {
    let year = created_at.year();
    let prefix = format!("ORD-{year}-");
    let issued = tables
        .orders
        .values()
        .filter(|order| order.code.starts_with(&prefix))
        .count();
    format!("{prefix}{:03}", issued + 1)
}

impl QuoteStore for InMemoryQuoteStore {
    fn insert_request(&self, request: QuoteRequest) -> Result<QuoteRequest, RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch_request(&self, id: &QuoteRequestId) -> Result<Option<QuoteRequest>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.requests.get(id).cloned())
    }

    fn mark_review_opened(&self, id: &QuoteRequestId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let request = tables.requests.get_mut(id).ok_or(RepositoryError::NotFound)?;
        request.review_opened = true;
        Ok(())
    }

    fn cancel_request(
        &self,
        id: &QuoteRequestId,
        at: DateTime<Utc>,
    ) -> Result<QuoteRequest, RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let request = tables.requests.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if request.is_approved() || request.is_cancelled() {
            return Err(RepositoryError::Closed);
        }
        request.cancelled_at = Some(at);
        Ok(request.clone())
    }

    fn store_token_grant(&self, grant: TokenGrant) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if !tables.requests.contains_key(&grant.request_id) {
            return Err(RepositoryError::NotFound);
        }
        let key = (grant.request_id.clone(), grant.supplier_id.clone());
        tables.grants.insert(key, grant);
        Ok(())
    }

    fn token_grant(
        &self,
        request_id: &QuoteRequestId,
        supplier_id: &SupplierId,
    ) -> Result<Option<TokenGrant>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .grants
            .get(&(request_id.clone(), supplier_id.clone()))
            .cloned())
    }

    fn insert_response(&self, response: QuoteResponse) -> Result<QuoteResponse, RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let request = tables
            .requests
            .get(&response.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if request.is_approved() || request.is_cancelled() {
            return Err(RepositoryError::Closed);
        }

        let key = (response.request_id.clone(), response.supplier_id.clone());
        if tables.response_keys.contains_key(&key) || tables.responses.contains_key(&response.id)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.response_keys.insert(key, response.id.clone());
        tables.responses.insert(response.id.clone(), response.clone());
        Ok(response)
    }

    fn fetch_response(
        &self,
        id: &QuoteResponseId,
    ) -> Result<Option<QuoteResponse>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.responses.get(id).cloned())
    }

    fn responses_for(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<Vec<QuoteResponse>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .responses
            .values()
            .filter(|response| &response.request_id == request_id)
            .cloned()
            .collect())
    }

    fn commit_approval(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");

        if let Some(existing) = tables
            .order_by_request
            .get(&order.request_id)
            .and_then(|order_id| tables.orders.get(order_id))
        {
            return Err(RepositoryError::AlreadyApproved(Box::new(existing.clone())));
        }

        let request = tables
            .requests
            .get(&order.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if request.is_cancelled() {
            return Err(RepositoryError::Closed);
        }

        order.code = next_order_code(&tables, order.created_at);
        if let Some(request) = tables.requests.get_mut(&order.request_id) {
            request.approved_order = Some(order.id.clone());
        }
        tables
            .order_by_request
            .insert(order.request_id.clone(), order.id.clone());
        tables.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.orders.get(id).cloned())
    }

    fn transition_order(&self, order: Order, expected: OrderStatus) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let stored = tables
            .orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Stale);
        }
        *stored = order;
        Ok(())
    }

    fn performance(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<Option<SupplierPerformanceRecord>, RepositoryError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.performance.get(supplier_id).cloned())
    }

    fn apply_performance(
        &self,
        supplier_id: &SupplierId,
        apply: &mut dyn FnMut(&mut SupplierPerformanceRecord),
    ) -> Result<SupplierPerformanceRecord, RepositoryError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let record = tables
            .performance
            .entry(supplier_id.clone())
            .or_insert_with(|| SupplierPerformanceRecord::new(supplier_id.clone()));
        apply(record);
        Ok(record.clone())
    }
}
