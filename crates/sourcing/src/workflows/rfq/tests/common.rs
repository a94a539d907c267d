use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::rfq::currency::{CurrencyRateSnapshot, RateError};
use crate::workflows::rfq::domain::{
    PartId, PartSummary, QuoteRequestDraft, QuoteRequestId, QuoteSubmission, SupplierContact,
    SupplierId,
};
use crate::workflows::rfq::memory::InMemoryQuoteStore;
use crate::workflows::rfq::repository::{
    DirectoryError, InvitationEmail, MailError, Mailer, ManualClock, PartDirectory, RateSource,
    SupplierDirectory,
};
use crate::workflows::rfq::service::{Collaborators, QuoteWorkflowService, ServiceSettings};
use crate::workflows::rfq::token::AccessToken;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn day(offset: i64) -> NaiveDate {
    now().date_naive() + chrono::Duration::days(offset)
}

pub(super) fn supplier(id: &str) -> SupplierId {
    SupplierId::new(id)
}

pub(super) fn parts() -> Vec<PartSummary> {
    vec![
        PartSummary {
            id: PartId::new("part-bracket"),
            code: "BRK-100".to_string(),
            name: "Mounting bracket".to_string(),
            quantity: 1,
        },
        PartSummary {
            id: PartId::new("part-shaft"),
            code: "SHF-220".to_string(),
            name: "Drive shaft".to_string(),
            quantity: 4,
        },
    ]
}

pub(super) fn contacts() -> Vec<SupplierContact> {
    ["sup-a", "sup-b", "sup-c"]
        .into_iter()
        .map(|id| SupplierContact {
            id: supplier(id),
            name: format!("Supplier {}", id.trim_start_matches("sup-").to_uppercase()),
            email: format!("{id}@suppliers.test"),
        })
        .collect()
}

pub(super) fn rates() -> CurrencyRateSnapshot {
    CurrencyRateSnapshot::new("TRY", 7, now())
        .and_then(|snapshot| snapshot.with_rate("USD", Decimal::from(33)))
        .and_then(|snapshot| snapshot.with_rate("EUR", Decimal::from(36)))
        .expect("valid snapshot")
}

pub(super) fn draft(part: &str, suppliers: &[&str]) -> QuoteRequestDraft {
    QuoteRequestDraft {
        part_id: PartId::new(part),
        supplier_ids: suppliers.iter().map(|id| supplier(id)).collect(),
        manufacturing_method: "3001".to_string(),
        deadline: day(7),
        notes: Some("Anodized finish".to_string()),
    }
}

pub(super) fn quote(
    unit_price: i64,
    currency: &str,
    lead_days: i64,
    terms: u32,
) -> QuoteSubmission {
    QuoteSubmission {
        unit_price: Decimal::from(unit_price),
        currency: currency.to_string(),
        delivery_date: day(lead_days),
        payment_terms_days: terms,
        notes: None,
    }
}

#[derive(Default)]
pub(super) struct StaticDirectory {
    parts: Mutex<HashMap<PartId, PartSummary>>,
    suppliers: HashMap<SupplierId, SupplierContact>,
}

impl StaticDirectory {
    pub(super) fn seeded() -> Self {
        Self {
            parts: Mutex::new(
                parts()
                    .into_iter()
                    .map(|part| (part.id.clone(), part))
                    .collect(),
            ),
            suppliers: contacts()
                .into_iter()
                .map(|contact| (contact.id.clone(), contact))
                .collect(),
        }
    }

    /// Simulate the part record being edited in the external catalog.
    pub(super) fn set_quantity(&self, id: &str, quantity: u32) {
        if let Some(part) = self
            .parts
            .lock()
            .expect("parts mutex poisoned")
            .get_mut(&PartId::new(id))
        {
            part.quantity = quantity;
        }
    }
}

impl PartDirectory for StaticDirectory {
    fn part(&self, id: &PartId) -> Result<Option<PartSummary>, DirectoryError> {
        Ok(self
            .parts
            .lock()
            .expect("parts mutex poisoned")
            .get(id)
            .cloned())
    }
}

impl SupplierDirectory for StaticDirectory {
    fn supplier(&self, id: &SupplierId) -> Result<Option<SupplierContact>, DirectoryError> {
        Ok(self.suppliers.get(id).cloned())
    }
}

pub(super) struct FixedRates(pub(super) Mutex<CurrencyRateSnapshot>);

impl FixedRates {
    pub(super) fn replace(&self, snapshot: CurrencyRateSnapshot) {
        *self.0.lock().expect("rates mutex poisoned") = snapshot;
    }
}

impl RateSource for FixedRates {
    fn snapshot(&self) -> Result<CurrencyRateSnapshot, RateError> {
        Ok(self.0.lock().expect("rates mutex poisoned").clone())
    }
}

/// Captures outgoing invitations; addresses listed in `bounce` are rejected.
#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<(String, InvitationEmail)>>,
    bounce: HashSet<String>,
}

impl RecordingMailer {
    pub(super) fn bouncing(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::default(),
            bounce: addresses.iter().map(|address| address.to_string()).collect(),
        }
    }

    pub(super) fn sent(&self) -> Vec<(String, InvitationEmail)> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    /// Token carried by the latest invitation sent to `supplier_id`.
    pub(super) fn token_for(&self, supplier_id: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(_, email)| email.supplier_id.as_str() == supplier_id)
            .and_then(|(_, email)| {
                email
                    .form_url
                    .split_once("token=")
                    .map(|(_, token)| token.to_string())
            })
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, invitation: &InvitationEmail) -> Result<(), MailError> {
        if self.bounce.contains(to) {
            return Err(MailError::Rejected(to.to_string()));
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((to.to_string(), invitation.clone()));
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<QuoteWorkflowService<InMemoryQuoteStore>>,
    pub(super) store: Arc<InMemoryQuoteStore>,
    pub(super) directory: Arc<StaticDirectory>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) rates: Arc<FixedRates>,
    pub(super) clock: Arc<ManualClock>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub(super) fn with_mailer(mailer: RecordingMailer) -> Self {
        let store = Arc::new(InMemoryQuoteStore::default());
        let directory = Arc::new(StaticDirectory::seeded());
        let mailer = Arc::new(mailer);
        let rates = Arc::new(FixedRates(Mutex::new(rates())));
        let clock = Arc::new(ManualClock::at(now()));
        let collaborators = Collaborators {
            parts: directory.clone(),
            suppliers: directory.clone(),
            mailer: mailer.clone(),
            rates: rates.clone(),
            clock: clock.clone(),
        };
        let service = Arc::new(QuoteWorkflowService::new(
            store.clone(),
            collaborators,
            ServiceSettings {
                public_form_url: "https://sourcing.test/quote/".to_string(),
                ..ServiceSettings::default()
            },
        ));
        Self {
            service,
            store,
            directory,
            mailer,
            rates,
            clock,
        }
    }

    /// Create a request and mint a token for each invited supplier.
    pub(super) fn open_request(
        &self,
        part: &str,
        suppliers: &[&str],
    ) -> (QuoteRequestId, HashMap<String, AccessToken>) {
        let overview = self
            .service
            .create_request(draft(part, suppliers))
            .expect("request created");
        let tokens = suppliers
            .iter()
            .map(|id| {
                let token = self
                    .service
                    .issue_token(&overview.request.id, &supplier(id))
                    .expect("token issued");
                (id.to_string(), token)
            })
            .collect();
        (overview.request.id, tokens)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status code");
}
