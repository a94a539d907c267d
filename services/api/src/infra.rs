use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::Deserialize;
use sourcing::config::SourcingConfig;
use sourcing::error::AppError;
use sourcing::workflows::rfq::{
    Clock, Collaborators, CurrencyRateSnapshot, DirectoryError, InMemoryQuoteStore,
    InvitationEmail, MailError, Mailer, PartDirectory, PartId, PartSummary, QuoteWorkflowService,
    RateError, RateSource, ServiceSettings, SupplierContact, SupplierDirectory, SupplierId,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type SourcingService = QuoteWorkflowService<InMemoryQuoteStore>;

/// Wired service plus the adapters callers may need to reach directly.
pub(crate) struct SourcingRuntime {
    pub(crate) service: Arc<SourcingService>,
    pub(crate) rates: Arc<RateTable>,
    pub(crate) outbox: Arc<OutboxMailer>,
}

pub(crate) fn build_runtime(
    config: &SourcingConfig,
    clock: Arc<dyn Clock>,
) -> Result<SourcingRuntime, AppError> {
    let catalog = match &config.catalog_json {
        Some(path) => Arc::new(CatalogDirectory::from_json(File::open(path)?)?),
        None => Arc::new(CatalogDirectory::demo()),
    };
    let snapshot = match &config.rates_csv {
        Some(path) => load_rates(
            File::open(path)?,
            &config.base_currency,
            1,
            clock.now(),
        )?,
        None => CurrencyRateSnapshot::new(&config.base_currency, 1, clock.now())?,
    };
    info!(
        base_currency = %snapshot.base_currency,
        rates = snapshot.rates().len(),
        "currency rate table loaded"
    );

    let rates = Arc::new(RateTable::new(snapshot));
    let outbox = Arc::new(OutboxMailer::default());
    let collaborators = Collaborators {
        parts: catalog.clone(),
        suppliers: catalog,
        mailer: outbox.clone(),
        rates: rates.clone(),
        clock,
    };
    let settings = ServiceSettings {
        scoring: config.scoring(),
        public_form_url: config.public_form_url.clone(),
    };
    let service = Arc::new(QuoteWorkflowService::new(
        Arc::new(InMemoryQuoteStore::default()),
        collaborators,
        settings,
    ));

    Ok(SourcingRuntime {
        service,
        rates,
        outbox,
    })
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    parts: Vec<PartSummary>,
    #[serde(default)]
    suppliers: Vec<SupplierContact>,
}

/// Read-only part and supplier catalog loaded once at startup.
#[derive(Debug, Default, Clone)]
pub(crate) struct CatalogDirectory {
    parts: HashMap<PartId, PartSummary>,
    suppliers: HashMap<SupplierId, SupplierContact>,
}

impl CatalogDirectory {
    pub(crate) fn new(parts: Vec<PartSummary>, suppliers: Vec<SupplierContact>) -> Self {
        Self {
            parts: parts
                .into_iter()
                .map(|part| (part.id.clone(), part))
                .collect(),
            suppliers: suppliers
                .into_iter()
                .map(|supplier| (supplier.id.clone(), supplier))
                .collect(),
        }
    }

    pub(crate) fn from_json<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_reader(reader)?;
        Ok(Self::new(file.parts, file.suppliers))
    }

    pub(crate) fn demo() -> Self {
        let part = |id: &str, code: &str, name: &str, quantity| PartSummary {
            id: PartId::new(id),
            code: code.to_string(),
            name: name.to_string(),
            quantity,
        };
        let supplier = |id: &str, name: &str, email: &str| SupplierContact {
            id: SupplierId::new(id),
            name: name.to_string(),
            email: email.to_string(),
        };
        Self::new(
            vec![
                part("part-housing", "HSG-042", "Gearbox housing", 1),
                part("part-flange", "FLG-310", "Pump flange", 25),
            ],
            vec![
                supplier("sup-anatolia", "Anatolia Metal", "rfq@anatolia-metal.test"),
                supplier("sup-bosphorus", "Bosphorus CNC", "sales@bosphorus-cnc.test"),
                supplier("sup-cappadocia", "Cappadocia Casting", "quotes@cappadocia.test"),
            ],
        )
    }
}

impl PartDirectory for CatalogDirectory {
    fn part(&self, id: &PartId) -> Result<Option<PartSummary>, DirectoryError> {
        Ok(self.parts.get(id).cloned())
    }
}

impl SupplierDirectory for CatalogDirectory {
    fn supplier(&self, id: &SupplierId) -> Result<Option<SupplierContact>, DirectoryError> {
        Ok(self.suppliers.get(id).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct RateRow {
    currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    rate: Decimal,
}

/// Build a snapshot from a `currency,rate` CSV export.
pub(crate) fn load_rates<R: Read>(
    reader: R,
    base_currency: &str,
    version: u64,
    captured_at: DateTime<Utc>,
) -> Result<CurrencyRateSnapshot, RateError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut snapshot = CurrencyRateSnapshot::new(base_currency, version, captured_at)?;
    for row in csv_reader.deserialize::<RateRow>() {
        let row = row.map_err(|err| RateError::Unavailable(err.to_string()))?;
        snapshot.insert(&row.currency, row.rate)?;
    }
    Ok(snapshot)
}

/// Operator-maintained rate table. Each publish produces a new, higher snapshot version.
#[derive(Debug)]
pub(crate) struct RateTable {
    current: RwLock<CurrencyRateSnapshot>,
}

impl RateTable {
    pub(crate) fn new(snapshot: CurrencyRateSnapshot) -> Self {
        Self {
            current: RwLock::new(snapshot),
        }
    }

    pub(crate) fn current(&self) -> CurrencyRateSnapshot {
        self.current.read().expect("rate table lock poisoned").clone()
    }

    pub(crate) fn publish(
        &self,
        rates: impl IntoIterator<Item = (String, Decimal)>,
        captured_at: DateTime<Utc>,
    ) -> Result<CurrencyRateSnapshot, RateError> {
        let mut guard = self.current.write().expect("rate table lock poisoned");
        let mut next =
            CurrencyRateSnapshot::new(&guard.base_currency, guard.version + 1, captured_at)?;
        for (currency, rate) in rates {
            next.insert(&currency, rate)?;
        }
        *guard = next.clone();
        info!(version = next.version, rates = next.rates().len(), "currency rates published");
        Ok(next)
    }
}

impl RateSource for RateTable {
    fn snapshot(&self) -> Result<CurrencyRateSnapshot, RateError> {
        Ok(self.current())
    }
}

/// Mail adapter that logs each invitation and keeps it for inspection.
#[derive(Debug, Default)]
pub(crate) struct OutboxMailer {
    sent: Mutex<Vec<(String, InvitationEmail)>>,
}

impl OutboxMailer {
    pub(crate) fn sent(&self) -> Vec<(String, InvitationEmail)> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }

    /// Form link of the most recent invitation to `supplier_id`.
    pub(crate) fn latest_link(&self, supplier_id: &SupplierId) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(_, invitation)| &invitation.supplier_id == supplier_id)
            .map(|(_, invitation)| invitation.form_url)
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, to: &str, invitation: &InvitationEmail) -> Result<(), MailError> {
        if !to.contains('@') {
            return Err(MailError::Rejected(to.to_string()));
        }
        info!(
            %to,
            request_id = %invitation.request_id,
            part = %invitation.part_code,
            deadline = %invitation.deadline,
            "quote invitation queued"
        );
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push((to.to_string(), invitation.clone()));
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Token query parameter of a form link.
pub(crate) fn token_from_link(link: &str) -> Option<&str> {
    link.split_once("token=").map(|(_, token)| token)
}
