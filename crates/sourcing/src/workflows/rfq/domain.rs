use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a request-for-quote.
    QuoteRequestId
);
string_id!(
    /// Identifier of a supplier's quote against a request.
    QuoteResponseId
);
string_id!(
    /// Identifier of an order created from an approved quote.
    OrderId
);
string_id!(
    /// Part identifier owned by the external part catalog.
    PartId
);
string_id!(
    /// Supplier identifier owned by the external supplier catalog.
    SupplierId
);

impl QuoteRequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl QuoteResponseId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Read-only view of a part as exposed by the part catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    pub id: PartId,
    pub code: String,
    pub name: String,
    pub quantity: u32,
}

/// Read-only supplier contact details as exposed by the supplier catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierContact {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
}

/// Buyer input for a new request-for-quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestDraft {
    pub part_id: PartId,
    pub supplier_ids: Vec<SupplierId>,
    pub manufacturing_method: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Persisted request-for-quote. The lifecycle status is never stored; see [`super::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    pub part_id: PartId,
    pub manufacturing_method: String,
    pub supplier_ids: Vec<SupplierId>,
    pub deadline: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_order: Option<OrderId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub review_opened: bool,
}

impl QuoteRequest {
    pub fn invites(&self, supplier_id: &SupplierId) -> bool {
        self.supplier_ids.iter().any(|invited| invited == supplier_id)
    }

    pub fn is_approved(&self) -> bool {
        self.approved_order.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Inclusive: the deadline day itself is still open.
    pub fn is_past_deadline(&self, today: NaiveDate) -> bool {
        today > self.deadline
    }
}

/// Supplier-provided quote fields, exclusive of the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSubmission {
    pub unit_price: Decimal,
    pub currency: String,
    pub delivery_date: NaiveDate,
    pub payment_terms_days: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Immutable supplier quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub id: QuoteResponseId,
    pub request_id: QuoteRequestId,
    pub supplier_id: SupplierId,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub delivery_date: NaiveDate,
    pub payment_terms_days: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derived lifecycle of a request-for-quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteRequestStatus {
    Requested,
    PartiallyResponded,
    Received,
    Approved,
    Expired,
    Cancelled,
}

impl QuoteRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuoteRequestStatus::Requested => "requested",
            QuoteRequestStatus::PartiallyResponded => "partially_responded",
            QuoteRequestStatus::Received => "received",
            QuoteRequestStatus::Approved => "approved",
            QuoteRequestStatus::Expired => "expired",
            QuoteRequestStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            QuoteRequestStatus::Approved
                | QuoteRequestStatus::Expired
                | QuoteRequestStatus::Cancelled
        )
    }
}

/// Order lifecycle; only `Delivered` feeds supplier performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// Result of the buyer's incoming quality inspection, supplied when an order is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionOutcome {
    Accepted,
    Rejected,
}

/// Binding order. Commercial fields are a frozen copy of the approved quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub code: String,
    pub request_id: QuoteRequestId,
    pub response_id: QuoteResponseId,
    pub part_id: PartId,
    pub supplier_id: SupplierId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub payment_terms_days: u32,
    pub expected_delivery: NaiveDate,
    pub actual_delivery: Option<NaiveDate>,
    pub inspection: Option<InspectionOutcome>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Rolling supplier performance consumed read-only by quote scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPerformanceRecord {
    pub supplier_id: SupplierId,
    pub delivery_score: f64,
    pub quality_score: f64,
    pub price_score: f64,
    pub payment_score: f64,
    pub total_score: f64,
    pub total_orders: u32,
    pub on_time_deliveries: u32,
    pub quality_rejections: u32,
    pub payment_terms_days_total: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SupplierPerformanceRecord {
    pub fn new(supplier_id: SupplierId) -> Self {
        let mut record = Self {
            supplier_id,
            delivery_score: 40.0,
            quality_score: 30.0,
            price_score: 15.0,
            payment_score: 10.0,
            total_score: 0.0,
            total_orders: 0,
            on_time_deliveries: 0,
            quality_rejections: 0,
            payment_terms_days_total: 0,
            updated_at: None,
        };
        record.total_score = record.component_sum();
        record
    }

    pub fn has_history(&self) -> bool {
        self.total_orders > 0
    }

    pub(crate) fn component_sum(&self) -> f64 {
        self.delivery_score + self.quality_score + self.price_score + self.payment_score
    }
}
