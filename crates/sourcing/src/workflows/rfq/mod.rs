//! Request-for-quote sourcing: supplier invitations, tokenised quote intake, multi-criteria
//! comparison, approval into orders, and supplier performance feedback.

pub mod currency;
pub mod domain;
pub mod memory;
pub mod methods;
pub mod orders;
pub mod performance;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod status;
pub mod token;

#[cfg(test)]
mod tests;

pub use currency::{ConversionError, CurrencyRateSnapshot, MissingRate, RateError};
pub use domain::{
    InspectionOutcome, Order, OrderId, OrderStatus, PartId, PartSummary, QuoteRequest,
    QuoteRequestDraft, QuoteRequestId, QuoteRequestStatus, QuoteResponse, QuoteResponseId,
    QuoteSubmission, SupplierContact, SupplierId, SupplierPerformanceRecord,
};
pub use memory::InMemoryQuoteStore;
pub use orders::{OrderStatusUpdate, OrderTransitionError};
pub use repository::{
    Clock, DirectoryError, InvitationEmail, MailError, Mailer, ManualClock, PartDirectory,
    QuoteStore, RateSource, RepositoryError, SupplierDirectory, SystemClock,
};
pub use router::rfq_router;
pub use scoring::{QuoteComparison, RankedQuote, ScoreBreakdown, ScoringConfig, ScoringEngine};
pub use service::{
    Collaborators, ComparisonEntry, ComparisonReport, DispatchOutcome, DispatchReport,
    PublicQuoteForm, QuoteServiceError, QuoteWorkflowService, RequestOverview, ServiceSettings,
};
pub use token::{AccessToken, TokenError, TokenGrant};
