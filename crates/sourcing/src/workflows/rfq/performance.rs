use chrono::{DateTime, Utc};

use super::domain::{InspectionOutcome, Order, SupplierPerformanceRecord};
use super::scoring::ScoringConfig;

/// Outcome of folding one delivered order into a supplier record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryAssessment {
    pub on_time: bool,
    pub rejected: bool,
}

/// Fold a delivered order into `record`. This is the only code that writes performance.
///
/// Orders without an actual delivery date count as late; a missing inspection counts as
/// accepted.
pub fn record_outcome(
    record: &mut SupplierPerformanceRecord,
    order: &Order,
    recorded_at: DateTime<Utc>,
) -> DeliveryAssessment {
    let on_time = order
        .actual_delivery
        .map(|actual| actual <= order.expected_delivery)
        .unwrap_or(false);
    let rejected = order.inspection == Some(InspectionOutcome::Rejected);

    record.total_orders += 1;
    if on_time {
        record.on_time_deliveries += 1;
    }
    if rejected {
        record.quality_rejections += 1;
    }
    record.payment_terms_days_total += u64::from(order.payment_terms_days);

    let total = f64::from(record.total_orders);
    record.delivery_score =
        ScoringConfig::DELIVERY_MAX * f64::from(record.on_time_deliveries) / total;
    record.quality_score =
        ScoringConfig::QUALITY_MAX * (1.0 - f64::from(record.quality_rejections) / total);
    record.payment_score = payment_tier(record.payment_terms_days_total as f64 / total);
    record.total_score = record.component_sum();
    record.updated_at = Some(recorded_at);

    DeliveryAssessment { on_time, rejected }
}

fn payment_tier(average_days: f64) -> f64 {
    if average_days >= 90.0 {
        10.0
    } else if average_days >= 60.0 {
        8.0
    } else if average_days >= 30.0 {
        5.0
    } else {
        3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rfq::domain::{
        OrderId, OrderStatus, PartId, QuoteRequestId, QuoteResponseId, SupplierId,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn delivered(actual_day: u32, inspection: InspectionOutcome, terms: u32) -> Order {
        Order {
            id: OrderId::generate(),
            code: "ORD-2026-001".to_string(),
            request_id: QuoteRequestId::new("rfq-1"),
            response_id: QuoteResponseId::new("resp-1"),
            part_id: PartId::new("part-1"),
            supplier_id: SupplierId::new("sup-a"),
            quantity: 1,
            unit_price: Decimal::ONE,
            total_price: Decimal::ONE,
            currency: "TRY".to_string(),
            payment_terms_days: terms,
            expected_delivery: NaiveDate::from_ymd_opt(2026, 6, 10).expect("valid"),
            actual_delivery: NaiveDate::from_ymd_opt(2026, 6, actual_day),
            inspection: Some(inspection),
            status: OrderStatus::Delivered,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn on_time_accepted_delivery_keeps_full_marks() {
        let mut record = SupplierPerformanceRecord::new(SupplierId::new("sup-a"));
        let assessment = record_outcome(
            &mut record,
            &delivered(10, InspectionOutcome::Accepted, 90),
            Utc::now(),
        );

        assert_eq!(
            assessment,
            DeliveryAssessment {
                on_time: true,
                rejected: false
            }
        );
        assert_eq!(record.total_orders, 1);
        assert_eq!(record.delivery_score, 40.0);
        assert_eq!(record.quality_score, 30.0);
        assert_eq!(record.payment_score, 10.0);
        assert_eq!(record.total_score, 95.0);
    }

    #[test]
    fn late_and_rejected_deliveries_pull_scores_down() {
        let mut record = SupplierPerformanceRecord::new(SupplierId::new("sup-a"));
        record_outcome(
            &mut record,
            &delivered(9, InspectionOutcome::Accepted, 30),
            Utc::now(),
        );
        let assessment = record_outcome(
            &mut record,
            &delivered(14, InspectionOutcome::Rejected, 30),
            Utc::now(),
        );

        assert!(!assessment.on_time);
        assert!(assessment.rejected);
        assert_eq!(record.on_time_deliveries, 1);
        assert_eq!(record.delivery_score, 20.0);
        assert_eq!(record.quality_score, 15.0);
        assert_eq!(record.payment_score, 5.0);
        assert_eq!(record.total_score, 20.0 + 15.0 + 15.0 + 5.0);
    }
}
