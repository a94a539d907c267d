use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{InspectionOutcome, Order, OrderId, OrderStatus, PartSummary, QuoteResponse};

/// Freeze an approved quote into an order. The code is assigned by the store on commit.
pub fn order_from_response(
    response: &QuoteResponse,
    part: &PartSummary,
    created_at: DateTime<Utc>,
) -> Order {
    Order {
        id: OrderId::generate(),
        code: String::new(),
        request_id: response.request_id.clone(),
        response_id: response.id.clone(),
        part_id: part.id.clone(),
        supplier_id: response.supplier_id.clone(),
        quantity: part.quantity,
        unit_price: response.unit_price,
        total_price: response.total_price,
        currency: response.currency.clone(),
        payment_terms_days: response.payment_terms_days,
        expected_delivery: response.delivery_date,
        actual_delivery: None,
        inspection: None,
        status: OrderStatus::Pending,
        created_at,
    }
}

/// Buyer-side order progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub actual_delivery: Option<NaiveDate>,
    #[serde(default)]
    pub inspection: Option<InspectionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderTransitionError {
    #[error("order is already {}", .0.label())]
    Terminal(OrderStatus),
    #[error("cannot move order from {} to {}", .from.label(), .to.label())]
    Backwards { from: OrderStatus, to: OrderStatus },
    #[error("delivered orders need an actual delivery date and an inspection outcome")]
    MissingDeliveryOutcome,
}

/// Apply `update` to `order`. Progress only moves forward; cancellation is allowed from any
/// open state.
pub fn apply_update(
    order: &Order,
    update: &OrderStatusUpdate,
) -> Result<Order, OrderTransitionError> {
    if order.status.is_terminal() {
        return Err(OrderTransitionError::Terminal(order.status));
    }

    let mut next = order.clone();
    match update.status {
        OrderStatus::Cancelled => {}
        OrderStatus::Delivered => {
            let (Some(actual), Some(inspection)) = (update.actual_delivery, update.inspection)
            else {
                return Err(OrderTransitionError::MissingDeliveryOutcome);
            };
            next.actual_delivery = Some(actual);
            next.inspection = Some(inspection);
        }
        status if status <= order.status => {
            return Err(OrderTransitionError::Backwards {
                from: order.status,
                to: status,
            });
        }
        _ => {}
    }

    next.status = update.status;
    Ok(next)
}
