use chrono::NaiveDate;

use super::domain::{QuoteRequest, QuoteRequestStatus};

/// Stored facts the request status is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFacts {
    pub responses: usize,
    pub invited: usize,
    pub today: NaiveDate,
    pub deadline: NaiveDate,
    pub approved: bool,
    pub cancelled: bool,
    pub review_opened: bool,
}

impl StatusFacts {
    pub fn for_request(request: &QuoteRequest, responses: usize, today: NaiveDate) -> Self {
        Self {
            responses,
            invited: request.supplier_ids.len(),
            today,
            deadline: request.deadline,
            approved: request.is_approved(),
            cancelled: request.is_cancelled(),
            review_opened: request.review_opened,
        }
    }
}

/// Pure status derivation; nothing here is persisted.
pub fn derive_status(facts: &StatusFacts) -> QuoteRequestStatus {
    if facts.cancelled {
        return QuoteRequestStatus::Cancelled;
    }
    if facts.approved {
        return QuoteRequestStatus::Approved;
    }
    if facts.today > facts.deadline {
        return QuoteRequestStatus::Expired;
    }
    if facts.responses >= facts.invited || facts.review_opened {
        return QuoteRequestStatus::Received;
    }
    if facts.responses > 0 {
        return QuoteRequestStatus::PartiallyResponded;
    }
    QuoteRequestStatus::Requested
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(responses: usize) -> StatusFacts {
        StatusFacts {
            responses,
            invited: 3,
            today: NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid"),
            deadline: NaiveDate::from_ymd_opt(2026, 5, 8).expect("valid"),
            approved: false,
            cancelled: false,
            review_opened: false,
        }
    }

    #[test]
    fn counts_drive_the_open_states() {
        assert_eq!(derive_status(&facts(0)), QuoteRequestStatus::Requested);
        assert_eq!(
            derive_status(&facts(2)),
            QuoteRequestStatus::PartiallyResponded
        );
        assert_eq!(derive_status(&facts(3)), QuoteRequestStatus::Received);
    }

    #[test]
    fn opening_the_comparison_marks_received_early() {
        let mut facts = facts(1);
        facts.review_opened = true;
        assert_eq!(derive_status(&facts), QuoteRequestStatus::Received);
    }

    #[test]
    fn deadline_day_is_still_open() {
        let mut facts = facts(1);
        facts.today = facts.deadline;
        assert_eq!(
            derive_status(&facts),
            QuoteRequestStatus::PartiallyResponded
        );
        facts.today = facts.deadline.succ_opt().expect("valid");
        assert_eq!(derive_status(&facts), QuoteRequestStatus::Expired);
    }

    #[test]
    fn explicit_outcomes_win_over_expiry() {
        let mut facts = facts(3);
        facts.today = facts.deadline.succ_opt().expect("valid");
        facts.approved = true;
        assert_eq!(derive_status(&facts), QuoteRequestStatus::Approved);
        facts.cancelled = true;
        assert_eq!(derive_status(&facts), QuoteRequestStatus::Cancelled);
    }
}
