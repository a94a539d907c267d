//! Bearer tokens for the unauthenticated supplier quote form.
//!
//! A token is 256 random bits, hex encoded, bound to one (request, supplier) pair. Only its
//! SHA-256 digest is persisted. Validity has no stored flag: a token is good while the request
//! deadline has not passed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::{QuoteRequest, QuoteRequestId, SupplierId};

const TOKEN_BYTES: usize = 32;

/// Plaintext token. Handed out once at issue time and never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDigest(String);

impl TokenDigest {
    pub fn of(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.trim().as_bytes())))
    }

    fn matches(&self, other: &TokenDigest) -> bool {
        let (left, right) = (self.0.as_bytes(), other.0.as_bytes());
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// Stored half of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub request_id: QuoteRequestId,
    pub supplier_id: SupplierId,
    pub digest: TokenDigest,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("supplier is not invited to this request")]
    InvalidParticipant,
    #[error("access token is invalid")]
    InvalidToken,
    #[error("access token has expired")]
    Expired,
}

/// Mint a fresh token for an invited supplier. Re-issuing replaces the previous grant.
pub fn issue(
    request: &QuoteRequest,
    supplier_id: &SupplierId,
    issued_at: DateTime<Utc>,
) -> Result<(AccessToken, TokenGrant), TokenError> {
    if !request.invites(supplier_id) {
        return Err(TokenError::InvalidParticipant);
    }

    let token = AccessToken::generate();
    let grant = TokenGrant {
        request_id: request.id.clone(),
        supplier_id: supplier_id.clone(),
        digest: TokenDigest::of(token.as_str()),
        issued_at,
    };
    Ok((token, grant))
}

/// Check a presented token. The token match is decided before expiry so that an unknown pair
/// and a wrong token are indistinguishable from the outside.
pub fn validate(
    request: Option<&QuoteRequest>,
    grant: Option<&TokenGrant>,
    supplier_id: &SupplierId,
    presented: &str,
    today: NaiveDate,
) -> Result<(), TokenError> {
    let (request, grant) = match (request, grant) {
        (Some(request), Some(grant)) => (request, grant),
        _ => return Err(TokenError::InvalidToken),
    };

    if grant.request_id != request.id
        || &grant.supplier_id != supplier_id
        || !request.invites(supplier_id)
        || !grant.digest.matches(&TokenDigest::of(presented))
    {
        return Err(TokenError::InvalidToken);
    }

    if request.is_past_deadline(today) {
        return Err(TokenError::Expired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rfq::domain::PartId;

    fn request(deadline: NaiveDate) -> QuoteRequest {
        QuoteRequest {
            id: QuoteRequestId::new("rfq-1"),
            part_id: PartId::new("part-1"),
            manufacturing_method: "3001".to_string(),
            supplier_ids: vec![SupplierId::new("sup-a"), SupplierId::new("sup-b")],
            deadline,
            notes: None,
            created_at: Utc::now(),
            approved_order: None,
            cancelled_at: None,
            review_opened: false,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    #[test]
    fn tokens_are_long_random_and_distinct() {
        let request = request(date(20));
        let supplier = SupplierId::new("sup-a");
        let (first, _) = issue(&request, &supplier, Utc::now()).expect("issued");
        let (second, _) = issue(&request, &supplier, Utc::now()).expect("issued");

        assert_eq!(first.as_str().len(), TOKEN_BYTES * 2);
        assert_ne!(first, second);
        assert!(!format!("{first:?}").contains(first.as_str()));
    }

    #[test]
    fn issue_rejects_suppliers_outside_the_invitation() {
        let request = request(date(20));
        assert_eq!(
            issue(&request, &SupplierId::new("sup-z"), Utc::now()).map(|_| ()),
            Err(TokenError::InvalidParticipant)
        );
    }

    #[test]
    fn validate_accepts_through_the_deadline_day() {
        let request = request(date(20));
        let supplier = SupplierId::new("sup-a");
        let (token, grant) = issue(&request, &supplier, Utc::now()).expect("issued");

        assert_eq!(
            validate(Some(&request), Some(&grant), &supplier, token.as_str(), date(20)),
            Ok(())
        );
        assert_eq!(
            validate(Some(&request), Some(&grant), &supplier, token.as_str(), date(21)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wrong_token_beats_expiry() {
        let request = request(date(20));
        let supplier = SupplierId::new("sup-a");
        let (_, grant) = issue(&request, &supplier, Utc::now()).expect("issued");

        assert_eq!(
            validate(Some(&request), Some(&grant), &supplier, "guess", date(25)),
            Err(TokenError::InvalidToken)
        );
        assert_eq!(
            validate(Some(&request), None, &supplier, "guess", date(1)),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn token_for_one_supplier_does_not_open_another() {
        let request = request(date(20));
        let supplier_a = SupplierId::new("sup-a");
        let (token, grant) = issue(&request, &supplier_a, Utc::now()).expect("issued");

        assert_eq!(
            validate(
                Some(&request),
                Some(&grant),
                &SupplierId::new("sup-b"),
                token.as_str(),
                date(10)
            ),
            Err(TokenError::InvalidToken)
        );
    }
}
