//! Transaction types: the extracted candidate and the persisted record

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::catalog::{Category, PaymentMethod};
use crate::time::wall_clock;

/// Who sent a message. Opaque to extraction; carried only for attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: i64,
    pub username: Option<String>,
}

impl UserContext {
    pub fn new(user_id: i64, username: Option<String>) -> Self {
        Self { user_id, username }
    }
}

/// A structured transaction produced from one chat message, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    /// Whole currency units
    pub amount: u64,
    pub category: Category,
    pub note: String,
    pub payment_method: PaymentMethod,
    /// Local wall-clock time in the configured zone
    #[serde(with = "wall_clock")]
    pub occurred_at: NaiveDateTime,
}

/// Persistence and API shape. Field names are fixed for compatibility with the
/// query API and dashboard consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    /// Older bot builds posted this field as `message`
    #[serde(alias = "message")]
    pub note: String,
    #[serde(default)]
    pub category: Category,
    pub amount: u64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(with = "wall_clock")]
    pub created_at: NaiveDateTime,
}

impl TransactionRecord {
    pub fn from_candidate(candidate: &TransactionCandidate, user: &UserContext) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            note: candidate.note.clone(),
            category: candidate.category,
            amount: candidate.amount,
            payment_method: candidate.payment_method,
            created_at: candidate.occurred_at,
        }
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_candidate() -> TransactionCandidate {
        TransactionCandidate {
            amount: 25_000,
            category: Category::Food,
            note: "kopi susu".to_string(),
            payment_method: PaymentMethod::GoPay,
            occurred_at: NaiveDate::from_ymd_opt(2026, 2, 18)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_record_from_candidate() {
        let user = UserContext::new(42, Some("budi".to_string()));
        let record = TransactionRecord::from_candidate(&sample_candidate(), &user);
        assert_eq!(record.user_id, 42);
        assert_eq!(record.username.as_deref(), Some("budi"));
        assert_eq!(record.amount, 25_000);
        assert_eq!(record.created_on(), NaiveDate::from_ymd_opt(2026, 2, 18).unwrap());
    }

    #[test]
    fn test_record_wire_shape() {
        let user = UserContext::new(7, None);
        let record = TransactionRecord::from_candidate(&sample_candidate(), &user);
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "user_id": 7,
                "username": null,
                "note": "kopi susu",
                "category": "Food",
                "amount": 25000,
                "payment_method": "GoPay",
                "created_at": "2026-02-18 09:30:00"
            })
        );
    }

    #[test]
    fn test_record_accepts_legacy_message_field() {
        let record: TransactionRecord = serde_json::from_value(serde_json::json!({
            "user_id": 1,
            "username": "ani",
            "message": "parkir",
            "category": "transportasi",
            "amount": 5000,
            "payment_method": "tunai",
            "created_at": "2026-02-18 10:00"
        }))
        .unwrap();
        assert_eq!(record.note, "parkir");
        assert_eq!(record.category, Category::Transport);
        assert_eq!(record.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_record_rejects_negative_amount() {
        let res: Result<TransactionRecord, _> = serde_json::from_value(serde_json::json!({
            "user_id": 1,
            "note": "refund",
            "amount": -5000,
            "created_at": "2026-02-18 10:00:00"
        }));
        assert!(res.is_err());
    }
}
