// File: loyalty-common/src/models/ledger.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed effect of a ledger entry. Debit earns points, Credit spends them;
/// the amount itself is always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum TransactionType {
    Debit = 0,
    Credit = 1,
}

/// What a ledger entry points back to: the campaign that earned the points,
/// or the exact promo code they were spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum LedgerReference {
    Campaign(i64),
    PromoCode(i64),
}

/// An immutable point movement. Entries are append-only; corrections are new
/// offsetting entries, never updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    /// Magnitude of the movement, always >= 0.
    pub point_amount: f64,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub reference: LedgerReference,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Contribution of this entry to its user's balance.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Debit => self.point_amount,
            TransactionType::Credit => -self.point_amount,
        }
    }
}
