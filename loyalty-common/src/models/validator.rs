// File: loyalty-common/src/models/validator.rs

use serde::{Deserialize, Serialize};

/// Admin-configured eligibility + reward rule, attached to a campaign or a
/// voucher and stored as a JSON column.
///
/// The string fields are substring-match criteria; `multiplier`, `value` and
/// `formula` are reward-computation inputs and never matched against the
/// request. Empty/unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Validator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Device name the user transacted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Minimum transaction amount, kept as the admin entered it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Validator {
    /// Resolve a formula variable against this validator snapshot.
    ///
    /// This is the statically enumerated field table that replaces runtime
    /// struct inspection: every name the formula language may reference is
    /// listed here, and nothing else resolves.
    pub fn numeric_field(&self, name: &str) -> Option<f64> {
        match name {
            "multiplier" => self.multiplier,
            "value" => self.value.map(|v| v as f64),
            "minimalTransaction" => self
                .minimal_transaction
                .as_deref()
                .and_then(|s| s.parse::<f64>().ok()),
            _ => None,
        }
    }
}

/// The incoming transaction's attributes, matched against a [`Validator`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Payload for transaction validation / reward accrual.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub transaction_amount: f64,
    pub attributes: TransactionAttributes,
}
