// File: loyalty-common/src/models/voucher.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::validator::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum VoucherStatus {
    Inactive = 0,
    Active = 1,
}

/// Promo code lifecycle state. Transitions only move forward:
/// Unbought -> Bought -> Redeemed, with Unbought|Bought -> Expired driven by
/// the status sweep once the voucher's window lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum CodeStatus {
    Unbought = 0,
    Bought = 1,
    Redeemed = 2,
    Expired = 3,
}

/// A redeemable reward item purchasable with points, backed by a fixed-stock
/// pool of promo codes.
///
/// Counter invariant: `available + bought + redeemed + expired == stock`,
/// with `stock` immutable after creation and `available` never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Price in points of one promo code.
    pub point_cost: i64,
    /// Number of promo codes minted at creation. Immutable.
    pub stock: i32,
    pub code_prefix: String,
    pub status: VoucherStatus,
    pub available: i32,
    pub bought: i32,
    pub redeemed: i32,
    pub expired: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    pub fn expired_by(&self, date: NaiveDate) -> bool {
        self.end_date < date
    }
}

/// One unit of voucher inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: i64,
    pub voucher_id: i64,
    pub code: String,
    pub status: CodeStatus,
    /// Owning user, set when the code is bought.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub bought_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin payload for voucher creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSpec {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_cost: i64,
    pub stock: i32,
    pub code_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
}
