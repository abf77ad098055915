// File: loyalty-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Error;
use crate::models::campaign::{Campaign, CampaignStatus};
use crate::models::ledger::LedgerEntry;
use crate::models::voucher::{CodeStatus, PromoCode, Voucher, VoucherStatus};

/// Persistence contract for campaigns and their reward lists.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Insert a campaign (id on the input is ignored) together with its
    /// rewards; returns the stored row with its assigned id.
    async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign, Error>;

    /// Fetch one campaign with its validator and rewards loaded.
    async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, Error>;

    async fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>, Error>;

    /// Delete a campaign and its rewards.
    async fn delete_campaign(&self, id: i64) -> Result<(), Error>;

    /// Status sweep: flip campaigns whose start_date is `today` to Active.
    /// Idempotent; returns the number of rows changed.
    async fn activate_starting(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error>;

    /// Status sweep: flip campaigns whose end_date has passed to Inactive.
    /// Idempotent; returns the number of rows changed.
    async fn deactivate_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error>;
}

/// Persistence contract for vouchers and their promo-code inventory.
///
/// `claim_code`, `release_code` and `redeem_code` are the row-lock-equivalent
/// critical sections: implementations must make each of them atomic with
/// respect to concurrent calls for the same voucher.
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<Voucher, Error>;

    /// Bulk-insert the voucher's generated codes, all Unbought. All-or-nothing.
    async fn insert_promo_codes(
        &self,
        voucher_id: i64,
        codes: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Delete a voucher and any codes it owns (allocator compensation path).
    async fn delete_voucher(&self, id: i64) -> Result<(), Error>;

    async fn get_voucher(&self, id: i64) -> Result<Option<Voucher>, Error>;

    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> Result<Vec<Voucher>, Error>;

    async fn set_status(&self, id: i64, status: VoucherStatus, now: DateTime<Utc>)
        -> Result<(), Error>;

    /// Atomically claim one Unbought code for `user_id`: mark it Bought,
    /// stamp owner and bought timestamp, shift available/bought counters.
    /// Fails with `VoucherUnavailable` when no code is left.
    async fn claim_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error>;

    /// Revert a claim made by `claim_code` (ledger write failed): the code
    /// returns to Unbought with no owner and the counters shift back.
    async fn release_code(&self, code_id: i64) -> Result<(), Error>;

    /// Atomically redeem one of `user_id`'s Bought codes for this voucher.
    /// Fails with `NotFound` when the user holds none; an already-Redeemed
    /// code is never selected, so a duplicate redeem cannot double-count.
    async fn redeem_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error>;

    /// Status sweep: deactivate vouchers past their end_date and expire their
    /// remaining Unbought/Bought codes. Idempotent; returns codes expired.
    async fn expire_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error>;

    async fn codes_for_voucher(&self, voucher_id: i64) -> Result<Vec<PromoCode>, Error>;

    async fn codes_for_user(
        &self,
        user_id: &str,
        status: Option<CodeStatus>,
    ) -> Result<Vec<PromoCode>, Error>;
}

/// Append-only point ledger. Entries are never mutated or deleted.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append an earning entry referencing a campaign. `amount` must be >= 0.
    async fn record_debit(
        &self,
        user_id: &str,
        amount: f64,
        campaign_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error>;

    /// Append a spending entry referencing a promo code. `amount` must be
    /// >= 0, and the balance check plus the write happen in one atomic scope:
    /// a credit that would drive the balance negative fails with
    /// `PointDeficit` and writes nothing.
    async fn record_credit(
        &self,
        user_id: &str,
        amount: f64,
        promo_code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error>;

    /// Fold of all entries for the user: sum(debits) - sum(credits).
    async fn balance(&self, user_id: &str) -> Result<f64, Error>;

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>, Error>;
}
