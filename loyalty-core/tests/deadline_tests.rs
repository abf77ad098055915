// tests/deadline_tests.rs
//
// Operation-deadline behavior: a caller that times out must never strand a
// half-finished mutation. The compound writes run detached from the
// deadline, so the store always settles into a consistent state.

mod helpers;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;

use loyalty_common::error::Error;
use loyalty_common::models::{
    CodeStatus, LedgerEntry, PromoCode, TransactionType, Voucher, VoucherStatus,
};
use loyalty_common::traits::repository_traits::{LedgerRepository, VoucherRepository};
use loyalty_core::services::VoucherService;

use helpers::{core, grant_points, voucher_spec};

const SHORT_DEADLINE: Duration = Duration::from_millis(25);
const SLOW_CALL: Duration = Duration::from_millis(250);
const SETTLE_WAIT: Duration = Duration::from_millis(600);

/// Ledger that stalls every credit long past the service deadline.
struct SlowCreditLedger {
    inner: Arc<dyn LedgerRepository>,
}

#[async_trait]
impl LedgerRepository for SlowCreditLedger {
    async fn record_debit(
        &self,
        user_id: &str,
        amount: f64,
        campaign_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        self.inner.record_debit(user_id, amount, campaign_id, at).await
    }

    async fn record_credit(
        &self,
        user_id: &str,
        amount: f64,
        promo_code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        tokio::time::sleep(SLOW_CALL).await;
        self.inner
            .record_credit(user_id, amount, promo_code_id, at)
            .await
    }

    async fn balance(&self, user_id: &str) -> Result<f64, Error> {
        self.inner.balance(user_id).await
    }

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>, Error> {
        self.inner.entries_for_user(user_id).await
    }
}

/// Voucher store that stalls the code batch insert long past the deadline.
struct SlowMintVouchers {
    inner: Arc<dyn VoucherRepository>,
}

#[async_trait]
impl VoucherRepository for SlowMintVouchers {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<Voucher, Error> {
        self.inner.create_voucher(voucher).await
    }

    async fn insert_promo_codes(
        &self,
        voucher_id: i64,
        codes: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        tokio::time::sleep(SLOW_CALL).await;
        self.inner
            .insert_promo_codes(voucher_id, codes, created_at)
            .await
    }

    async fn delete_voucher(&self, id: i64) -> Result<(), Error> {
        self.inner.delete_voucher(id).await
    }

    async fn get_voucher(&self, id: i64) -> Result<Option<Voucher>, Error> {
        self.inner.get_voucher(id).await
    }

    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> Result<Vec<Voucher>, Error> {
        self.inner.list_vouchers(status).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: VoucherStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.inner.set_status(id, status, now).await
    }

    async fn claim_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        self.inner.claim_code(voucher_id, user_id, now).await
    }

    async fn release_code(&self, code_id: i64) -> Result<(), Error> {
        self.inner.release_code(code_id).await
    }

    async fn redeem_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        self.inner.redeem_code(voucher_id, user_id, now).await
    }

    async fn expire_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        self.inner.expire_ended(today, now).await
    }

    async fn codes_for_voucher(&self, voucher_id: i64) -> Result<Vec<PromoCode>, Error> {
        self.inner.codes_for_voucher(voucher_id).await
    }

    async fn codes_for_user(
        &self,
        user_id: &str,
        status: Option<CodeStatus>,
    ) -> Result<Vec<PromoCode>, Error> {
        self.inner.codes_for_user(user_id, status).await
    }
}

#[tokio::test]
async fn timed_out_buy_still_settles_the_purchase() {
    let base = core();
    let slow = Arc::new(SlowCreditLedger {
        inner: base.ledger.clone(),
    });
    let service = VoucherService::new(
        base.vouchers.clone(),
        slow,
        base.clock.clone(),
        SHORT_DEADLINE,
    );

    let voucher = service.create_voucher(&voucher_spec(3, 100)).await.unwrap();
    grant_points(&base, "alice", 1000.0).await;

    // The credit stalls past the deadline, so the caller sees a timeout...
    let err = service.buy(voucher.id, "alice").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));

    // ...but the detached purchase runs to completion: the claimed code and
    // its ledger credit land together, never one without the other.
    tokio::time::sleep(SETTLE_WAIT).await;

    assert_eq!(base.ledger.balance("alice").await.unwrap(), 900.0);
    let entries = base.ledger.entries_for_user("alice").await.unwrap();
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.transaction_type == TransactionType::Credit)
            .count(),
        1
    );

    let stored = base.vouchers.get_voucher(voucher.id).await.unwrap().unwrap();
    assert_eq!(stored.available, 2);
    assert_eq!(stored.bought, 1);
    let owned = base
        .vouchers
        .codes_for_user("alice", Some(CodeStatus::Bought))
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
}

#[tokio::test]
async fn timed_out_creation_still_mints_the_code_pool() {
    let base = core();
    let slow = Arc::new(SlowMintVouchers {
        inner: base.vouchers.clone(),
    });
    let service = VoucherService::new(
        slow,
        base.ledger.clone(),
        base.clock.clone(),
        SHORT_DEADLINE,
    );

    let err = service
        .create_voucher(&voucher_spec(3, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));

    // The detached creation finishes: no voucher row is ever left without
    // its promo codes.
    tokio::time::sleep(SETTLE_WAIT).await;

    let vouchers = base.vouchers.list_vouchers(None).await.unwrap();
    assert_eq!(vouchers.len(), 1);
    let codes = base
        .vouchers
        .codes_for_voucher(vouchers[0].id)
        .await
        .unwrap();
    assert_eq!(codes.len(), 3);
    assert!(codes.iter().all(|c| c.status == CodeStatus::Unbought));
    assert_eq!(vouchers[0].available, 3);
}
