// loyalty-core/src/repositories/memory/vouchers.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use loyalty_common::error::Error;
use loyalty_common::models::{CodeStatus, PromoCode, Voucher, VoucherStatus};
use loyalty_common::traits::repository_traits::VoucherRepository;

#[derive(Default)]
pub struct MemoryVoucherRepository {
    vouchers: DashMap<i64, Voucher>,
    codes: DashMap<i64, PromoCode>,
    /// One lock per voucher; every counter/code mutation for a voucher runs
    /// under its lock, the in-memory equivalent of a row lock.
    locks: DashMap<i64, Arc<Mutex<()>>>,
    next_voucher_id: AtomicI64,
    next_code_id: AtomicI64,
}

impl MemoryVoucherRepository {
    pub fn new() -> Self {
        Self {
            vouchers: DashMap::new(),
            codes: DashMap::new(),
            locks: DashMap::new(),
            next_voucher_id: AtomicI64::new(1),
            next_code_id: AtomicI64::new(1),
        }
    }

    fn lock_for(&self, voucher_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(voucher_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl VoucherRepository for MemoryVoucherRepository {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<Voucher, Error> {
        let id = self.next_voucher_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = voucher.clone();
        stored.id = id;
        self.vouchers.insert(id, stored.clone());
        Ok(stored)
    }

    async fn insert_promo_codes(
        &self,
        voucher_id: i64,
        codes: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if !self.vouchers.contains_key(&voucher_id) {
            return Err(Error::NotFound(format!("voucher {voucher_id}")));
        }
        for code in codes {
            let id = self.next_code_id.fetch_add(1, Ordering::SeqCst);
            self.codes.insert(
                id,
                PromoCode {
                    id,
                    voucher_id,
                    code: code.clone(),
                    status: CodeStatus::Unbought,
                    user_id: None,
                    bought_at: None,
                    redeemed_at: None,
                    created_at,
                },
            );
        }
        Ok(())
    }

    async fn delete_voucher(&self, id: i64) -> Result<(), Error> {
        self.vouchers.remove(&id);
        self.codes.retain(|_, code| code.voucher_id != id);
        Ok(())
    }

    async fn get_voucher(&self, id: i64) -> Result<Option<Voucher>, Error> {
        Ok(self.vouchers.get(&id).map(|v| v.clone()))
    }

    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> Result<Vec<Voucher>, Error> {
        let mut out: Vec<Voucher> = self
            .vouchers
            .iter()
            .filter(|v| status.is_none_or(|s| v.status == s))
            .map(|v| v.clone())
            .collect();
        out.sort_by_key(|v| v.id);
        Ok(out)
    }

    async fn set_status(
        &self,
        id: i64,
        status: VoucherStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut voucher = self
            .vouchers
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("voucher {id}")))?;
        voucher.status = status;
        voucher.updated_at = Some(now);
        Ok(())
    }

    async fn claim_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        let lock = self.lock_for(voucher_id);
        let _guard = lock.lock().await;

        {
            let voucher = self
                .vouchers
                .get(&voucher_id)
                .ok_or_else(|| Error::NotFound(format!("voucher {voucher_id}")))?;
            if voucher.available <= 0 {
                return Err(Error::VoucherUnavailable(voucher_id));
            }
        }

        let candidate = self
            .codes
            .iter()
            .find(|c| c.voucher_id == voucher_id && c.status == CodeStatus::Unbought)
            .map(|c| c.id);
        let Some(code_id) = candidate else {
            // The counter said one was left; the code pool disagrees.
            return Err(Error::Integrity(format!(
                "voucher {voucher_id} reports availability but has no unbought code"
            )));
        };

        let claimed = {
            let mut code = self.codes.get_mut(&code_id).ok_or_else(|| {
                Error::Integrity(format!("promo code {code_id} vanished during claim"))
            })?;
            code.status = CodeStatus::Bought;
            code.user_id = Some(user_id.to_string());
            code.bought_at = Some(now);
            code.clone()
        };

        if let Some(mut voucher) = self.vouchers.get_mut(&voucher_id) {
            voucher.available -= 1;
            voucher.bought += 1;
            voucher.updated_at = Some(now);
        }

        Ok(claimed)
    }

    async fn release_code(&self, code_id: i64) -> Result<(), Error> {
        let voucher_id = self
            .codes
            .get(&code_id)
            .map(|c| c.voucher_id)
            .ok_or_else(|| Error::NotFound(format!("promo code {code_id}")))?;

        let lock = self.lock_for(voucher_id);
        let _guard = lock.lock().await;

        {
            let mut code = self
                .codes
                .get_mut(&code_id)
                .ok_or_else(|| Error::NotFound(format!("promo code {code_id}")))?;
            if code.status != CodeStatus::Bought {
                return Err(Error::Integrity(format!(
                    "promo code {code_id} is not in the bought state"
                )));
            }
            code.status = CodeStatus::Unbought;
            code.user_id = None;
            code.bought_at = None;
        }

        if let Some(mut voucher) = self.vouchers.get_mut(&voucher_id) {
            voucher.available += 1;
            voucher.bought -= 1;
        }

        Ok(())
    }

    async fn redeem_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        let lock = self.lock_for(voucher_id);
        let _guard = lock.lock().await;

        let candidate = self
            .codes
            .iter()
            .find(|c| {
                c.voucher_id == voucher_id
                    && c.status == CodeStatus::Bought
                    && c.user_id.as_deref() == Some(user_id)
            })
            .map(|c| c.id);
        let Some(code_id) = candidate else {
            return Err(Error::NotFound(format!(
                "no bought promo code of voucher {voucher_id} for user '{user_id}'"
            )));
        };

        let redeemed = {
            let mut code = self.codes.get_mut(&code_id).ok_or_else(|| {
                Error::Integrity(format!("promo code {code_id} vanished during redeem"))
            })?;
            code.status = CodeStatus::Redeemed;
            code.redeemed_at = Some(now);
            code.clone()
        };

        if let Some(mut voucher) = self.vouchers.get_mut(&voucher_id) {
            voucher.bought -= 1;
            voucher.redeemed += 1;
            voucher.updated_at = Some(now);
        }

        Ok(redeemed)
    }

    async fn expire_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let ended: Vec<i64> = self
            .vouchers
            .iter()
            .filter(|v| v.end_date < today)
            .map(|v| v.id)
            .collect();

        let mut expired_codes = 0u64;
        for voucher_id in ended {
            let lock = self.lock_for(voucher_id);
            let _guard = lock.lock().await;

            let mut flipped = 0i32;
            for mut code in self.codes.iter_mut() {
                if code.voucher_id == voucher_id
                    && matches!(code.status, CodeStatus::Unbought | CodeStatus::Bought)
                {
                    code.status = CodeStatus::Expired;
                    flipped += 1;
                }
            }

            if let Some(mut voucher) = self.vouchers.get_mut(&voucher_id) {
                voucher.status = VoucherStatus::Inactive;
                voucher.expired += voucher.available + voucher.bought;
                voucher.available = 0;
                voucher.bought = 0;
                voucher.updated_at = Some(now);
            }
            expired_codes += flipped as u64;
        }

        Ok(expired_codes)
    }

    async fn codes_for_voucher(&self, voucher_id: i64) -> Result<Vec<PromoCode>, Error> {
        let mut out: Vec<PromoCode> = self
            .codes
            .iter()
            .filter(|c| c.voucher_id == voucher_id)
            .map(|c| c.clone())
            .collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    async fn codes_for_user(
        &self,
        user_id: &str,
        status: Option<CodeStatus>,
    ) -> Result<Vec<PromoCode>, Error> {
        let mut out: Vec<PromoCode> = self
            .codes
            .iter()
            .filter(|c| {
                c.user_id.as_deref() == Some(user_id) && status.is_none_or(|s| c.status == s)
            })
            .map(|c| c.clone())
            .collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }
}
