// loyalty-core/src/services/voucher_service.rs
//
// Voucher lifecycle use cases: creation with code allocation, buy, redeem,
// status administration. The configured deadline bounds how long a caller
// waits; the compound mutations (create, buy) run on detached tasks so their
// compensating writes complete even when the caller has timed out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{error, info, warn};

use loyalty_common::error::Error;
use loyalty_common::models::{CodeStatus, PromoCode, Voucher, VoucherSpec, VoucherStatus};
use loyalty_common::traits::clock::Clock;
use loyalty_common::traits::repository_traits::{LedgerRepository, VoucherRepository};

use crate::services::{codes, run_to_deadline};

pub struct VoucherService {
    vouchers: Arc<dyn VoucherRepository>,
    ledger: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    op_timeout: Duration,
}

impl VoucherService {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        ledger: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            vouchers,
            ledger,
            clock,
            op_timeout,
        }
    }

    /// Create a voucher and mint its full promo-code pool, all Unbought.
    /// All-or-nothing: if the code batch cannot be persisted, the voucher
    /// row is deleted again.
    pub async fn create_voucher(&self, spec: &VoucherSpec) -> Result<Voucher, Error> {
        let vouchers = self.vouchers.clone();
        let clock = self.clock.clone();
        let spec = spec.clone();
        run_to_deadline(
            self.op_timeout,
            tokio::spawn(async move { Self::create_voucher_task(vouchers, clock, spec).await }),
        )
        .await
    }

    async fn create_voucher_task(
        vouchers: Arc<dyn VoucherRepository>,
        clock: Arc<dyn Clock>,
        spec: VoucherSpec,
    ) -> Result<Voucher, Error> {
        if spec.end_date < spec.start_date {
            return Err(Error::validation(
                "endDate",
                "end date precedes start date",
            ));
        }
        if spec.point_cost < 0 {
            return Err(Error::validation(
                "pointCost",
                format!("point cost {} must not be negative", spec.point_cost),
            ));
        }

        let generated = codes::generate_codes(spec.stock, &spec.code_prefix)?;
        let now = clock.now();
        let today = clock.today();

        let status = if spec.start_date <= today && today <= spec.end_date {
            VoucherStatus::Active
        } else {
            VoucherStatus::Inactive
        };

        let voucher = Voucher {
            id: 0,
            name: spec.name.clone(),
            description: spec.description.clone(),
            start_date: spec.start_date,
            end_date: spec.end_date,
            point_cost: spec.point_cost,
            stock: spec.stock,
            code_prefix: spec.code_prefix.clone(),
            status,
            available: spec.stock,
            bought: 0,
            redeemed: 0,
            expired: 0,
            validator: spec.validator.clone(),
            updated_at: None,
            created_at: now,
        };

        let stored = vouchers.create_voucher(&voucher).await?;

        if let Err(err) = vouchers.insert_promo_codes(stored.id, &generated, now).await {
            warn!(voucher_id = stored.id, %err, "code allocation failed, rolling back voucher");
            if vouchers.delete_voucher(stored.id).await.is_err() {
                // One retry, then give up loudly.
                if let Err(del_err) = vouchers.delete_voucher(stored.id).await {
                    error!(voucher_id = stored.id, %del_err, "compensating delete failed");
                    return Err(Error::Integrity(format!(
                        "voucher {} exists without its promo codes: {del_err}",
                        stored.id
                    )));
                }
            }
            return Err(err);
        }

        info!(voucher_id = stored.id, stock = stored.stock, "voucher created");
        Ok(stored)
    }

    /// Buy one unit of the voucher for `user_id`, spending its point cost.
    pub async fn buy(&self, voucher_id: i64, user_id: &str) -> Result<PromoCode, Error> {
        let vouchers = self.vouchers.clone();
        let ledger = self.ledger.clone();
        let clock = self.clock.clone();
        let user_id = user_id.to_string();
        run_to_deadline(
            self.op_timeout,
            tokio::spawn(async move {
                Self::buy_task(vouchers, ledger, clock, voucher_id, user_id).await
            }),
        )
        .await
    }

    async fn buy_task(
        vouchers: Arc<dyn VoucherRepository>,
        ledger: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        voucher_id: i64,
        user_id: String,
    ) -> Result<PromoCode, Error> {
        let voucher = vouchers
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("voucher {voucher_id}")))?;

        if voucher.expired_by(clock.today()) {
            return Err(Error::VoucherExpired(voucher_id));
        }
        if voucher.available <= 0 {
            return Err(Error::VoucherUnavailable(voucher_id));
        }

        // Early rejection on an obviously short balance; the authoritative
        // check happens inside record_credit's lock scope.
        let balance = ledger.balance(&user_id).await?;
        let cost = voucher.point_cost as f64;
        if balance < cost {
            return Err(Error::PointDeficit {
                user_id,
                required: cost,
                balance,
            });
        }

        let now = clock.now();
        let code = vouchers.claim_code(voucher_id, &user_id, now).await?;

        match ledger.record_credit(&user_id, cost, code.id, now).await {
            Ok(_) => {
                info!(voucher_id, user_id = %user_id, code = %code.code, "voucher bought");
                Ok(code)
            }
            Err(err) => {
                // Points were not spent; the claimed code must go back.
                if let Err(release_err) = vouchers.release_code(code.id).await {
                    error!(code_id = code.id, %release_err, "claim reversion failed");
                    return Err(Error::Integrity(format!(
                        "promo code {} is bought without a ledger entry: {release_err}",
                        code.id
                    )));
                }
                Err(err)
            }
        }
    }

    /// Redeem one of the user's bought codes for this voucher.
    pub async fn redeem(&self, voucher_id: i64, user_id: &str) -> Result<PromoCode, Error> {
        timeout(self.op_timeout, async {
            let now = self.clock.now();
            let code = self.vouchers.redeem_code(voucher_id, user_id, now).await?;
            info!(voucher_id, user_id, code = %code.code, "voucher redeemed");
            Ok(code)
        })
        .await?
    }

    pub async fn update_status(&self, voucher_id: i64, status: VoucherStatus) -> Result<(), Error> {
        timeout(self.op_timeout, async {
            self.vouchers
                .set_status(voucher_id, status, self.clock.now())
                .await
        })
        .await?
    }

    pub async fn get_voucher(&self, voucher_id: i64) -> Result<Option<Voucher>, Error> {
        timeout(self.op_timeout, self.vouchers.get_voucher(voucher_id)).await?
    }

    pub async fn list_vouchers(&self, status: Option<VoucherStatus>) -> Result<Vec<Voucher>, Error> {
        timeout(self.op_timeout, self.vouchers.list_vouchers(status)).await?
    }

    /// A user's promo codes, optionally narrowed to one lifecycle state.
    pub async fn user_codes(
        &self,
        user_id: &str,
        status: Option<CodeStatus>,
    ) -> Result<Vec<PromoCode>, Error> {
        timeout(self.op_timeout, self.vouchers.codes_for_user(user_id, status)).await?
    }
}
