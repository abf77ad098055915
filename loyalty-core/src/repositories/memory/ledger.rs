// loyalty-core/src/repositories/memory/ledger.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use loyalty_common::error::Error;
use loyalty_common::models::{LedgerEntry, LedgerReference, TransactionType};
use loyalty_common::traits::repository_traits::LedgerRepository;

/// Append-only ledger over a shared entry log. A per-user mutex serializes
/// the balance check with the credit append, so two concurrent spends can
/// never both pass the check on the same points.
#[derive(Default)]
pub struct MemoryLedgerRepository {
    entries: Mutex<Vec<LedgerEntry>>,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
    next_id: AtomicI64,
}

impl MemoryLedgerRepository {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            user_locks: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn fold_balance(entries: &[LedgerEntry], user_id: &str) -> f64 {
        entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(LedgerEntry::signed_amount)
            .sum()
    }
}

fn check_amount(amount: f64) -> Result<(), Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::validation(
            "pointAmount",
            format!("amount {amount} must be a non-negative number"),
        ));
    }
    Ok(())
}

#[async_trait]
impl LedgerRepository for MemoryLedgerRepository {
    async fn record_debit(
        &self,
        user_id: &str,
        amount: f64,
        campaign_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        check_amount(amount)?;
        let entry = LedgerEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            point_amount: amount,
            transaction_type: TransactionType::Debit,
            transaction_date: at,
            reference: LedgerReference::Campaign(campaign_id),
            created_at: at,
        };
        self.entries.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn record_credit(
        &self,
        user_id: &str,
        amount: f64,
        promo_code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        check_amount(amount)?;

        let user_lock = self.lock_for(user_id);
        let _guard = user_lock.lock().await;

        let mut entries = self.entries.lock().await;
        let balance = Self::fold_balance(&entries, user_id);
        if balance < amount {
            return Err(Error::PointDeficit {
                user_id: user_id.to_string(),
                required: amount,
                balance,
            });
        }

        let entry = LedgerEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            point_amount: amount,
            transaction_type: TransactionType::Credit,
            transaction_date: at,
            reference: LedgerReference::PromoCode(promo_code_id),
            created_at: at,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn balance(&self, user_id: &str) -> Result<f64, Error> {
        let entries = self.entries.lock().await;
        Ok(Self::fold_balance(&entries, user_id))
    }

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>, Error> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}
