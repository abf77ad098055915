// loyalty-core/src/repositories/postgres/ledger.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use loyalty_common::error::Error;
use loyalty_common::models::{LedgerEntry, LedgerReference, TransactionType};
use loyalty_common::traits::repository_traits::LedgerRepository;

pub struct PostgresLedgerRepository {
    pub pool: Pool<Postgres>,
}

const BALANCE_SQL: &str = r#"
    SELECT COALESCE(SUM(
        CASE WHEN transaction_type = 0 THEN point_amount ELSE -point_amount END
    ), 0)::double precision AS balance
    FROM campaign_transactions
    WHERE user_id = $1
"#;

impl PostgresLedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn entry_from_row(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry, Error> {
        let campaign_id: Option<i64> = row.try_get("campaign_id")?;
        let promo_code_id: Option<i64> = row.try_get("promo_code_id")?;
        let id: i64 = row.try_get("id")?;

        let reference = match (campaign_id, promo_code_id) {
            (Some(c), None) => LedgerReference::Campaign(c),
            (None, Some(p)) => LedgerReference::PromoCode(p),
            _ => {
                return Err(Error::Integrity(format!(
                    "ledger entry {id} has an ambiguous reference"
                )));
            }
        };

        Ok(LedgerEntry {
            id,
            user_id: row.try_get("user_id")?,
            point_amount: row.try_get("point_amount")?,
            transaction_type: row.try_get("transaction_type")?,
            transaction_date: row.try_get("transaction_date")?,
            reference,
            created_at: row.try_get("created_at")?,
        })
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
impl LedgerRepository for PostgresLedgerRepository {
    async fn record_debit(
        &self,
        user_id: &str,
        amount: f64,
        campaign_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        check_amount(amount)?;

        let row = sqlx::query(
            r#"
            INSERT INTO campaign_transactions
                (user_id, point_amount, transaction_type, transaction_date, campaign_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(TransactionType::Debit)
        .bind(at)
        .bind(campaign_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerEntry {
            id: row.try_get("id")?,
            user_id: user_id.to_string(),
            point_amount: amount,
            transaction_type: TransactionType::Debit,
            transaction_date: at,
            reference: LedgerReference::Campaign(campaign_id),
            created_at: at,
        })
    }

    async fn record_credit(
        &self,
        user_id: &str,
        amount: f64,
        promo_code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, Error> {
        check_amount(amount)?;

        let mut tx = self.pool.begin().await?;

        // Transaction-scoped advisory lock keyed on the user: the balance
        // read and the insert below are atomic with respect to any other
        // credit for the same user.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(BALANCE_SQL)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        let balance: f64 = row.try_get("balance")?;

        if balance < amount {
            drop(tx);
            return Err(Error::PointDeficit {
                user_id: user_id.to_string(),
                required: amount,
                balance,
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO campaign_transactions
                (user_id, point_amount, transaction_type, transaction_date, promo_code_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(TransactionType::Credit)
        .bind(at)
        .bind(promo_code_id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;

        tx.commit().await?;

        Ok(LedgerEntry {
            id,
            user_id: user_id.to_string(),
            point_amount: amount,
            transaction_type: TransactionType::Credit,
            transaction_date: at,
            reference: LedgerReference::PromoCode(promo_code_id),
            created_at: at,
        })
    }

    async fn balance(&self, user_id: &str) -> Result<f64, Error> {
        let row = sqlx::query(BALANCE_SQL)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("balance")?)
    }

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, point_amount, transaction_type, transaction_date,
                   campaign_id, promo_code_id, created_at
            FROM campaign_transactions
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::entry_from_row).collect()
    }
}
