// loyalty-core/src/repositories/postgres/vouchers.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use loyalty_common::error::Error;
use loyalty_common::models::{CodeStatus, PromoCode, Validator, Voucher, VoucherStatus};
use loyalty_common::traits::repository_traits::VoucherRepository;

pub struct PostgresVoucherRepository {
    pub pool: Pool<Postgres>,
}

const VOUCHER_COLUMNS: &str = "id, name, description, start_date, end_date, point_cost, stock, \
     code_prefix, status, available, bought, redeemed, expired, validator, updated_at, created_at";

const CODE_COLUMNS: &str =
    "id, voucher_id, code, status, user_id, bought_at, redeemed_at, created_at";

impl PostgresVoucherRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn voucher_from_row(row: &sqlx::postgres::PgRow) -> Result<Voucher, Error> {
        let validator: Option<serde_json::Value> = row.try_get("validator")?;
        let validator: Option<Validator> = match validator {
            Some(v) => Some(serde_json::from_value(v)?),
            None => None,
        };

        Ok(Voucher {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            point_cost: row.try_get("point_cost")?,
            stock: row.try_get("stock")?,
            code_prefix: row.try_get("code_prefix")?,
            status: row.try_get("status")?,
            available: row.try_get("available")?,
            bought: row.try_get("bought")?,
            redeemed: row.try_get("redeemed")?,
            expired: row.try_get("expired")?,
            validator,
            updated_at: row.try_get("updated_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn code_from_row(row: &sqlx::postgres::PgRow) -> Result<PromoCode, Error> {
        Ok(PromoCode {
            id: row.try_get("id")?,
            voucher_id: row.try_get("voucher_id")?,
            code: row.try_get("code")?,
            status: row.try_get("status")?,
            user_id: row.try_get("user_id")?,
            bought_at: row.try_get("bought_at")?,
            redeemed_at: row.try_get("redeemed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl VoucherRepository for PostgresVoucherRepository {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<Voucher, Error> {
        let validator_json = voucher
            .validator
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = sqlx::query(
            r#"
            INSERT INTO vouchers (
                name, description, start_date, end_date, point_cost, stock,
                code_prefix, status, available, bought, redeemed, expired,
                validator, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&voucher.name)
        .bind(&voucher.description)
        .bind(voucher.start_date)
        .bind(voucher.end_date)
        .bind(voucher.point_cost)
        .bind(voucher.stock)
        .bind(&voucher.code_prefix)
        .bind(voucher.status)
        .bind(voucher.available)
        .bind(voucher.bought)
        .bind(voucher.redeemed)
        .bind(voucher.expired)
        .bind(validator_json)
        .bind(voucher.created_at)
        .fetch_one(&self.pool)
        .await?;

        let mut stored = voucher.clone();
        stored.id = row.try_get("id")?;
        Ok(stored)
    }

    async fn insert_promo_codes(
        &self,
        voucher_id: i64,
        codes: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        // One statement, one implicit transaction: either every code of the
        // batch lands or none does.
        sqlx::query(
            r#"
            INSERT INTO promo_codes (voucher_id, code, status, created_at)
            SELECT $1, c.code, $3, $4
            FROM UNNEST($2::text[]) AS c(code)
            "#,
        )
        .bind(voucher_id)
        .bind(codes)
        .bind(CodeStatus::Unbought)
        .bind(created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_voucher(&self, id: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM promo_codes WHERE voucher_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vouchers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_voucher(&self, id: i64) -> Result<Option<Voucher>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::voucher_from_row(&r)).transpose()
    }

    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> Result<Vec<Voucher>, Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {VOUCHER_COLUMNS} FROM vouchers ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::voucher_from_row).collect()
    }

    async fn set_status(
        &self,
        id: i64,
        status: VoucherStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result = sqlx::query("UPDATE vouchers SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("voucher {id}")));
        }
        Ok(())
    }

    async fn claim_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        let mut tx = self.pool.begin().await?;

        // Conditional counter shift first: the `available > 0` guard is the
        // compare-and-swap that serializes concurrent buys.
        let shifted = sqlx::query(
            r#"
            UPDATE vouchers
            SET available = available - 1, bought = bought + 1, updated_at = $2
            WHERE id = $1 AND available > 0
            "#,
        )
        .bind(voucher_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if shifted.rows_affected() == 0 {
            drop(tx);
            let exists = sqlx::query("SELECT 1 FROM vouchers WHERE id = $1")
                .bind(voucher_id)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
            return Err(if exists {
                Error::VoucherUnavailable(voucher_id)
            } else {
                Error::NotFound(format!("voucher {voucher_id}"))
            });
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE promo_codes
            SET status = $3, user_id = $4, bought_at = $5
            WHERE id = (
                SELECT id FROM promo_codes
                WHERE voucher_id = $1 AND status = $2
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {CODE_COLUMNS}
            "#
        ))
        .bind(voucher_id)
        .bind(CodeStatus::Unbought)
        .bind(CodeStatus::Bought)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            // Rolls back the counter shift.
            drop(tx);
            return Err(Error::Integrity(format!(
                "voucher {voucher_id} reports availability but has no unbought code"
            )));
        };

        let code = Self::code_from_row(&row)?;
        tx.commit().await?;
        Ok(code)
    }

    async fn release_code(&self, code_id: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE promo_codes
            SET status = $2, user_id = NULL, bought_at = NULL
            WHERE id = $1 AND status = $3
            RETURNING voucher_id
            "#,
        )
        .bind(code_id)
        .bind(CodeStatus::Unbought)
        .bind(CodeStatus::Bought)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            drop(tx);
            return Err(Error::Integrity(format!(
                "promo code {code_id} is not in the bought state"
            )));
        };
        let voucher_id: i64 = row.try_get("voucher_id")?;

        sqlx::query(
            "UPDATE vouchers SET available = available + 1, bought = bought - 1 WHERE id = $1",
        )
        .bind(voucher_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn redeem_code(
        &self,
        voucher_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE promo_codes
            SET status = $4, redeemed_at = $5
            WHERE id = (
                SELECT id FROM promo_codes
                WHERE voucher_id = $1 AND user_id = $2 AND status = $3
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {CODE_COLUMNS}
            "#
        ))
        .bind(voucher_id)
        .bind(user_id)
        .bind(CodeStatus::Bought)
        .bind(CodeStatus::Redeemed)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            drop(tx);
            return Err(Error::NotFound(format!(
                "no bought promo code of voucher {voucher_id} for user '{user_id}'"
            )));
        };

        sqlx::query(
            "UPDATE vouchers SET bought = bought - 1, redeemed = redeemed + 1, updated_at = $2 WHERE id = $1",
        )
        .bind(voucher_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let code = Self::code_from_row(&row)?;
        tx.commit().await?;
        Ok(code)
    }

    async fn expire_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE promo_codes pc
            SET status = $2
            FROM vouchers v
            WHERE pc.voucher_id = v.id
              AND v.end_date < $1
              AND pc.status IN ($3, $4)
            "#,
        )
        .bind(today)
        .bind(CodeStatus::Expired)
        .bind(CodeStatus::Unbought)
        .bind(CodeStatus::Bought)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE vouchers v
            SET status = $2,
                updated_at = $3,
                expired = v.expired + v.available + v.bought,
                available = 0,
                bought = 0
            WHERE v.end_date < $1 AND (v.available > 0 OR v.bought > 0 OR v.status = $4)
            "#,
        )
        .bind(today)
        .bind(VoucherStatus::Inactive)
        .bind(now)
        .bind(VoucherStatus::Active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(flipped.rows_affected())
    }

    async fn codes_for_voucher(&self, voucher_id: i64) -> Result<Vec<PromoCode>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {CODE_COLUMNS} FROM promo_codes WHERE voucher_id = $1 ORDER BY id"
        ))
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::code_from_row).collect()
    }

    async fn codes_for_user(
        &self,
        user_id: &str,
        status: Option<CodeStatus>,
    ) -> Result<Vec<PromoCode>, Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {CODE_COLUMNS} FROM promo_codes WHERE user_id = $1 AND status = $2 ORDER BY id"
                ))
                .bind(user_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CODE_COLUMNS} FROM promo_codes WHERE user_id = $1 ORDER BY id"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::code_from_row).collect()
    }
}
