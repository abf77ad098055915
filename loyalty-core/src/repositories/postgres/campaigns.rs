// loyalty-core/src/repositories/postgres/campaigns.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use loyalty_common::error::Error;
use loyalty_common::models::{Campaign, CampaignStatus, Reward, Validator};
use loyalty_common::traits::repository_traits::CampaignRepository;

pub struct PostgresCampaignRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresCampaignRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn rewards_for(&self, campaign_id: i64) -> Result<Vec<Reward>, Error> {
        let rewards = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, campaign_id, name, description
            FROM rewards
            WHERE campaign_id = $1
            ORDER BY id
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rewards)
    }

    fn campaign_from_row(row: &sqlx::postgres::PgRow) -> Result<Campaign, Error> {
        let validator: Option<serde_json::Value> = row.try_get("validator")?;
        let validator: Option<Validator> = match validator {
            Some(v) => Some(serde_json::from_value(v)?),
            None => None,
        };

        Ok(Campaign {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            status: row.try_get("status")?,
            validator,
            rewards: Vec::new(),
            updated_at: row.try_get("updated_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const CAMPAIGN_COLUMNS: &str =
    "id, name, description, start_date, end_date, status, validator, updated_at, created_at";

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign, Error> {
        let validator_json = campaign
            .validator
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO campaigns (name, description, start_date, end_date, status, validator, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&campaign.name)
        .bind(&campaign.description)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.status)
        .bind(validator_json)
        .bind(campaign.created_at)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;

        let mut rewards = Vec::with_capacity(campaign.rewards.len());
        for reward in &campaign.rewards {
            let row = sqlx::query(
                r#"
                INSERT INTO rewards (campaign_id, name, description)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(&reward.name)
            .bind(&reward.description)
            .fetch_one(&mut *tx)
            .await?;
            rewards.push(Reward {
                id: row.try_get("id")?,
                campaign_id: id,
                name: reward.name.clone(),
                description: reward.description.clone(),
            });
        }

        tx.commit().await?;

        let mut stored = campaign.clone();
        stored.id = id;
        stored.rewards = rewards;
        Ok(stored)
    }

    async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut campaign = Self::campaign_from_row(&row)?;
        campaign.rewards = self.rewards_for(campaign.id).await?;
        Ok(Some(campaign))
    }

    async fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>, Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut campaign = Self::campaign_from_row(row)?;
            campaign.rewards = self.rewards_for(campaign.id).await?;
            out.push(campaign);
        }
        Ok(out)
    }

    async fn delete_campaign(&self, id: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM rewards WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn activate_starting(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $1, updated_at = $2
            WHERE start_date = $3 AND status = $4
            "#,
        )
        .bind(CampaignStatus::Active)
        .bind(now)
        .bind(today)
        .bind(CampaignStatus::Inactive)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn deactivate_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $1, updated_at = $2
            WHERE end_date < $3 AND status = $4
            "#,
        )
        .bind(CampaignStatus::Inactive)
        .bind(now)
        .bind(today)
        .bind(CampaignStatus::Active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
