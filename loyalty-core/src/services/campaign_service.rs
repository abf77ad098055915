// loyalty-core/src/services/campaign_service.rs
//
// Campaign use cases: administration, transaction validation with reward
// computation, and point accrual into the ledger.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;

use loyalty_common::error::Error;
use loyalty_common::models::{
    Campaign, CampaignSpec, CampaignStatus, LedgerEntry, Reward, TransactionPayload, Validator,
};
use loyalty_common::traits::clock::Clock;
use loyalty_common::traits::repository_traits::{CampaignRepository, LedgerRepository};

use crate::rules;

pub struct CampaignService {
    campaigns: Arc<dyn CampaignRepository>,
    ledger: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    op_timeout: Duration,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        ledger: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            campaigns,
            ledger,
            clock,
            op_timeout,
        }
    }

    pub async fn create_campaign(&self, spec: &CampaignSpec) -> Result<Campaign, Error> {
        timeout(self.op_timeout, self.create_campaign_inner(spec)).await?
    }

    async fn create_campaign_inner(&self, spec: &CampaignSpec) -> Result<Campaign, Error> {
        if spec.end_date < spec.start_date {
            return Err(Error::validation("endDate", "end date precedes start date"));
        }

        let now = self.clock.now();
        let today = self.clock.today();
        let status = if spec.start_date <= today && today <= spec.end_date {
            CampaignStatus::Active
        } else {
            CampaignStatus::Inactive
        };

        let campaign = Campaign {
            id: 0,
            name: spec.name.clone(),
            description: spec.description.clone(),
            start_date: spec.start_date,
            end_date: spec.end_date,
            status,
            validator: spec.validator.clone(),
            rewards: spec
                .rewards
                .iter()
                .map(|(name, description)| Reward {
                    id: 0,
                    campaign_id: 0,
                    name: name.clone(),
                    description: description.clone(),
                })
                .collect(),
            updated_at: None,
            created_at: now,
        };

        let stored = self.campaigns.create_campaign(&campaign).await?;
        info!(campaign_id = stored.id, "campaign created");
        Ok(stored)
    }

    pub async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, Error> {
        timeout(self.op_timeout, self.campaigns.get_campaign(id)).await?
    }

    pub async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>, Error> {
        timeout(self.op_timeout, self.campaigns.list_campaigns(status)).await?
    }

    pub async fn delete_campaign(&self, id: i64) -> Result<(), Error> {
        timeout(self.op_timeout, self.campaigns.delete_campaign(id)).await?
    }

    /// Validate a transaction against an admin validator and compute its
    /// reward. Pure with respect to storage; nothing is written.
    pub fn validate_transaction(
        &self,
        validator: Option<&Validator>,
        payload: &TransactionPayload,
    ) -> Result<f64, Error> {
        rules::validate_transaction(validator, payload)
    }

    /// Run a transaction through an active campaign's validator and, when it
    /// qualifies, write the earned points as a Debit ledger entry.
    pub async fn accrue(
        &self,
        campaign_id: i64,
        payload: &TransactionPayload,
    ) -> Result<(f64, LedgerEntry), Error> {
        timeout(self.op_timeout, self.accrue_inner(campaign_id, payload)).await?
    }

    async fn accrue_inner(
        &self,
        campaign_id: i64,
        payload: &TransactionPayload,
    ) -> Result<(f64, LedgerEntry), Error> {
        let user_id = payload
            .user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::validation("userId", "user id is required"))?;

        let campaign = self
            .campaigns
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {campaign_id}")))?;

        let today = self.clock.today();
        if campaign.status != CampaignStatus::Active || !campaign.in_window(today) {
            return Err(Error::Conflict(format!(
                "campaign {campaign_id} is not active"
            )));
        }

        let reward = rules::validate_transaction(campaign.validator.as_ref(), payload)?;

        let entry = self
            .ledger
            .record_debit(user_id, reward, campaign_id, self.clock.now())
            .await?;

        info!(campaign_id, user_id, reward, "points accrued");
        Ok((reward, entry))
    }

    /// Fold of the user's ledger: earned minus spent.
    pub async fn user_balance(&self, user_id: &str) -> Result<f64, Error> {
        timeout(self.op_timeout, self.ledger.balance(user_id)).await?
    }
}
