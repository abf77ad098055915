// loyalty-core/src/repositories/memory/campaigns.rs

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use loyalty_common::error::Error;
use loyalty_common::models::{Campaign, CampaignStatus};
use loyalty_common::traits::repository_traits::CampaignRepository;

#[derive(Default)]
pub struct MemoryCampaignRepository {
    campaigns: DashMap<i64, Campaign>,
    next_id: AtomicI64,
}

impl MemoryCampaignRepository {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl CampaignRepository for MemoryCampaignRepository {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = campaign.clone();
        stored.id = id;
        for (i, reward) in stored.rewards.iter_mut().enumerate() {
            reward.id = i as i64 + 1;
            reward.campaign_id = id;
        }
        self.campaigns.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>, Error> {
        Ok(self.campaigns.get(&id).map(|c| c.clone()))
    }

    async fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>, Error> {
        let mut out: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .map(|c| c.clone())
            .collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    async fn delete_campaign(&self, id: i64) -> Result<(), Error> {
        self.campaigns.remove(&id);
        Ok(())
    }

    async fn activate_starting(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut changed = 0;
        for mut entry in self.campaigns.iter_mut() {
            if entry.start_date == today && entry.status == CampaignStatus::Inactive {
                entry.status = CampaignStatus::Active;
                entry.updated_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn deactivate_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut changed = 0;
        for mut entry in self.campaigns.iter_mut() {
            if entry.end_date < today && entry.status == CampaignStatus::Active {
                entry.status = CampaignStatus::Inactive;
                entry.updated_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
