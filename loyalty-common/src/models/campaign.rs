// File: loyalty-common/src/models/campaign.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::validator::Validator;

/// Campaign activity status. Stored as a smallint; the scheduled status
/// sweep is the only writer once a campaign exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum CampaignStatus {
    Inactive = 0,
    Active = 1,
}

/// A time-bounded promotional rule set that earns users points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CampaignStatus,
    /// Admin-configured matching/reward rule for this campaign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    /// Ordered reward list, loaded and deleted with the campaign.
    #[serde(default)]
    pub rewards: Vec<Reward>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether `date` falls inside the campaign's [start_date, end_date] window.
    pub fn in_window(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Admin payload for campaign creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSpec {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    /// (name, description) pairs inserted alongside the campaign.
    #[serde(default)]
    pub rewards: Vec<(String, Option<String>)>,
}
