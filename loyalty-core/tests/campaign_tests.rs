// tests/campaign_tests.rs
//
// Campaign administration and the accrual path: validator gating, reward
// computation and the Debit entry it produces.

mod helpers;

use loyalty_common::error::Error;
use loyalty_common::models::{
    CampaignSpec, CampaignStatus, LedgerReference, TransactionAttributes, TransactionPayload,
    TransactionType, Validator,
};

use helpers::{core, date};

fn live_campaign_spec(validator: Validator) -> CampaignSpec {
    CampaignSpec {
        name: "mobile cashback".to_string(),
        description: "points for mobile purchases".to_string(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        validator: Some(validator),
        rewards: vec![(
            "points".to_string(),
            Some("loyalty points".to_string()),
        )],
    }
}

fn payload(user_id: &str, amount: f64) -> TransactionPayload {
    TransactionPayload {
        user_id: Some(user_id.to_string()),
        transaction_amount: amount,
        attributes: TransactionAttributes {
            channel: Some("mobile-app-android".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn create_campaign_persists_rewards_and_window_status() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator::default()))
        .await
        .unwrap();

    assert_eq!(campaign.status, CampaignStatus::Active);
    assert_eq!(campaign.rewards.len(), 1);
    assert_eq!(campaign.rewards[0].name, "points");
    assert_ne!(campaign.id, 0);

    let stored = core
        .campaign_service
        .get_campaign(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rewards.len(), 1);
    assert_eq!(stored.validator, Some(Validator::default()));
}

#[tokio::test]
async fn list_campaigns_filters_by_status() {
    let core = core();
    core.campaign_service
        .create_campaign(&live_campaign_spec(Validator::default()))
        .await
        .unwrap();

    let mut future = live_campaign_spec(Validator::default());
    future.start_date = date(2024, 10, 1);
    core.campaign_service.create_campaign(&future).await.unwrap();

    let active = core
        .campaign_service
        .list_campaigns(Some(CampaignStatus::Active))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    let all = core.campaign_service.list_campaigns(None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn accrue_writes_the_formula_reward_as_a_debit() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator {
            channel: Some("mobile".to_string()),
            multiplier: Some(2.0),
            formula: Some("transactionAmount * multiplier".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();

    let (reward, entry) = core
        .campaign_service
        .accrue(campaign.id, &payload("alice", 100.0))
        .await
        .unwrap();
    assert_eq!(reward, 200.0);
    assert_eq!(entry.transaction_type, TransactionType::Debit);
    assert_eq!(entry.reference, LedgerReference::Campaign(campaign.id));
    assert_eq!(entry.point_amount, 200.0);

    assert_eq!(
        core.campaign_service.user_balance("alice").await.unwrap(),
        200.0
    );
}

#[tokio::test]
async fn accrue_rejects_transactions_below_the_minimum() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator {
            minimal_transaction: Some("1000".to_string()),
            value: Some(10),
            ..Default::default()
        }))
        .await
        .unwrap();

    let err = core
        .campaign_service
        .accrue(campaign.id, &payload("alice", 500.0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "transactionAmount"));
    assert_eq!(core.campaign_service.user_balance("alice").await.unwrap(), 0.0);
}

#[tokio::test]
async fn accrue_rejects_mismatched_channel() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator {
            channel: Some("web".to_string()),
            value: Some(10),
            ..Default::default()
        }))
        .await
        .unwrap();

    // Request channel "mobile-app-android" does not contain "web".
    let err = core
        .campaign_service
        .accrue(campaign.id, &payload("alice", 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "channel"));
}

#[tokio::test]
async fn accrue_requires_an_active_in_window_campaign() {
    let core = core();
    let mut spec = live_campaign_spec(Validator {
        value: Some(10),
        ..Default::default()
    });
    spec.start_date = date(2024, 10, 1);
    spec.end_date = date(2024, 12, 31);
    let campaign = core.campaign_service.create_campaign(&spec).await.unwrap();

    let err = core
        .campaign_service
        .accrue(campaign.id, &payload("alice", 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let err = core
        .campaign_service
        .accrue(9999, &payload("alice", 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn accrue_requires_a_user_id() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator {
            value: Some(10),
            ..Default::default()
        }))
        .await
        .unwrap();

    let mut anonymous = payload("", 100.0);
    anonymous.user_id = None;
    let err = core
        .campaign_service
        .accrue(campaign.id, &anonymous)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "userId"));
}

#[tokio::test]
async fn delete_campaign_removes_it() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&live_campaign_spec(Validator::default()))
        .await
        .unwrap();

    core.campaign_service.delete_campaign(campaign.id).await.unwrap();
    assert!(
        core.campaign_service
            .get_campaign(campaign.id)
            .await
            .unwrap()
            .is_none()
    );
}
