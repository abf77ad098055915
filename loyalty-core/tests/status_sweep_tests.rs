// tests/status_sweep_tests.rs

mod helpers;

use loyalty_common::models::{CampaignSpec, CampaignStatus, CodeStatus, VoucherStatus};
use loyalty_common::traits::repository_traits::VoucherRepository;
use loyalty_core::tasks::run_status_sweep;

use helpers::{august_clock, core, date, grant_points, voucher_spec};

fn campaign_spec(start: chrono::NaiveDate, end: chrono::NaiveDate) -> CampaignSpec {
    CampaignSpec {
        name: "summer points".to_string(),
        description: "double points in summer".to_string(),
        start_date: start,
        end_date: end,
        validator: None,
        rewards: vec![("points".to_string(), None)],
    }
}

#[tokio::test]
async fn sweep_activates_campaigns_on_their_start_date() {
    let core = core();
    // Created in June, not yet started: stored Inactive.
    let campaign = core
        .campaign_service
        .create_campaign(&campaign_spec(date(2024, 8, 15), date(2024, 9, 30)))
        .await
        .unwrap();
    assert_eq!(campaign.status, CampaignStatus::Inactive);

    let later = august_clock();
    let report = run_status_sweep(&*core.campaigns, &*core.vouchers, &*later)
        .await
        .unwrap();
    assert_eq!(report.campaigns_activated, 1);

    let stored = core
        .campaign_service
        .get_campaign(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, CampaignStatus::Active);

    // Nothing left to flip on the next pass.
    let again = run_status_sweep(&*core.campaigns, &*core.vouchers, &*later)
        .await
        .unwrap();
    assert_eq!(again.campaigns_activated, 0);
}

#[tokio::test]
async fn sweep_deactivates_campaigns_past_their_end_date() {
    let core = core();
    let campaign = core
        .campaign_service
        .create_campaign(&campaign_spec(date(2024, 6, 1), date(2024, 7, 1)))
        .await
        .unwrap();
    assert_eq!(campaign.status, CampaignStatus::Active);

    let later = august_clock();
    let report = run_status_sweep(&*core.campaigns, &*core.vouchers, &*later)
        .await
        .unwrap();
    assert_eq!(report.campaigns_deactivated, 1);

    let stored = core
        .campaign_service
        .get_campaign(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, CampaignStatus::Inactive);
}

#[tokio::test]
async fn sweep_expires_leftover_codes_of_ended_vouchers() {
    let core = core();
    let mut spec = voucher_spec(3, 100);
    spec.end_date = date(2024, 7, 1);

    let voucher = core.voucher_service.create_voucher(&spec).await.unwrap();
    grant_points(&core, "alice", 1000.0).await;
    grant_points(&core, "bob", 1000.0).await;

    // One code redeemed, one merely bought, one never sold.
    core.voucher_service.buy(voucher.id, "alice").await.unwrap();
    core.voucher_service.buy(voucher.id, "bob").await.unwrap();
    core.voucher_service.redeem(voucher.id, "alice").await.unwrap();

    let later = august_clock();
    let report = run_status_sweep(&*core.campaigns, &*core.vouchers, &*later)
        .await
        .unwrap();
    assert_eq!(report.codes_expired, 2);

    let stored = core
        .voucher_service
        .get_voucher(voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VoucherStatus::Inactive);
    assert_eq!(stored.available, 0);
    assert_eq!(stored.bought, 0);
    assert_eq!(stored.redeemed, 1);
    assert_eq!(stored.expired, 2);
    assert_eq!(
        stored.available + stored.bought + stored.redeemed + stored.expired,
        stored.stock
    );

    // Redemption survives expiry; everything else is Expired.
    let codes = core.vouchers.codes_for_voucher(voucher.id).await.unwrap();
    let redeemed = codes
        .iter()
        .filter(|c| c.status == CodeStatus::Redeemed)
        .count();
    let expired = codes
        .iter()
        .filter(|c| c.status == CodeStatus::Expired)
        .count();
    assert_eq!(redeemed, 1);
    assert_eq!(expired, 2);

    // Idempotent: a second pass finds nothing to expire.
    let again = run_status_sweep(&*core.campaigns, &*core.vouchers, &*later)
        .await
        .unwrap();
    assert_eq!(again.codes_expired, 0);
}

#[tokio::test]
async fn sweep_leaves_live_vouchers_alone() {
    let core = core();
    let voucher = core
        .voucher_service
        .create_voucher(&voucher_spec(3, 100))
        .await
        .unwrap();

    let report = run_status_sweep(&*core.campaigns, &*core.vouchers, &*core.clock)
        .await
        .unwrap();
    assert_eq!(report.codes_expired, 0);

    let stored = core
        .voucher_service
        .get_voucher(voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VoucherStatus::Active);
    assert_eq!(stored.available, 3);
}
