// tests/helpers/mod.rs
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};

use loyalty_common::models::VoucherSpec;
use loyalty_common::traits::clock::{Clock, FixedClock};
use loyalty_common::traits::repository_traits::LedgerRepository;
use loyalty_core::repositories::memory::{
    MemoryCampaignRepository, MemoryLedgerRepository, MemoryVoucherRepository,
};
use loyalty_core::services::{CampaignService, VoucherService};

pub const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// 2024-06-15 noon UTC, the "today" every fixture sees unless a test says
/// otherwise.
pub fn june_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
    ))
}

pub fn august_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap(),
    ))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct TestCore {
    pub campaigns: Arc<MemoryCampaignRepository>,
    pub vouchers: Arc<MemoryVoucherRepository>,
    pub ledger: Arc<MemoryLedgerRepository>,
    pub campaign_service: Arc<CampaignService>,
    pub voucher_service: Arc<VoucherService>,
    pub clock: Arc<FixedClock>,
}

pub fn core_at(clock: Arc<FixedClock>) -> TestCore {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let campaigns = Arc::new(MemoryCampaignRepository::new());
    let vouchers = Arc::new(MemoryVoucherRepository::new());
    let ledger = Arc::new(MemoryLedgerRepository::new());

    let campaign_service = Arc::new(CampaignService::new(
        campaigns.clone(),
        ledger.clone(),
        clock.clone() as Arc<dyn Clock>,
        OP_TIMEOUT,
    ));
    let voucher_service = Arc::new(VoucherService::new(
        vouchers.clone(),
        ledger.clone(),
        clock.clone() as Arc<dyn Clock>,
        OP_TIMEOUT,
    ));

    TestCore {
        campaigns,
        vouchers,
        ledger,
        campaign_service,
        voucher_service,
        clock,
    }
}

pub fn core() -> TestCore {
    core_at(june_clock())
}

/// A voucher live through all of 2024.
pub fn voucher_spec(stock: i32, point_cost: i64) -> VoucherSpec {
    VoucherSpec {
        name: "coffee voucher".to_string(),
        description: "one free coffee".to_string(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        point_cost,
        stock,
        code_prefix: "PRM-".to_string(),
        validator: None,
    }
}

/// Seed a user's balance with a campaign debit.
pub async fn grant_points(core: &TestCore, user_id: &str, amount: f64) {
    core.ledger
        .record_debit(user_id, amount, 1, core.clock.now())
        .await
        .expect("seeding debit should succeed");
}
