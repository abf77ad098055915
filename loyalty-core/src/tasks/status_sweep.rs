// loyalty-core/src/tasks/status_sweep.rs
//
// Date-driven status maintenance, the scheduled counterpart of the request
// path: campaigns whose window opens today become Active, campaigns and
// vouchers whose window has closed become Inactive, and the leftover codes
// of ended vouchers are expired. Safe to run repeatedly.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use loyalty_common::error::Error;
use loyalty_common::traits::clock::Clock;
use loyalty_common::traits::repository_traits::{CampaignRepository, VoucherRepository};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub campaigns_activated: u64,
    pub campaigns_deactivated: u64,
    pub codes_expired: u64,
}

/// One idempotent sweep pass at the clock's current date.
pub async fn run_status_sweep(
    campaigns: &dyn CampaignRepository,
    vouchers: &dyn VoucherRepository,
    clock: &dyn Clock,
) -> Result<SweepReport, Error> {
    let today = clock.today();
    let now = clock.now();

    let report = SweepReport {
        campaigns_activated: campaigns.activate_starting(today, now).await?,
        campaigns_deactivated: campaigns.deactivate_ended(today, now).await?,
        codes_expired: vouchers.expire_ended(today, now).await?,
    };

    info!(
        activated = report.campaigns_activated,
        deactivated = report.campaigns_deactivated,
        codes_expired = report.codes_expired,
        "status sweep finished"
    );
    Ok(report)
}

/// Run the sweep on a fixed interval until the handle is aborted.
pub fn spawn_status_sweep(
    campaigns: Arc<dyn CampaignRepository>,
    vouchers: Arc<dyn VoucherRepository>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(err) = run_status_sweep(&*campaigns, &*vouchers, &*clock).await {
                error!(%err, "status sweep failed");
            }
        }
    })
}
