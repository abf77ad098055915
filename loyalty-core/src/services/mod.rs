// loyalty-core/src/services/mod.rs

pub mod campaign_service;
pub mod codes;
pub mod voucher_service;

pub use campaign_service::CampaignService;
pub use voucher_service::VoucherService;

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use loyalty_common::error::Error;

/// Deadline applied to every user-facing service operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound the caller's wait on a spawned mutation without cancelling it.
///
/// Dropping the `JoinHandle` detaches the task rather than aborting it, so
/// when the deadline fires the mutation and any compensating writes it
/// carries still run to completion in the background.
pub(crate) async fn run_to_deadline<T>(
    deadline: Duration,
    task: JoinHandle<Result<T, Error>>,
) -> Result<T, Error> {
    match timeout(deadline, task).await {
        Ok(joined) => joined
            .map_err(|err| Error::Unavailable(format!("operation task ended abnormally: {err}")))?,
        Err(elapsed) => Err(elapsed.into()),
    }
}

/// Operation timeout from `OPERATION_TIMEOUT_SECS`, falling back to the
/// default when unset or unparsable.
pub fn operation_timeout_from_env() -> Duration {
    dotenv::dotenv().ok();
    std::env::var("OPERATION_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_OPERATION_TIMEOUT)
}
