pub mod clock;
pub mod repository_traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use repository_traits::{CampaignRepository, LedgerRepository, VoucherRepository};
