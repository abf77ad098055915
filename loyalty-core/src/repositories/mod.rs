// loyalty-core/src/repositories/mod.rs

pub mod memory;
pub mod postgres;

pub use loyalty_common::traits::repository_traits::{
    CampaignRepository, LedgerRepository, VoucherRepository,
};
