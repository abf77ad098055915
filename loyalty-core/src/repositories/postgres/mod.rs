// loyalty-core/src/repositories/postgres/mod.rs

pub mod campaigns;
pub mod ledger;
pub mod vouchers;

pub use campaigns::PostgresCampaignRepository;
pub use ledger::PostgresLedgerRepository;
pub use vouchers::PostgresVoucherRepository;
