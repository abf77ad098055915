// loyalty-core/src/repositories/memory/mod.rs
//
// In-memory mapping of the persistence contract. Per-voucher and per-user
// async mutexes stand in for the row locks the Postgres backend gets from
// the database, so the same atomicity guarantees hold under concurrent
// tasks. Used by the test suite and usable as a standalone backend.

pub mod campaigns;
pub mod ledger;
pub mod vouchers;

pub use campaigns::MemoryCampaignRepository;
pub use ledger::MemoryLedgerRepository;
pub use vouchers::MemoryVoucherRepository;
