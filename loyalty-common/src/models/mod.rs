pub mod campaign;
pub mod ledger;
pub mod validator;
pub mod voucher;

pub use campaign::{Campaign, CampaignSpec, CampaignStatus, Reward};
pub use ledger::{LedgerEntry, LedgerReference, TransactionType};
pub use validator::{TransactionAttributes, TransactionPayload, Validator};
pub use voucher::{CodeStatus, PromoCode, Voucher, VoucherSpec, VoucherStatus};
