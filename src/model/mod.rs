//! Types that represent the core data model, such as `LedgerEntry` and `Amount`.
mod amount;
pub(crate) mod entry;
mod filter;

pub use amount::{Amount, AmountError};
pub use entry::{
    base_description, installment_description, AccountClass, EntryChanges, EntryUpdate, Flow,
    GroupKey, LedgerEntry, NewEntry, SettlementStatus, BANK_SUGGESTIONS, CATEGORY_SUGGESTIONS,
    PAYMENT_METHOD_SUGGESTIONS, UNSET_BANK, UNSET_PAYMENT_METHOD,
};
pub use filter::EntryFilter;
