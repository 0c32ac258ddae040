//! Quota enforcement

mod ledger;

pub use ledger::QuotaLedger;
