//! The shared-expense ledger.
//!
//! Every balance is a signed integer in minor units; positive means the
//! member is owed money. Balances form a closed system per group: every
//! mutation changes at least two accounts by equal and opposite totals,
//! so the group-wide sum stays at zero.
//!
//! The one documented exception: an expense applies its per-member
//! deltas as independent numeric transactions, not one atomic batch. A
//! disconnect partway through leaves the zero-sum invariant transiently
//! violated until the caller retries; [`GroupLedger::check_conservation`]
//! exposes the residue. Settlements, by contrast, move money between
//! exactly two accounts in a single atomic write.

#![deny(unsafe_code)]

mod error;
mod ledger;
mod settle;
mod views;

pub use error::LedgerError;
pub use ledger::GroupLedger;
pub use settle::{suggest_settlements, SuggestedPayment};
pub use views::{decode_balances, decode_expenses, decode_group};
