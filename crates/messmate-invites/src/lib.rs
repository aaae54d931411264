//! The invite exchange that gates group creation.
//!
//! An invite has exactly one persisted state: pending. Accepting or
//! declining removes the record and both of its indexes in the same
//! atomic write that applies the side effect, so no "accepted" or
//! "declined" record ever exists — only presence or absence. A room
//! (and with it a ledger) comes into existence exclusively through an
//! accepted new-room invite or the explicit direct-creation path in
//! the group ledger.

#![deny(unsafe_code)]

mod error;
mod ledger;

pub use error::InviteError;
pub use ledger::{AcceptOutcome, InviteLedger};
