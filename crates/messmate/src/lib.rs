//! Single entrypoint for the messmate core, re-exporting:
//! - `messmate-types` (ids, profiles, rooms, money)
//! - `messmate-store` (synchronized tree store and the in-memory backend)
//! - `messmate-matching` (compatibility scoring and ranking)
//! - `messmate-invites` (the mutual-consent invite exchange)
//! - `messmate-ledger` (group membership and shared-expense balances)
//!
//! The facade carries no behavior of its own; it only standardizes
//! naming for consumers that want one dependency.

pub use messmate_invites as invites;
pub use messmate_ledger as ledger;
pub use messmate_matching as matching;
pub use messmate_store as store;
pub use messmate_types as types;
