//! Shared vocabulary for the messmate core.
//!
//! Everything that crosses a crate boundary lives here: identifiers,
//! profile and room records as they are persisted in the store tree,
//! money conversions, and the path/email-key conventions of the tree.

#![deny(unsafe_code)]

pub mod ids;
pub mod money;
pub mod paths;
pub mod profile;
pub mod room;

pub use ids::{ExpenseId, GroupId, InviteId, UserId};
pub use money::{format_minor, from_minor, to_minor, CURRENCY, MINOR_PER_MAJOR};
pub use paths::email_key;
pub use profile::{
    gender_allows, Gender, GenderPreference, InvalidProfile, PublicProfile, SleepSchedule,
    StudyHabit,
};
pub use room::{
    total_spent, Expense, Group, Invite, InviteKind, InviteStatus, SplitSpec, MAX_MEMBERS,
};

/// Current wall-clock time as epoch milliseconds, the timestamp unit
/// used by every persisted record.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
