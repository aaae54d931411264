//! Group, invite, and expense records as persisted in the store tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, UserId};
use crate::profile::Gender;

/// Hard cap on group size.
pub const MAX_MEMBERS: usize = 4;

/// A roommate group. Members are a uid → true map; a locked gender, if
/// present, constrains every future member.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub created_by: UserId,
    #[serde(default)]
    pub members: BTreeMap<UserId, bool>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: i64,
}

fn default_active() -> bool {
    true
}

impl Group {
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.keys().cloned().collect()
    }

    pub fn is_member(&self, uid: &UserId) -> bool {
        self.members.contains_key(uid)
    }

    pub fn is_owner(&self, uid: &UserId) -> bool {
        self.created_by == *uid
    }

    pub fn has_room(&self) -> bool {
        self.members.len() < MAX_MEMBERS
    }
}

/// What accepting an invite materializes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteKind {
    /// A brand-new two-person room, created only on accept.
    NewRoom,
    /// Joining an existing room.
    JoinGroup,
}

/// Invite records only ever exist in this state; accept and decline
/// both delete the record rather than marking it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
}

/// A pending invite under `/invites/{iid}`, indexed from both the
/// sender and recipient sides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invite {
    pub from: UserId,
    pub to: UserId,
    pub kind: InviteKind,
    /// Present only for [`InviteKind::JoinGroup`].
    #[serde(default)]
    pub group_id: Option<GroupId>,
    pub group_name: String,
    /// Gender locked at send time; re-validated at accept time.
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub status: InviteStatus,
    #[serde(default)]
    pub created_at: i64,
}

/// How an expense is divided among members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "split_type", rename_all = "snake_case")]
pub enum SplitSpec {
    /// Equal shares over the member snapshot at creation time. The map
    /// records each member's share in minor units; the payer's entry
    /// absorbs any division remainder.
    EqualShares { shares: BTreeMap<UserId, i64> },
}

/// An immutable expense record under `/expenses/{gid}/{eid}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub payer: UserId,
    /// Minor units, always positive.
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub description: String,
    #[serde(flatten)]
    pub split: SplitSpec,
    pub created_at: i64,
}

fn default_category() -> String {
    "general".to_string()
}

/// Sum of an expense log, for display totals.
pub fn total_spent(expenses: &[Expense]) -> i64 {
    expenses.iter().map(|e| e.amount_minor).sum()
}
