//! Path builders for the synchronized store tree.
//!
//! The tree shape is the contract between the core and the remote store:
//!
//! ```text
//! /public/{uid}              matching-safe profile projection
//! /groups/{gid}              group record (members live under /members)
//! /expenses/{gid}/{eid}      append-only expense log
//! /balances/{gid}/{uid}      signed integer, minor units
//! /invites/{iid}             invite record
//! /invites_to/{uid}/{iid}    inbound index
//! /invites_from/{uid}/{iid}  outbound index
//! /email_to_uid/{key}        email directory (key via [`email_key`])
//! ```

use crate::ids::{ExpenseId, GroupId, InviteId, UserId};

pub fn public_profile(uid: &UserId) -> String {
    format!("/public/{uid}")
}

pub fn group(gid: &GroupId) -> String {
    format!("/groups/{gid}")
}

pub fn group_name(gid: &GroupId) -> String {
    format!("/groups/{gid}/name")
}

pub fn members(gid: &GroupId) -> String {
    format!("/groups/{gid}/members")
}

pub fn member(gid: &GroupId, uid: &UserId) -> String {
    format!("/groups/{gid}/members/{uid}")
}

pub fn expenses(gid: &GroupId) -> String {
    format!("/expenses/{gid}")
}

pub fn expense(gid: &GroupId, eid: &ExpenseId) -> String {
    format!("/expenses/{gid}/{eid}")
}

pub fn balances(gid: &GroupId) -> String {
    format!("/balances/{gid}")
}

pub fn balance(gid: &GroupId, uid: &UserId) -> String {
    format!("/balances/{gid}/{uid}")
}

pub fn invite(iid: &InviteId) -> String {
    format!("/invites/{iid}")
}

pub fn invites_to(uid: &UserId) -> String {
    format!("/invites_to/{uid}")
}

pub fn invite_to(uid: &UserId, iid: &InviteId) -> String {
    format!("/invites_to/{uid}/{iid}")
}

pub fn invite_from(uid: &UserId, iid: &InviteId) -> String {
    format!("/invites_from/{uid}/{iid}")
}

pub fn email_to_uid(key: &str) -> String {
    format!("/email_to_uid/{key}")
}

/// Normalize an email address into a key the store accepts as a path
/// segment: lowercase, whitespace stripped, `.` → `,` and `@` → `_at_`
/// (the backing store forbids both characters in segments).
pub fn email_key(email: &str) -> String {
    email
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '.' => ",".to_string(),
            '@' => "_at_".to_string(),
            other => other.to_string(),
        })
        .collect()
}
