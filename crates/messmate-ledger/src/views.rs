//! Decoders for the subscriber-facing views of a group's state.
//!
//! Watch subscribers receive raw tree values (possibly `None` before
//! initial data arrives); these helpers turn each observation into the
//! typed shape the UI renders. They are also used by the one-shot
//! snapshot readers on [`crate::GroupLedger`].

use std::collections::BTreeMap;

use messmate_store::StoreError;
use messmate_types::{Expense, ExpenseId, Group, UserId};
use serde_json::Value;

/// Decode a group record. `None` in means the group does not (or no
/// longer does) exist.
pub fn decode_group(path: &str, value: Option<Value>) -> Result<Option<Group>, StoreError> {
    match value {
        None => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_string(),
                source,
            }),
    }
}

/// Decode an expense log subtree into records sorted newest-first,
/// the order the expense feed renders.
pub fn decode_expenses(
    path: &str,
    value: Option<Value>,
) -> Result<Vec<(ExpenseId, Expense)>, StoreError> {
    let Some(Value::Object(map)) = value else {
        return Ok(Vec::new());
    };
    let mut expenses = Vec::with_capacity(map.len());
    for (eid, record) in map {
        let expense: Expense =
            serde_json::from_value(record).map_err(|source| StoreError::Corrupt {
                path: format!("{path}/{eid}"),
                source,
            })?;
        expenses.push((ExpenseId::new(eid), expense));
    }
    expenses.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    Ok(expenses)
}

/// Decode a balance subtree into a uid → minor-units map. Absent means
/// an empty map: a group with no expenses yet has no balance entries.
pub fn decode_balances(
    path: &str,
    value: Option<Value>,
) -> Result<BTreeMap<UserId, i64>, StoreError> {
    let Some(Value::Object(map)) = value else {
        return Ok(BTreeMap::new());
    };
    let mut balances = BTreeMap::new();
    for (uid, amount) in map {
        let amount = amount.as_i64().ok_or_else(|| StoreError::NotNumeric {
            path: format!("{path}/{uid}"),
        })?;
        balances.insert(UserId::new(uid), amount);
    }
    Ok(balances)
}
