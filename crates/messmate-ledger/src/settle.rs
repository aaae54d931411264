//! Settlement suggestions: who to pay, and how much, to clear a debt.

use std::collections::BTreeMap;

use messmate_types::UserId;
use serde::{Deserialize, Serialize};

/// One suggested repayment. Advisory only — nothing is mutated until
/// the member actually records a settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPayment {
    pub to: UserId,
    pub amount_minor: i64,
}

/// Greedy repayment plan for `me` against the current balance map.
///
/// A member who owes money (negative balance) is matched against
/// creditors in descending balance order, paying each off up to the
/// remaining debt, until the debt is covered or creditors run out.
/// Members who are owed money or settled get an empty plan.
pub fn suggest_settlements(
    balances: &BTreeMap<UserId, i64>,
    me: &UserId,
) -> Vec<SuggestedPayment> {
    let mine = balances.get(me).copied().unwrap_or(0);
    if mine >= 0 {
        return Vec::new();
    }
    let mut owed = -mine;

    let mut creditors: Vec<(&UserId, i64)> = balances
        .iter()
        .filter(|(uid, amount)| *uid != me && **amount > 0)
        .map(|(uid, amount)| (uid, *amount))
        .collect();
    // stable sort: equal creditors keep uid order from the map
    creditors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut plan = Vec::new();
    for (uid, amount) in creditors {
        if owed <= 0 {
            break;
        }
        let pay = owed.min(amount);
        plan.push(SuggestedPayment {
            to: uid.clone(),
            amount_minor: pay,
        });
        owed -= pay;
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(&str, i64)]) -> BTreeMap<UserId, i64> {
        entries
            .iter()
            .map(|(uid, amt)| (UserId::new(*uid), *amt))
            .collect()
    }

    #[test]
    fn creditor_or_settled_member_gets_no_plan() {
        let b = balances(&[("a", 500), ("b", -500), ("c", 0)]);
        assert!(suggest_settlements(&b, &UserId::new("a")).is_empty());
        assert!(suggest_settlements(&b, &UserId::new("c")).is_empty());
        assert!(suggest_settlements(&b, &UserId::new("ghost")).is_empty());
    }

    #[test]
    fn debtor_pays_largest_creditor_first() {
        let b = balances(&[("a", 300), ("b", 700), ("me", -800), ("d", -200)]);
        let plan = suggest_settlements(&b, &UserId::new("me"));
        assert_eq!(
            plan,
            vec![
                SuggestedPayment {
                    to: UserId::new("b"),
                    amount_minor: 700
                },
                SuggestedPayment {
                    to: UserId::new("a"),
                    amount_minor: 100
                },
            ]
        );
    }

    #[test]
    fn plan_stops_when_creditors_run_out() {
        // more owed than there is credit (mid-saga residue)
        let b = balances(&[("a", 300), ("me", -1000)]);
        let plan = suggest_settlements(&b, &UserId::new("me"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount_minor, 300);
    }

    #[test]
    fn equal_creditors_keep_map_order() {
        let b = balances(&[("y", 400), ("x", 400), ("me", -600)]);
        let plan = suggest_settlements(&b, &UserId::new("me"));
        assert_eq!(plan[0].to, UserId::new("x"));
        assert_eq!(plan[1].to, UserId::new("y"));
        assert_eq!(plan[1].amount_minor, 200);
    }

    #[test]
    fn exact_coverage_consumes_whole_debt() {
        let b = balances(&[("a", 500), ("me", -500)]);
        let plan = suggest_settlements(&b, &UserId::new("me"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount_minor, 500);
    }
}
