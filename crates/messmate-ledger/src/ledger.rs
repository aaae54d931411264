use std::collections::BTreeMap;
use std::sync::Arc;

use messmate_store::{RemoteStore, StoreError, WriteOp};
use messmate_types::{
    now_millis, paths, Expense, ExpenseId, Group, GroupId, SplitSpec, UserId, CURRENCY,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::views::{decode_balances, decode_expenses, decode_group};

const MAX_NAME_LEN: usize = 40;

/// Group membership and balance ledger. All operations take the acting
/// user explicitly.
pub struct GroupLedger {
    store: Arc<dyn RemoteStore>,
}

impl GroupLedger {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Direct, ungated group creation: the actor and one peer become
    /// members immediately, with no locked gender. The invite exchange
    /// is the gated alternative.
    pub async fn create_group(
        &self,
        actor: &UserId,
        peer: &UserId,
        name: Option<String>,
    ) -> Result<GroupId, LedgerError> {
        if actor == peer {
            return Err(LedgerError::SelfGroup);
        }
        let name = match name {
            Some(name) => valid_name(&name)?,
            None => format!("Room with {}", peer.short()),
        };
        let gid = GroupId::generate();
        let group = Group {
            name,
            created_by: actor.clone(),
            members: [(actor.clone(), true), (peer.clone(), true)]
                .into_iter()
                .collect(),
            gender: None,
            active: true,
            created_at: now_millis(),
        };
        let path = paths::group(&gid);
        self.store
            .apply(vec![WriteOp::put(path.clone(), encode(&path, &group)?)])
            .await?;
        debug!(group = %gid, owner = %actor, "created group directly");
        Ok(gid)
    }

    /// Record an expense paid by `actor` and split it equally across
    /// the current member snapshot. Non-payers each owe the floored
    /// per-head share; the payer's own share absorbs the division
    /// remainder, so the shares always sum to the amount exactly.
    ///
    /// The expense record is written first, then one numeric
    /// transaction per member applies that member's signed delta,
    /// payer first. The deltas are NOT a single atomic batch: a
    /// disconnect partway through leaves the zero-sum invariant
    /// violated until the caller retries (see crate docs).
    pub async fn record_expense(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        amount_minor: i64,
        description: &str,
    ) -> Result<ExpenseId, LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::NonPositiveAmount);
        }
        let group = self.load_group(group_id).await?;
        if !group.is_member(actor) {
            return Err(LedgerError::NotAMember(actor.clone()));
        }

        let members = group.member_ids();
        let count = members.len() as i64;
        let each = amount_minor / count;
        let payer_share = amount_minor - each * (count - 1);

        let shares: BTreeMap<UserId, i64> = members
            .iter()
            .map(|m| {
                let share = if m == actor { payer_share } else { each };
                (m.clone(), share)
            })
            .collect();

        let description = if description.trim().is_empty() {
            "Expense".to_string()
        } else {
            description.trim().to_string()
        };
        let eid = ExpenseId::generate();
        let expense = Expense {
            payer: actor.clone(),
            amount_minor,
            currency: CURRENCY.to_string(),
            category: "general".to_string(),
            description,
            split: SplitSpec::EqualShares { shares },
            created_at: now_millis(),
        };
        let path = paths::expense(group_id, &eid);
        self.store
            .apply(vec![WriteOp::put(path.clone(), encode(&path, &expense)?)])
            .await?;

        // Payer first, then the rest in member order. Each delta is an
        // independent transaction; order makes the interruption point
        // deterministic for recovery and for the fault-injection tests.
        let mut deltas = Vec::with_capacity(members.len());
        deltas.push((actor.clone(), amount_minor - payer_share));
        for member in &members {
            if member != actor {
                deltas.push((member.clone(), -each));
            }
        }
        for (member, delta) in deltas {
            if let Err(err) = self
                .store
                .transact_numeric(&paths::balance(group_id, &member), delta)
                .await
            {
                warn!(
                    group = %group_id,
                    expense = %eid,
                    member = %member,
                    "expense delta failed mid-saga; balances need a retry"
                );
                return Err(err.into());
            }
        }
        debug!(group = %group_id, expense = %eid, amount_minor, "recorded expense");
        Ok(eid)
    }

    /// Record that `actor` paid `to` directly. One atomic write moves
    /// the amount between exactly the two accounts: the payer's
    /// balance rises (they are owed more, or owe less), the
    /// recipient's falls by the same amount.
    pub async fn record_settlement(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        to: &UserId,
        amount_minor: i64,
    ) -> Result<(), LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::NonPositiveAmount);
        }
        if actor == to {
            return Err(LedgerError::SelfSettlement);
        }
        let group = self.load_group(group_id).await?;
        for uid in [actor, to] {
            if !group.is_member(uid) {
                return Err(LedgerError::NotAMember(uid.clone()));
            }
        }
        self.store
            .transact_deltas(vec![
                (paths::balance(group_id, actor), amount_minor),
                (paths::balance(group_id, to), -amount_minor),
            ])
            .await?;
        debug!(group = %group_id, from = %actor, to = %to, amount_minor, "recorded settlement");
        Ok(())
    }

    /// Rename the room. Owner-only; 1 to 40 characters.
    pub async fn rename_group(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        new_name: &str,
    ) -> Result<(), LedgerError> {
        let group = self.load_group(group_id).await?;
        if !group.is_owner(actor) {
            return Err(LedgerError::OwnerOnly { action: "rename" });
        }
        let name = valid_name(new_name)?;
        self.store
            .apply(vec![WriteOp::put(
                paths::group_name(group_id),
                Value::String(name),
            )])
            .await?;
        Ok(())
    }

    /// Delete the room and everything under it: the group record, the
    /// whole expense log, and the whole balance map, in one atomic
    /// write. Owner-only.
    pub async fn delete_group(
        &self,
        group_id: &GroupId,
        actor: &UserId,
    ) -> Result<(), LedgerError> {
        let group = self.load_group(group_id).await?;
        if !group.is_owner(actor) {
            return Err(LedgerError::OwnerOnly { action: "delete" });
        }
        self.store
            .apply(vec![
                WriteOp::delete(paths::group(group_id)),
                WriteOp::delete(paths::expenses(group_id)),
                WriteOp::delete(paths::balances(group_id)),
            ])
            .await?;
        debug!(group = %group_id, "deleted group and cascaded ledger state");
        Ok(())
    }

    /// Leave the room. The owner cannot leave (delete instead). The
    /// departing member's balance entry is deliberately left at its
    /// last value — it is neither zeroed nor redistributed.
    pub async fn leave_group(
        &self,
        group_id: &GroupId,
        actor: &UserId,
    ) -> Result<(), LedgerError> {
        let group = self.load_group(group_id).await?;
        if !group.is_member(actor) {
            return Err(LedgerError::NotAMember(actor.clone()));
        }
        if group.is_owner(actor) {
            return Err(LedgerError::OwnerCannotLeave);
        }
        self.store
            .apply(vec![WriteOp::delete(paths::member(group_id, actor))])
            .await?;
        debug!(group = %group_id, member = %actor, "member left group");
        Ok(())
    }

    /// Sum of all balances in the group. Zero when the ledger is
    /// consistent; any other value is the residue of an interrupted
    /// expense saga awaiting a retry.
    pub async fn check_conservation(&self, group_id: &GroupId) -> Result<i64, LedgerError> {
        Ok(self.balances(group_id).await?.values().sum())
    }

    // ------------------------------------------------------------------
    // Snapshot reads and live views
    // ------------------------------------------------------------------

    pub async fn group(&self, group_id: &GroupId) -> Result<Option<Group>, LedgerError> {
        let path = paths::group(group_id);
        Ok(decode_group(&path, self.store.get(&path).await?)?)
    }

    /// Expense log, newest first.
    pub async fn expenses(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<(ExpenseId, Expense)>, LedgerError> {
        let path = paths::expenses(group_id);
        Ok(decode_expenses(&path, self.store.get(&path).await?)?)
    }

    pub async fn balances(
        &self,
        group_id: &GroupId,
    ) -> Result<BTreeMap<UserId, i64>, LedgerError> {
        let path = paths::balances(group_id);
        Ok(decode_balances(&path, self.store.get(&path).await?)?)
    }

    /// Live view of the group record; decode each observation with
    /// [`decode_group`].
    pub async fn watch_group(
        &self,
        group_id: &GroupId,
    ) -> Result<watch::Receiver<Option<Value>>, LedgerError> {
        Ok(self.store.watch(&paths::group(group_id)).await?)
    }

    /// Live view of the expense log; decode with [`decode_expenses`].
    pub async fn watch_expenses(
        &self,
        group_id: &GroupId,
    ) -> Result<watch::Receiver<Option<Value>>, LedgerError> {
        Ok(self.store.watch(&paths::expenses(group_id)).await?)
    }

    /// Live view of the balance map; decode with [`decode_balances`].
    pub async fn watch_balances(
        &self,
        group_id: &GroupId,
    ) -> Result<watch::Receiver<Option<Value>>, LedgerError> {
        Ok(self.store.watch(&paths::balances(group_id)).await?)
    }

    async fn load_group(&self, gid: &GroupId) -> Result<Group, LedgerError> {
        self.group(gid)
            .await?
            .ok_or_else(|| LedgerError::GroupNotFound(gid.clone()))
    }
}

fn valid_name(name: &str) -> Result<String, LedgerError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::InvalidName);
    }
    Ok(name.to_string())
}

fn encode<T: serde::Serialize>(path: &str, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|source| StoreError::Corrupt {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use messmate_store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        ledger: GroupLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            let remote: Arc<dyn RemoteStore> = store.clone();
            Self {
                ledger: GroupLedger::new(remote),
                store,
            }
        }

        async fn group_of(&self, uids: &[&str]) -> (GroupId, Vec<UserId>) {
            let members: Vec<UserId> = uids.iter().map(|u| UserId::new(*u)).collect();
            let gid = self
                .ledger
                .create_group(&members[0], &members[1], Some("Mess 7".into()))
                .await
                .unwrap();
            for extra in &members[2..] {
                self.store
                    .apply(vec![WriteOp::put(
                        paths::member(&gid, extra),
                        Value::Bool(true),
                    )])
                    .await
                    .unwrap();
            }
            (gid, members)
        }
    }

    #[tokio::test]
    async fn create_group_seeds_both_members() {
        let fx = Fixture::new();
        let (gid, members) = fx.group_of(&["a", "b"]).await;
        let group = fx.ledger.group(&gid).await.unwrap().unwrap();
        assert_eq!(group.name, "Mess 7");
        assert_eq!(group.created_by, members[0]);
        assert_eq!(group.member_ids(), members);
        assert_eq!(group.gender, None);
        assert!(group.active);
    }

    #[tokio::test]
    async fn create_group_rejects_self_pairing() {
        let fx = Fixture::new();
        let a = UserId::new("a");
        assert!(matches!(
            fx.ledger.create_group(&a, &a, None).await,
            Err(LedgerError::SelfGroup)
        ));
    }

    #[tokio::test]
    async fn expense_splits_between_two_members() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;
        fx.ledger
            .record_expense(&gid, &m[0], 1000, "Groceries")
            .await
            .unwrap();
        let balances = fx.ledger.balances(&gid).await.unwrap();
        assert_eq!(balances[&m[0]], 500);
        assert_eq!(balances[&m[1]], -500);
    }

    #[tokio::test]
    async fn payer_absorbs_the_rounding_remainder() {
        // the literal from the splitting policy: 100 over three members
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b", "c"]).await;
        let eid = fx
            .ledger
            .record_expense(&gid, &m[0], 100, "Snacks")
            .await
            .unwrap();

        let expenses = fx.ledger.expenses(&gid).await.unwrap();
        assert_eq!(expenses[0].0, eid);
        let SplitSpec::EqualShares { shares } = &expenses[0].1.split;
        assert_eq!(shares[&m[0]], 34);
        assert_eq!(shares[&m[1]], 33);
        assert_eq!(shares[&m[2]], 33);

        let balances = fx.ledger.balances(&gid).await.unwrap();
        assert_eq!(balances[&m[0]], 66);
        assert_eq!(balances[&m[1]], -33);
        assert_eq!(balances[&m[2]], -33);
        assert_eq!(fx.ledger.check_conservation(&gid).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn expense_validation_happens_before_any_write() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;

        assert!(matches!(
            fx.ledger.record_expense(&gid, &m[0], 0, "zero").await,
            Err(LedgerError::NonPositiveAmount)
        ));
        assert!(matches!(
            fx.ledger
                .record_expense(&gid, &UserId::new("ghost"), 100, "outsider")
                .await,
            Err(LedgerError::NotAMember(_))
        ));
        assert!(fx.ledger.expenses(&gid).await.unwrap().is_empty());
        assert!(fx.ledger.balances(&gid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn interrupted_expense_saga_leaves_a_residue() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b", "c"]).await;

        // allow only the payer's delta, then disconnect
        fx.store.fail_transacts_after(1).await;
        let err = fx.ledger.record_expense(&gid, &m[0], 900, "Dinner").await;
        assert!(matches!(err, Err(LedgerError::Store(_))));

        // the expense record landed and the payer was credited, but the
        // other members' debits never applied: conservation is broken
        assert_eq!(fx.ledger.expenses(&gid).await.unwrap().len(), 1);
        let balances = fx.ledger.balances(&gid).await.unwrap();
        assert_eq!(balances[&m[0]], 600);
        assert_eq!(fx.ledger.check_conservation(&gid).await.unwrap(), 600);

        fx.store.clear_faults().await;
    }

    #[tokio::test]
    async fn settlement_moves_money_conservatively() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;
        fx.ledger
            .record_expense(&gid, &m[0], 1000, "Rent share")
            .await
            .unwrap();

        fx.ledger
            .record_settlement(&gid, &m[1], &m[0], 500)
            .await
            .unwrap();
        let balances = fx.ledger.balances(&gid).await.unwrap();
        assert_eq!(balances[&m[0]], 0);
        assert_eq!(balances[&m[1]], 0);
        assert_eq!(fx.ledger.check_conservation(&gid).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn settlement_validates_parties() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;

        assert!(matches!(
            fx.ledger.record_settlement(&gid, &m[0], &m[0], 100).await,
            Err(LedgerError::SelfSettlement)
        ));
        assert!(matches!(
            fx.ledger.record_settlement(&gid, &m[0], &m[1], -5).await,
            Err(LedgerError::NonPositiveAmount)
        ));
        assert!(matches!(
            fx.ledger
                .record_settlement(&gid, &m[0], &UserId::new("ghost"), 100)
                .await,
            Err(LedgerError::NotAMember(_))
        ));
    }

    proptest::proptest! {
        /// Conservation holds after any sequence of settlements on a
        /// three-member group.
        #[test]
        fn settlements_preserve_zero_sum(
            transfers in proptest::collection::vec((0usize..3, 0usize..3, 1i64..5000), 0..20)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let fx = Fixture::new();
                let (gid, m) = fx.group_of(&["a", "b", "c"]).await;
                for (from, to, amount) in transfers {
                    if from != to {
                        fx.ledger
                            .record_settlement(&gid, &m[from], &m[to], amount)
                            .await
                            .unwrap();
                    }
                }
                assert_eq!(fx.ledger.check_conservation(&gid).await.unwrap(), 0);
            });
        }
    }

    #[tokio::test]
    async fn rename_is_owner_only_and_bounded() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;

        assert!(matches!(
            fx.ledger.rename_group(&gid, &m[1], "New name").await,
            Err(LedgerError::OwnerOnly { action: "rename" })
        ));
        assert!(matches!(
            fx.ledger.rename_group(&gid, &m[0], "   ").await,
            Err(LedgerError::InvalidName)
        ));
        assert!(matches!(
            fx.ledger.rename_group(&gid, &m[0], &"x".repeat(41)).await,
            Err(LedgerError::InvalidName)
        ));

        fx.ledger.rename_group(&gid, &m[0], "  Mess 7B  ").await.unwrap();
        assert_eq!(fx.ledger.group(&gid).await.unwrap().unwrap().name, "Mess 7B");
    }

    #[tokio::test]
    async fn delete_cascades_expenses_and_balances() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;
        fx.ledger.record_expense(&gid, &m[0], 1000, "x").await.unwrap();

        assert!(matches!(
            fx.ledger.delete_group(&gid, &m[1]).await,
            Err(LedgerError::OwnerOnly { action: "delete" })
        ));

        fx.ledger.delete_group(&gid, &m[0]).await.unwrap();
        assert!(fx.ledger.group(&gid).await.unwrap().is_none());
        assert!(fx.ledger.expenses(&gid).await.unwrap().is_empty());
        assert!(fx.ledger.balances(&gid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leave_keeps_departed_balance_as_is() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b", "c"]).await;
        fx.ledger.record_expense(&gid, &m[0], 900, "x").await.unwrap();

        assert!(matches!(
            fx.ledger.leave_group(&gid, &m[0]).await,
            Err(LedgerError::OwnerCannotLeave)
        ));

        fx.ledger.leave_group(&gid, &m[2]).await.unwrap();
        let group = fx.ledger.group(&gid).await.unwrap().unwrap();
        assert!(!group.is_member(&m[2]));
        // the departed member's debt stays on the books
        assert_eq!(fx.ledger.balances(&gid).await.unwrap()[&m[2]], -300);
    }

    #[tokio::test]
    async fn watch_balances_follows_the_ledger() {
        let fx = Fixture::new();
        let (gid, m) = fx.group_of(&["a", "b"]).await;
        let mut rx = fx.ledger.watch_balances(&gid).await.unwrap();
        assert!(rx.borrow().is_none());

        fx.ledger.record_expense(&gid, &m[0], 1000, "x").await.unwrap();
        rx.changed().await.unwrap();
        let path = paths::balances(&gid);
        let balances = decode_balances(&path, rx.borrow_and_update().clone()).unwrap();
        assert_eq!(balances[&m[0]], 500);
        assert_eq!(balances[&m[1]], -500);
    }
}
