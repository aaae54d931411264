//! In-memory reference implementation of [`RemoteStore`].
//!
//! Holds the whole tree as one JSON object behind an async `RwLock`.
//! Multi-key writes mutate under a single write guard, which gives the
//! all-or-nothing visibility the contract requires; the same guard makes
//! the numeric read-modify-write atomic without an observable retry loop.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{RemoteStore, WriteOp};
use async_trait::async_trait;

pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

struct Inner {
    root: Value,
    watchers: Vec<Watcher>,
    /// Remaining numeric transactions before injected failures start.
    fault_budget: Option<usize>,
}

struct Watcher {
    path: String,
    sender: watch::Sender<Option<Value>>,
}

fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segs.is_empty() {
        return Err(StoreError::EmptyPath {
            path: path.to_string(),
        });
    }
    Ok(segs)
}

fn value_at<'a>(root: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segs {
        node = node.as_object()?.get(*seg)?;
    }
    Some(node)
}

fn put_at(root: &mut Value, segs: &[&str], value: Value) {
    let mut node = root;
    for seg in &segs[..segs.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(segs[segs.len() - 1].to_string(), value);
    }
}

/// Remove the subtree at `segs`, pruning parents left empty.
fn remove_at(node: &mut Value, segs: &[&str]) {
    let Some(map) = node.as_object_mut() else {
        return;
    };
    if segs.len() == 1 {
        map.remove(segs[0]);
        return;
    }
    if let Some(child) = map.get_mut(segs[0]) {
        remove_at(child, &segs[1..]);
        if child.as_object().is_some_and(|m| m.is_empty()) {
            map.remove(segs[0]);
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                root: Value::Object(Map::new()),
                watchers: Vec::new(),
                fault_budget: None,
            }),
        }
    }

    /// Allow `remaining` further numeric transactions to succeed, then
    /// fail every one after that (for testing interrupted sagas).
    pub async fn fail_transacts_after(&self, remaining: usize) {
        self.inner.write().await.fault_budget = Some(remaining);
    }

    /// Clear any injected fault.
    pub async fn clear_faults(&self) {
        self.inner.write().await.fault_budget = None;
    }

    /// Clone of the full tree (for testing).
    pub async fn dump(&self) -> Value {
        self.inner.read().await.root.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn notify(&mut self) {
        self.watchers.retain(|w| !w.sender.is_closed());
        for watcher in &self.watchers {
            let segs: Vec<&str> = watcher.path.split('/').filter(|s| !s.is_empty()).collect();
            let current = value_at(&self.root, &segs).cloned();
            watcher.sender.send_if_modified(|seen| {
                if *seen != current {
                    *seen = current;
                    true
                } else {
                    false
                }
            });
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segs = segments(path)?;
        let inner = self.inner.read().await;
        Ok(value_at(&inner.root, &segs).cloned())
    }

    async fn apply(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        // Validate every path before touching the tree so a bad key
        // cannot leave the batch half-applied.
        let mut ops = Vec::with_capacity(writes.len());
        for write in &writes {
            ops.push((segments(&write.path)?, write.value.clone()));
        }

        let mut inner = self.inner.write().await;
        for (segs, value) in ops {
            match value {
                Some(v) => put_at(&mut inner.root, &segs, v),
                None => remove_at(&mut inner.root, &segs),
            }
        }
        debug!(keys = writes.len(), "applied multi-key write");
        inner.notify();
        Ok(())
    }

    async fn transact_numeric(&self, path: &str, delta: i64) -> Result<i64, StoreError> {
        let segs = segments(path)?;
        let mut inner = self.inner.write().await;

        match inner.fault_budget {
            Some(0) => {
                return Err(StoreError::Unavailable(
                    "injected disconnect during numeric transaction".to_string(),
                ))
            }
            Some(remaining) => inner.fault_budget = Some(remaining - 1),
            None => {}
        }

        let old = match value_at(&inner.root, &segs) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| StoreError::NotNumeric {
                path: path.to_string(),
            })?,
            Some(_) => {
                return Err(StoreError::NotNumeric {
                    path: path.to_string(),
                })
            }
        };
        let new = old + delta;
        put_at(&mut inner.root, &segs, Value::from(new));
        debug!(path, old, new, "numeric transaction");
        inner.notify();
        Ok(new)
    }

    async fn transact_deltas(&self, deltas: Vec<(String, i64)>) -> Result<(), StoreError> {
        // Repeated paths in one batch accumulate into a single delta.
        let mut merged: BTreeMap<&str, i64> = BTreeMap::new();
        for (path, delta) in &deltas {
            *merged.entry(path.as_str()).or_insert(0) += *delta;
        }
        let mut ops = Vec::with_capacity(merged.len());
        for (path, delta) in merged {
            ops.push((segments(path)?, delta, path));
        }

        let mut inner = self.inner.write().await;
        // Read every current value before writing any, so a bad value
        // aborts the batch untouched.
        let mut staged = Vec::with_capacity(ops.len());
        for (segs, delta, path) in ops {
            let old = match value_at(&inner.root, &segs) {
                None | Some(Value::Null) => 0,
                Some(Value::Number(n)) => n.as_i64().ok_or_else(|| StoreError::NotNumeric {
                    path: path.to_string(),
                })?,
                Some(_) => {
                    return Err(StoreError::NotNumeric {
                        path: path.to_string(),
                    })
                }
            };
            staged.push((segs, old + delta));
        }
        for (segs, new) in staged {
            put_at(&mut inner.root, &segs, Value::from(new));
        }
        debug!(keys = deltas.len(), "applied multi-key delta transaction");
        inner.notify();
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<watch::Receiver<Option<Value>>, StoreError> {
        let segs = segments(path)?;
        let mut inner = self.inner.write().await;
        let current = value_at(&inner.root, &segs).cloned();
        let (tx, rx) = watch::channel(current);
        inner.watchers.push(Watcher {
            path: path.to_string(),
            sender: tx,
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_returns_none_for_missing_path() {
        let store = InMemoryStore::new();
        assert!(store.get("/groups/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get("///").await,
            Err(StoreError::EmptyPath { .. })
        ));
    }

    #[tokio::test]
    async fn apply_writes_and_deletes_in_one_batch() {
        let store = InMemoryStore::new();
        store
            .apply(vec![
                WriteOp::put("/invites/i1", json!({"from": "a"})),
                WriteOp::put("/invites_to/b/i1", json!(true)),
            ])
            .await
            .unwrap();
        assert!(store.get("/invites/i1").await.unwrap().is_some());

        store
            .apply(vec![
                WriteOp::delete("/invites/i1"),
                WriteOp::delete("/invites_to/b/i1"),
            ])
            .await
            .unwrap();
        assert!(store.get("/invites/i1").await.unwrap().is_none());
        // the emptied index node is pruned, not left as an empty object
        assert!(store.get("/invites_to/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_path_aborts_whole_batch() {
        let store = InMemoryStore::new();
        let err = store
            .apply(vec![
                WriteOp::put("/groups/g1", json!({"name": "x"})),
                WriteOp::put("//", json!(1)),
            ])
            .await;
        assert!(err.is_err());
        assert!(store.get("/groups/g1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transact_starts_from_zero_on_absent_key() {
        let store = InMemoryStore::new();
        assert_eq!(store.transact_numeric("/balances/g/u", 500).await.unwrap(), 500);
        assert_eq!(store.transact_numeric("/balances/g/u", -200).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn transact_rejects_non_numeric_values() {
        let store = InMemoryStore::new();
        store
            .apply(vec![WriteOp::put("/balances/g/u", json!("oops"))])
            .await
            .unwrap();
        assert!(matches!(
            store.transact_numeric("/balances/g/u", 1).await,
            Err(StoreError::NotNumeric { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn transact_survives_concurrent_contention() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.transact_numeric("/balances/g/u", 1).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(
            store.get("/balances/g/u").await.unwrap().unwrap(),
            json!(800)
        );
    }

    #[tokio::test]
    async fn delta_batch_applies_both_sides() {
        let store = InMemoryStore::new();
        store
            .transact_deltas(vec![
                ("/balances/g/a".to_string(), 500),
                ("/balances/g/b".to_string(), -500),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("/balances/g/a").await.unwrap().unwrap(), json!(500));
        assert_eq!(store.get("/balances/g/b").await.unwrap().unwrap(), json!(-500));
    }

    #[tokio::test]
    async fn delta_batch_accumulates_repeated_paths() {
        let store = InMemoryStore::new();
        store
            .transact_deltas(vec![
                ("/balances/g/a".to_string(), 500),
                ("/balances/g/a".to_string(), -200),
                ("/balances/g/b".to_string(), -300),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("/balances/g/a").await.unwrap().unwrap(), json!(300));
        assert_eq!(store.get("/balances/g/b").await.unwrap().unwrap(), json!(-300));
    }

    #[tokio::test]
    async fn delta_batch_aborts_whole_on_bad_value() {
        let store = InMemoryStore::new();
        store
            .apply(vec![WriteOp::put("/balances/g/b", json!("oops"))])
            .await
            .unwrap();
        let err = store
            .transact_deltas(vec![
                ("/balances/g/a".to_string(), 500),
                ("/balances/g/b".to_string(), -500),
            ])
            .await;
        assert!(matches!(err, Err(StoreError::NotNumeric { .. })));
        // the first leg must not have landed
        assert!(store.get("/balances/g/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn watch_sees_initial_absence_then_changes() {
        let store = InMemoryStore::new();
        let mut rx = store.watch("/groups/g1").await.unwrap();
        assert!(rx.borrow().is_none());

        store
            .apply(vec![WriteOp::put("/groups/g1/name", json!("Mess"))])
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().clone().unwrap(), json!({"name": "Mess"}));

        store.apply(vec![WriteOp::delete("/groups/g1")]).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn injected_fault_trips_after_budget() {
        let store = InMemoryStore::new();
        store.fail_transacts_after(1).await;
        assert!(store.transact_numeric("/balances/g/a", 10).await.is_ok());
        assert!(matches!(
            store.transact_numeric("/balances/g/b", -10).await,
            Err(StoreError::Unavailable(_))
        ));
        store.clear_faults().await;
        assert!(store.transact_numeric("/balances/g/b", -10).await.is_ok());
    }
}
