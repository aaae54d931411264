use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;

/// One key in a multi-key write: a put or a subtree delete.
#[derive(Clone, Debug)]
pub struct WriteOp {
    pub path: String,
    /// `None` deletes the subtree at `path`.
    pub value: Option<Value>,
}

impl WriteOp {
    pub fn put(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
        }
    }
}

/// Contract with the synchronized backing store.
///
/// Guarantees required of any implementation:
///
/// - [`apply`](RemoteStore::apply) is all-or-nothing: either every write
///   in the batch lands and becomes visible to subscribers atomically,
///   or none does. No partial batch is ever observable.
/// - [`transact_numeric`](RemoteStore::transact_numeric) is an atomic
///   read-modify-write (`new = old + delta`) on one value, safe under
///   unbounded concurrent contention; implementations retry internally
///   on conflicting writes rather than surfacing conflicts.
/// - [`watch`](RemoteStore::watch) delivers the current value as the
///   initial observation (possibly `None` before any data exists) and a
///   notification for every subsequent change at or below the path.
///   Last write wins per key; no stronger caching semantics.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the value at a path. `None` if nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Apply a multi-key write atomically.
    async fn apply(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Atomically add `delta` to the integer at `path` (absent counts
    /// as zero) and return the new value.
    async fn transact_numeric(&self, path: &str, delta: i64) -> Result<i64, StoreError>;

    /// Apply several numeric deltas as one all-or-nothing write.
    /// Repeated paths accumulate into a single delta. Settlements use
    /// this so a conservative pair of balance mutations can never be
    /// observed half-applied.
    async fn transact_deltas(&self, deltas: Vec<(String, i64)>) -> Result<(), StoreError>;

    /// Subscribe to the subtree at `path`.
    async fn watch(&self, path: &str) -> Result<watch::Receiver<Option<Value>>, StoreError>;
}
