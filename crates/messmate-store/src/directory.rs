//! Typed reads and writes for the profile projection and the email
//! directory. Both ledgers go through this layer instead of touching
//! raw tree values.

use std::sync::Arc;

use messmate_types::{email_key, now_millis, paths, PublicProfile, UserId};
use serde_json::Value;
use tracing::debug;

use crate::error::{DirectoryError, StoreError};
use crate::store::{RemoteStore, WriteOp};

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn RemoteStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Read a user's public projection. `None` when the user has not
    /// completed onboarding yet.
    pub async fn public_profile(
        &self,
        uid: &UserId,
    ) -> Result<Option<PublicProfile>, StoreError> {
        let path = paths::public_profile(uid);
        match self.store.get(&path).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { path, source }),
        }
    }

    /// Write a user's public projection. Validates invariants and
    /// stamps `updated_at`; only the owner's code path may call this.
    pub async fn save_public_profile(
        &self,
        uid: &UserId,
        profile: &PublicProfile,
    ) -> Result<(), DirectoryError> {
        profile.validate()?;
        let mut record = profile.clone();
        record.updated_at = now_millis();
        let value = serde_json::to_value(&record).map_err(|source| StoreError::Corrupt {
            path: paths::public_profile(uid),
            source,
        })?;
        self.store
            .apply(vec![WriteOp::put(paths::public_profile(uid), value)])
            .await?;
        debug!(%uid, "saved public profile");
        Ok(())
    }

    /// Look up a uid by email address through the normalized index.
    pub async fn uid_for_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        let path = paths::email_to_uid(&email_key(email));
        match self.store.get(&path).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value::<String>(value)
                .map(|uid| Some(UserId::new(uid)))
                .map_err(|source| StoreError::Corrupt { path, source }),
        }
    }

    /// Register a user's email in the directory index.
    pub async fn register_email(&self, email: &str, uid: &UserId) -> Result<(), StoreError> {
        self.store
            .apply(vec![WriteOp::put(
                paths::email_to_uid(&email_key(email)),
                Value::String(uid.0.clone()),
            )])
            .await
    }
}
