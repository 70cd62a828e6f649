//! Remote profile documents, one per user.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use recipeshare_core::{UserId, UserProfile};

use crate::error::RemoteError;

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>, RemoteError>;

    /// Full-document overwrite.
    async fn put(&self, profile: UserProfile) -> Result<(), RemoteError>;
}

#[async_trait]
impl<S> ProfileDirectory for Arc<S>
where
    S: ProfileDirectory + ?Sized,
{
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>, RemoteError> {
        (**self).get(user_id).await
    }

    async fn put(&self, profile: UserProfile) -> Result<(), RemoteError> {
        (**self).put(profile).await
    }
}

/// In-memory profile directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProfileDirectory {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
    offline: RwLock<bool>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut o) = self.offline.write() {
            *o = offline;
        }
    }

    fn is_offline(&self) -> bool {
        self.offline.read().map(|o| *o).unwrap_or(false)
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>, RemoteError> {
        if self.is_offline() {
            return Err(RemoteError::unavailable("profile directory is offline"));
        }
        let profiles = self
            .profiles
            .read()
            .map_err(|_| RemoteError::unavailable("lock poisoned"))?;
        Ok(profiles.get(user_id).cloned())
    }

    async fn put(&self, profile: UserProfile) -> Result<(), RemoteError> {
        if self.is_offline() {
            return Err(RemoteError::write_failed("profile directory is offline"));
        }
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| RemoteError::write_failed("lock poisoned"))?;
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}
