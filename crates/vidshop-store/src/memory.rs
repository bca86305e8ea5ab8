//! In-process settings store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vidshop_core::ScopeId;

use crate::error::Result;
use crate::SettingsStore;

/// A [`SettingsStore`] kept in memory.
///
/// Useful for running a shop against fixed settings without touching the
/// database, and for tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    global: RwLock<HashMap<String, String>>,
    scoped: RwLock<HashMap<(ScopeId, String), String>>,
}

impl MemorySettings {
    /// Create an empty settings store (every key at its default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.global.read().await.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.global
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_scoped(&self, scope: ScopeId, key: &str) -> Result<Option<String>> {
        Ok(self
            .scoped
            .read()
            .await
            .get(&(scope, key.to_string()))
            .cloned())
    }

    async fn set_scoped(&self, scope: ScopeId, key: &str, value: &str) -> Result<()> {
        self.scoped
            .write()
            .await
            .insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    async fn clear_scoped(&self, scope: ScopeId, key: &str) -> Result<bool> {
        Ok(self
            .scoped
            .write()
            .await
            .remove(&(scope, key.to_string()))
            .is_some())
    }
}
