//! In-memory credential store

use std::collections::BTreeMap;

use crate::store::{CredentialStore, KeyringError};

/// A credential store backed by a plain map.
///
/// Populated up front and then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    /// Builder-style [`MemoryStore::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        self.items
            .get(key)
            .cloned()
            .ok_or_else(|| KeyringError::NotFound(key.to_string()))
    }
}

impl FromIterator<(String, String)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
