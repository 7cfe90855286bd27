//! Durable keyed store of provider records
//!
//! The registry is the single write path for provider state. Preference
//! flips are a clear-all-then-set-one transaction inside one write-lock
//! critical section, so readers never observe two preferred records.
//! Records keep insertion order; "first record in a category" during
//! resolution means first inserted.

use crate::config::error::ValidationError;
use crate::registry::record::{ProviderCategory, ProviderRecord};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from registry mutations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("no provider record with id '{id}'")]
    NotFound { id: String },

    #[error("record '{id}' is in category {actual}, not {requested}")]
    CategoryMismatch {
        id: String,
        requested: ProviderCategory,
        actual: ProviderCategory,
    },
}

/// Serializable registry state, for host-side persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub records: Vec<ProviderRecord>,
    /// One-time migration flag (see `registry::migration`)
    #[serde(default)]
    pub migrated: bool,
}

/// Keyed store of provider records, partitioned by category
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    inner: RwLock<Vec<ProviderRecord>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    ///
    /// A write that sets `is_preferred` clears the flag on every other
    /// record before committing, keeping the at-most-one invariant.
    pub fn put(&self, record: ProviderRecord) -> Result<(), RegistryError> {
        record.validate()?;

        let mut records = self.inner.write().expect("registry lock poisoned");
        if record.is_preferred {
            for existing in records.iter_mut() {
                existing.is_preferred = false;
            }
        }

        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                debug!(id = %record.id, category = %record.category, "updating provider record");
                *slot = record;
            }
            None => {
                info!(id = %record.id, category = %record.category, "adding provider record");
                records.push(record);
            }
        }

        Ok(())
    }

    /// Remove a record, returning it if present.
    ///
    /// Removing the preferred record leaves no record preferred; the
    /// resolver falls back to defaults rather than erroring. Routing
    /// assignments pointing at the id are cleared by the engine cascade.
    pub fn remove(&self, id: &str) -> Option<ProviderRecord> {
        let mut records = self.inner.write().expect("registry lock poisoned");
        let pos = records.iter().position(|r| r.id == id)?;
        let removed = records.remove(pos);
        info!(id = %removed.id, category = %removed.category, "removed provider record");
        Some(removed)
    }

    /// Fetch a record by id
    pub fn get(&self, id: &str) -> Option<ProviderRecord> {
        let records = self.inner.read().expect("registry lock poisoned");
        records.iter().find(|r| r.id == id).cloned()
    }

    /// All records in a category, in insertion order
    pub fn list_by_category(&self, category: ProviderCategory) -> Vec<ProviderRecord> {
        let records = self.inner.read().expect("registry lock poisoned");
        records
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// All records, in insertion order
    pub fn list(&self) -> Vec<ProviderRecord> {
        self.inner.read().expect("registry lock poisoned").clone()
    }

    /// The globally preferred record, if any
    pub fn get_preferred(&self) -> Option<ProviderRecord> {
        let records = self.inner.read().expect("registry lock poisoned");
        records.iter().find(|r| r.is_preferred).cloned()
    }

    /// Atomically make `id` the single preferred record, or clear the
    /// preference entirely with `None`.
    pub fn set_preferred(
        &self,
        category: ProviderCategory,
        id: Option<&str>,
    ) -> Result<(), RegistryError> {
        let mut records = self.inner.write().expect("registry lock poisoned");

        // Validate the target before touching any flag.
        if let Some(id) = id {
            let target = records
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
            if target.category != category {
                return Err(RegistryError::CategoryMismatch {
                    id: id.to_string(),
                    requested: category,
                    actual: target.category,
                });
            }
        }

        for record in records.iter_mut() {
            record.is_preferred = false;
        }
        if let Some(id) = id {
            if let Some(target) = records.iter_mut().find(|r| r.id == id) {
                target.is_preferred = true;
                info!(id = %id, category = %category, "preferred provider changed");
            }
        } else {
            info!(category = %category, "preferred provider cleared");
        }

        Ok(())
    }

    /// Flip a record's validity after a connectivity check
    pub fn set_validity(&self, id: &str, is_valid: bool) -> Result<(), RegistryError> {
        let mut records = self.inner.write().expect("registry lock poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        record.is_valid = is_valid;
        debug!(id = %id, is_valid, "provider validity updated");
        Ok(())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").len()
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current state, for persistence
    pub fn snapshot(&self) -> Vec<ProviderRecord> {
        self.list()
    }

    /// Replace the current state with a snapshot
    pub fn restore(&self, records: Vec<ProviderRecord>) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        *inner = records;
    }
}
