//! One-time import of legacy server-held provider records
//!
//! The legacy store keyed providers by free-form name. Import splits
//! records into `local` (recognized self-hosted platforms) vs `custom`
//! by a fixed allowlist, derives stable ids from the names, and honors
//! the source's `prefer` flag through the registry's single-preferred
//! invariant. The migrated flag is set after a successful pass even when
//! the source held no records, so startup never re-queries the legacy
//! store; an unreachable source leaves the flag unset and the import is
//! retried on the next startup.

use crate::registry::record::{ProviderCategory, ProviderRecord};
use crate::registry::store::{ProviderRegistry, RegistryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Self-hosted platform names recognized as `local` providers
const LOCAL_PLATFORMS: &[&str] = &[
    "ollama",
    "lmstudio",
    "llamacpp",
    "localai",
    "vllm",
    "gpt4all",
    "jan",
    "koboldcpp",
];

/// A provider record as the legacy server store held it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyProviderRecord {
    pub provider_name: String,
    #[serde(default)]
    pub endpoint_url: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub prefer: bool,
    #[serde(default)]
    pub is_valid: bool,
}

/// Read-only legacy provider source, consumed exactly once
#[async_trait]
pub trait LegacySource: Send + Sync {
    /// Fetch all legacy records. An `Err` means the source was
    /// unreachable, not that it was empty.
    async fn fetch(&self) -> Result<Vec<LegacyProviderRecord>, SourceError>;
}

/// Failure reaching the legacy source
#[derive(Debug, Error)]
#[error("legacy source unreachable: {message}")]
pub struct SourceError {
    pub message: String,
}

/// Errors from the migration pass
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The source could not be reached; the migrated flag stays unset so
    /// the import retries on next startup.
    #[error("legacy source unreachable: {message}")]
    SourceUnreachable { message: String },

    #[error("registry rejected migrated record: {0}")]
    Registry(#[from] RegistryError),
}

/// One-time, idempotent importer of legacy provider records
pub struct MigrationAdapter {
    registry: Arc<ProviderRegistry>,
    migrated: AtomicBool,
}

impl MigrationAdapter {
    /// Create an adapter over the given registry
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            migrated: AtomicBool::new(false),
        }
    }

    /// True once a migration pass has completed
    pub fn is_migrated(&self) -> bool {
        self.migrated.load(Ordering::SeqCst)
    }

    /// Restore the flag from persisted state
    pub fn set_migrated(&self, migrated: bool) {
        self.migrated.store(migrated, Ordering::SeqCst);
    }

    /// Re-arm the adapter so a host can deliberately run another pass
    pub fn reset_for_retry(&self) {
        self.migrated.store(false, Ordering::SeqCst);
    }

    /// Fetch from the legacy source and import. Unreachable sources do
    /// not set the migrated flag.
    pub async fn run(&self, source: &dyn LegacySource) -> Result<(), MigrationError> {
        if self.is_migrated() {
            return Ok(());
        }

        let records = source
            .fetch()
            .await
            .map_err(|e| MigrationError::SourceUnreachable { message: e.message })?;

        self.import_records(&records)
    }

    /// Import already-fetched legacy records. No-op once migrated; the
    /// flag is set on completion regardless of how many records were
    /// found.
    pub fn import_records(
        &self,
        records: &[LegacyProviderRecord],
    ) -> Result<(), MigrationError> {
        if self.is_migrated() {
            return Ok(());
        }

        let mut imported = 0usize;
        for legacy in records {
            let category = categorize(&legacy.provider_name);

            if legacy.endpoint_url.trim().is_empty() {
                // Legacy rows without an endpoint cannot be routed to;
                // the old client showed them as unconfigured placeholders.
                warn!(name = %legacy.provider_name, "skipping legacy record without endpoint");
                continue;
            }

            let record = ProviderRecord {
                id: legacy_id(&legacy.provider_name),
                category,
                display_name: legacy.provider_name.clone(),
                endpoint: legacy.endpoint_url.clone(),
                model: legacy.model_type.clone(),
                credential: legacy.api_key.clone().into(),
                is_valid: legacy.is_valid,
                is_preferred: legacy.prefer,
                extra_params: Default::default(),
            };

            // `put` enforces the single-preferred invariant, so a
            // preferred legacy record becomes THE preferred record.
            self.registry.put(record)?;
            imported += 1;
        }

        info!(imported, total = records.len(), "legacy provider migration complete");
        self.migrated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Split a legacy provider name into local vs custom
fn categorize(provider_name: &str) -> ProviderCategory {
    let normalized = normalize(provider_name);
    if LOCAL_PLATFORMS.contains(&normalized.as_str()) {
        ProviderCategory::Local
    } else {
        ProviderCategory::Custom
    }
}

/// Stable id for an imported record, so re-import never duplicates
fn legacy_id(provider_name: &str) -> String {
    format!("legacy-{}", normalize(provider_name))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}
