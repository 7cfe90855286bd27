//! Provider registry: records, the keyed store, and legacy migration

pub mod migration;
pub mod record;
pub mod store;

pub use migration::{
    LegacyProviderRecord, LegacySource, MigrationAdapter, MigrationError, SourceError,
};
pub use record::{CostTier, ProviderCategory, ProviderRecord, ResolvedRoute};
pub use store::{ProviderRegistry, RegistryError, RegistrySnapshot};
