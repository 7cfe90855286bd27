//! Preference resolution over the provider registry
//!
//! Resolution is read-only and deterministic: given a fixed registry
//! snapshot it always produces the same route. Results are never cached
//! across calls.

use crate::registry::record::{CostTier, ProviderCategory, ProviderRecord, ResolvedRoute};
use crate::registry::store::ProviderRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::governor::PeriodKind;

/// Errors from route resolution
#[derive(Debug, Clone, PartialEq)]
pub enum RouteError {
    /// No valid candidate exists. An expected steady state (nothing
    /// configured yet), surfaced as a first-class variant rather than a
    /// panic-worthy failure.
    NoProviderAvailable { category: Option<ProviderCategory> },

    /// Cost limits are enabled, the period is degraded, and no valid
    /// fallback provider exists. Fails closed rather than silently
    /// exceeding the limit; invocations halt until the period rolls over
    /// or configuration changes.
    BudgetExceeded { period: PeriodKind },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProviderAvailable { category } => match category {
                Some(c) => write!(f, "no provider available in category {}", c),
                None => write!(f, "no provider available"),
            },
            Self::BudgetExceeded { period } => write!(
                f,
                "budget exceeded for {} period and no valid fallback provider configured",
                period
            ),
        }
    }
}

impl std::error::Error for RouteError {}

/// Applies the category precedence rules over the registry
pub struct PreferenceResolver {
    registry: Arc<ProviderRegistry>,
}

impl PreferenceResolver {
    /// Create a resolver over the given registry
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the single active route for a requested category.
    ///
    /// Order of checks:
    /// 1. `Some(Cloud)`: the cloud configuration directly; local/custom
    ///    are never consulted.
    /// 2. `Some(Local)` / `Some(Custom)`: preferred-and-valid record in
    ///    that category, else first valid record with an endpoint.
    /// 3. `None`: local preferred-or-first, then custom
    ///    preferred-or-first; first valid hit wins. Self-hosted backends
    ///    win over user-supplied cloud keys when no category is named.
    pub fn resolve(
        &self,
        requested: Option<ProviderCategory>,
    ) -> Result<ResolvedRoute, RouteError> {
        match requested {
            Some(ProviderCategory::Cloud) => self.resolve_cloud(),
            Some(category) => self
                .pick_in_category(category)
                .map(|record| self.route_from(&record))
                .ok_or(RouteError::NoProviderAvailable {
                    category: Some(category),
                }),
            None => self
                .pick_in_category(ProviderCategory::Local)
                .or_else(|| self.pick_in_category(ProviderCategory::Custom))
                .map(|record| self.route_from(&record))
                .ok_or(RouteError::NoProviderAvailable { category: None }),
        }
    }

    /// Cloud has no preference semantics beyond its selected model; the
    /// configuration is returned directly.
    fn resolve_cloud(&self) -> Result<ResolvedRoute, RouteError> {
        let clouds = self.registry.list_by_category(ProviderCategory::Cloud);
        clouds
            .iter()
            .find(|r| r.is_preferred)
            .or_else(|| clouds.first())
            .map(|record| self.route_from(record))
            .ok_or(RouteError::NoProviderAvailable {
                category: Some(ProviderCategory::Cloud),
            })
    }

    /// Preferred-and-valid, else first valid record with an endpoint
    fn pick_in_category(&self, category: ProviderCategory) -> Option<ProviderRecord> {
        let records = self.registry.list_by_category(category);

        if let Some(preferred) = records.iter().find(|r| r.is_preferred && r.is_valid) {
            return Some(preferred.clone());
        }

        records
            .iter()
            .find(|r| r.is_valid && !r.endpoint.trim().is_empty())
            .cloned()
    }

    fn route_from(&self, record: &ProviderRecord) -> ResolvedRoute {
        debug!(provider_id = %record.id, category = %record.category, "resolved route");
        ResolvedRoute::from_record(record, CostTier::default())
    }
}
