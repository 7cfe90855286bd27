//! Engine facade wiring the registry, routing, governance, and
//! execution layers behind one surface
//!
//! Per agent call: the routing table resolves the agent type to a
//! provider and tier (or falls back to the preference resolver's
//! default), the cost governor may substitute a cheaper fallback or
//! fail closed, and the fallback executor performs the call.

use crate::config::secrets::SecretString;
use crate::config::{AutoScalingPolicy, EngineConfig};
use crate::executor::invoke::{FallbackExecutor, FallbackPolicy, InvocationError, InvocationOutcome};
use crate::executor::retry::RetryPolicy;
use crate::executor::transport::InvocationTransport;
use crate::governor::{BudgetReport, BudgetState, CostGovernor, CostLimitPolicy, PeriodKind, WarningObserver};
use crate::registry::migration::{LegacyProviderRecord, LegacySource, MigrationAdapter, MigrationError};
use crate::registry::record::{CostTier, ProviderCategory, ProviderRecord, ResolvedRoute};
use crate::registry::store::{ProviderRegistry, RegistryError, RegistrySnapshot};
use crate::routing::resolver::{PreferenceResolver, RouteError};
use crate::routing::table::{AgentComplexity, RoutingTable};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// The provider routing and resolution engine
pub struct RoutingEngine {
    registry: Arc<ProviderRegistry>,
    resolver: PreferenceResolver,
    table: RoutingTable,
    governor: CostGovernor,
    executor: FallbackExecutor,
    migration: MigrationAdapter,
    policy: RwLock<AutoScalingPolicy>,
    default_timeout: Duration,
}

impl RoutingEngine {
    /// Create an engine with an empty registry and default policy
    pub fn new(transport: Arc<dyn InvocationTransport>) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        Self {
            resolver: PreferenceResolver::new(registry.clone()),
            table: RoutingTable::new(),
            governor: CostGovernor::new(),
            executor: FallbackExecutor::new(transport, registry.clone()),
            migration: MigrationAdapter::new(registry.clone()),
            registry,
            policy: RwLock::new(AutoScalingPolicy::default()),
            default_timeout: Duration::from_secs(60),
        }
    }

    /// Create an engine seeded from a validated configuration
    pub fn from_config(
        config: EngineConfig,
        transport: Arc<dyn InvocationTransport>,
    ) -> Result<Self, RegistryError> {
        let engine = Self::new(transport);

        for seed in &config.providers {
            let mut record = ProviderRecord::new(seed.category, seed.name.clone());
            if let Some(id) = &seed.id {
                record.id = id.clone();
            }
            record.endpoint = seed.endpoint.clone();
            record.model = seed.model.clone();
            record.credential = SecretString::new(seed.api_key.expose_secret());
            record.is_valid = seed.valid;
            record.is_preferred = seed.preferred;
            record.extra_params = seed.extra_params.clone();
            engine.registry.put(record)?;
        }

        engine
            .table
            .set_complexity_routing(config.routing.complexity_routing);
        for assignment in &config.routing.assignments {
            engine.table.assign(
                assignment.agent_type.clone(),
                assignment.provider.clone(),
                assignment.cost_tier,
            );
            if let Some(complexity) = assignment.complexity {
                engine
                    .table
                    .set_complexity(assignment.agent_type.clone(), complexity);
            }
        }

        *engine.policy.write().expect("policy lock poisoned") = config.auto_scaling;
        Ok(Self {
            default_timeout: Duration::from_millis(config.connection.request_timeout_ms),
            ..engine
        })
    }

    // ---- provider registry surface ----

    /// Insert or update a provider record
    pub fn put_provider(&self, record: ProviderRecord) -> Result<(), RegistryError> {
        self.registry.put(record)
    }

    /// Remove a provider record, cascading to routing assignments
    pub fn remove_provider(&self, id: &str) -> Option<ProviderRecord> {
        let removed = self.registry.remove(id)?;
        self.table.unassign_provider(id);
        Some(removed)
    }

    /// Fetch a provider record
    pub fn get_provider(&self, id: &str) -> Option<ProviderRecord> {
        self.registry.get(id)
    }

    /// Providers in a category, in insertion order
    pub fn list_providers(&self, category: ProviderCategory) -> Vec<ProviderRecord> {
        self.registry.list_by_category(category)
    }

    /// Atomically change the preferred provider
    pub fn set_preferred(
        &self,
        category: ProviderCategory,
        id: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.registry.set_preferred(category, id)
    }

    /// Flip a provider's validity after a connectivity check
    pub fn set_provider_validity(&self, id: &str, is_valid: bool) -> Result<(), RegistryError> {
        self.registry.set_validity(id, is_valid)
    }

    /// Direct registry access for persistence and advanced use
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Serializable engine state (records plus the migration flag).
    /// Where and how it is stored is the host's concern.
    pub fn export_state(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            records: self.registry.snapshot(),
            migrated: self.migration.is_migrated(),
        }
    }

    /// Replace engine state from a previously exported snapshot
    pub fn import_state(&self, snapshot: RegistrySnapshot) {
        self.registry.restore(snapshot.records);
        self.migration.set_migrated(snapshot.migrated);
    }

    // ---- routing surface ----

    /// Resolve the active route for a requested category (or the
    /// default). Budget governance does not apply here; it applies on
    /// the per-agent path.
    pub fn resolve(
        &self,
        category: Option<ProviderCategory>,
    ) -> Result<ResolvedRoute, RouteError> {
        self.resolver.resolve(category)
    }

    /// Resolve the route for an agent type, applying assignments,
    /// complexity routing, and budget governance
    pub fn route_for(&self, agent_type: &str) -> Result<ResolvedRoute, RouteError> {
        let route = self.base_route_for(agent_type)?;
        self.govern(route)
    }

    /// Assign an agent type to a provider and cost tier
    pub fn assign(
        &self,
        agent_type: impl Into<String>,
        provider_id: Option<String>,
        cost_tier: CostTier,
    ) {
        self.table.assign(agent_type, provider_id, cost_tier);
    }

    /// Remove the assignment for an agent type
    pub fn unassign(&self, agent_type: &str) {
        self.table.unassign(agent_type);
    }

    /// Attach a complexity label to an agent type
    pub fn set_complexity(&self, agent_type: impl Into<String>, complexity: AgentComplexity) {
        self.table.set_complexity(agent_type, complexity);
    }

    /// Enable or disable complexity-based routing
    pub fn set_complexity_routing(&self, enabled: bool) {
        self.table.set_complexity_routing(enabled);
    }

    /// The routing table, for inspection
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    // ---- governance surface ----

    /// Record spend against both billing periods
    pub fn record_usage(&self, amount: f64) {
        self.governor.record_usage(amount);
    }

    /// Evaluate budget state against the current policy
    pub fn check_budget(&self) -> BudgetReport {
        self.governor.check_budget(&self.cost_policy())
    }

    /// Register a budget warning observer
    pub fn on_budget_warning(&self, observer: WarningObserver) {
        self.governor.on_warning(observer);
    }

    /// Current auto-scaling policy
    pub fn policy(&self) -> AutoScalingPolicy {
        self.policy.read().expect("policy lock poisoned").clone()
    }

    /// Replace the auto-scaling policy
    pub fn set_policy(&self, policy: AutoScalingPolicy) -> Result<(), crate::config::ValidationError> {
        policy.validate("auto_scaling")?;
        info!("auto-scaling policy updated");
        *self.policy.write().expect("policy lock poisoned") = policy;
        Ok(())
    }

    // ---- execution surface ----

    /// Invoke the backend behind `route`, with bounded retries and the
    /// configured fallback swap. `timeout` bounds each attempt;
    /// defaults to the connection config's request timeout.
    pub async fn invoke(
        &self,
        route: &ResolvedRoute,
        payload: &Value,
        timeout: Option<Duration>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let policy = self.policy();
        let fallback = FallbackPolicy {
            enabled: policy.fallback_enabled,
            provider_id: policy.fallback_provider.clone(),
            max_retries: policy.max_retries,
            retry: RetryPolicy::fixed(Duration::from_millis(policy.retry_delay_ms)),
        };
        self.executor
            .invoke(
                route,
                payload,
                timeout.unwrap_or(self.default_timeout),
                &fallback,
            )
            .await
    }

    // ---- migration surface ----

    /// Import already-fetched legacy provider records (one-shot)
    pub fn import_legacy_records(
        &self,
        records: &[LegacyProviderRecord],
    ) -> Result<(), MigrationError> {
        self.migration.import_records(records)
    }

    /// Fetch from the legacy source and import (one-shot)
    pub async fn run_migration(&self, source: &dyn LegacySource) -> Result<(), MigrationError> {
        self.migration.run(source).await
    }

    /// True once the legacy migration has completed
    pub fn is_migrated(&self) -> bool {
        self.migration.is_migrated()
    }

    /// The migration adapter, for flag persistence
    pub fn migration(&self) -> &MigrationAdapter {
        &self.migration
    }

    // ---- internals ----

    /// Assignment, complexity policy, or default resolution
    fn base_route_for(&self, agent_type: &str) -> Result<ResolvedRoute, RouteError> {
        let hint = self.table.lookup(agent_type);
        let tier = hint.as_ref().map(|h| h.cost_tier).unwrap_or_default();

        // Direct assignment to a valid provider wins.
        if let Some(provider_id) = hint.as_ref().and_then(|h| h.provider_id.as_deref()) {
            if let Some(record) = self.registry.get(provider_id) {
                if record.is_valid {
                    return Ok(ResolvedRoute::from_record(&record, tier));
                }
            }
            // Assigned provider missing or invalid: fall back to the
            // default route rather than erroring.
        }

        // Complexity policy applies only to the unassigned path.
        if self.table.complexity_routing_enabled() {
            if let Some(wanted) = self
                .table
                .complexity_of(agent_type)
                .and_then(|c| c.preferred_tier())
            {
                if let Some(provider_id) = self.table.provider_for_tier(wanted) {
                    if let Some(record) = self.registry.get(&provider_id) {
                        if record.is_valid {
                            return Ok(ResolvedRoute::from_record(&record, wanted));
                        }
                    }
                }
            }
        }

        let mut route = self.resolver.resolve(None)?;
        route.cost_tier = tier;
        Ok(route)
    }

    /// Apply budget governance to a resolved route
    fn govern(&self, route: ResolvedRoute) -> Result<ResolvedRoute, RouteError> {
        let report = self.check_budget();
        if report.state != BudgetState::Degraded {
            return Ok(route);
        }

        if let Some(fallback_id) = &report.recommended_provider {
            if let Some(record) = self.registry.get(fallback_id) {
                if record.is_valid {
                    info!(
                        original = %route.provider_id,
                        fallback = %record.id,
                        "budget degraded; substituting cost fallback provider"
                    );
                    return Ok(ResolvedRoute::from_record(&record, route.cost_tier).degraded());
                }
            }
        }

        // Cost limits are on, the period is degraded, and no valid
        // fallback exists: fail closed rather than exceed the limit.
        Err(RouteError::BudgetExceeded {
            period: report.period.unwrap_or(PeriodKind::Daily),
        })
    }

    fn cost_policy(&self) -> CostLimitPolicy {
        let policy = self.policy.read().expect("policy lock poisoned");
        CostLimitPolicy {
            enabled: policy.cost_limit_enabled,
            daily_limit: policy.daily_cost_limit,
            monthly_limit: policy.monthly_cost_limit,
            fallback_provider: policy.cost_limit_fallback_provider.clone(),
            warn_at_percentage: policy.warn_at_percentage,
            downgrade_at_percentage: policy.downgrade_at_percentage,
        }
    }
}
