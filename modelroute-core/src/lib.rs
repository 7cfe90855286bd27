//! Modelroute Core Library
//!
//! Provider routing and resolution engine: decides which language-model
//! backend (hosted cloud, self-hosted local, or bring-your-own-key
//! custom) serves each agent invocation, enforces a single globally
//! preferred backend, applies per-agent-type routing overrides, degrades
//! routes under budget pressure, and wraps invocations with bounded
//! retries and a fallback swap.

pub mod config;
pub mod engine;
pub mod executor;
pub mod governor;
pub mod registry;
pub mod routing;

pub use config::{AutoScalingPolicy, EngineConfig, SecretString};
pub use engine::RoutingEngine;
pub use executor::{
    FallbackExecutor, FallbackPolicy, HttpTransport, InvocationError, InvocationOutcome,
    InvocationTransport, RetryPolicy, TransportError,
};
pub use governor::{BudgetReport, BudgetState, CostGovernor, CostUsageSnapshot, PeriodKind};
pub use registry::{
    CostTier, LegacyProviderRecord, LegacySource, MigrationAdapter, MigrationError,
    ProviderCategory, ProviderRecord, ProviderRegistry, RegistryError, ResolvedRoute,
};
pub use routing::{AgentComplexity, PreferenceResolver, RouteError, RoutingAssignment, RoutingTable};

/// Returns the version of the modelroute core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
