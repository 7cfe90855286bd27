//! End-to-end engine tests: configuration seeding, the exposed routing
//! surface, and invocation with fallback through the engine.

use async_trait::async_trait;
use modelroute_core::config::EngineConfig;
use modelroute_core::engine::RoutingEngine;
use modelroute_core::executor::transport::{InvocationTransport, TransportError};
use modelroute_core::governor::BudgetState;
use modelroute_core::registry::record::{CostTier, ProviderCategory, ResolvedRoute};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport that replays a scripted sequence of results
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvocationTransport for ScriptedTransport {
    async fn invoke(
        &self,
        route: &ResolvedRoute,
        _payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(route.provider_id.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(json!({"ok": true})))
    }
}

fn config() -> EngineConfig {
    serde_yaml::from_str(
        r#"
version: "0.1"
providers:
  - id: hosted
    name: Hosted
    category: cloud
    model: large-v2
  - id: ollama
    name: Ollama
    category: local
    endpoint: http://localhost:11434
    model: llama3
    valid: true
  - id: openrouter
    name: OpenRouter
    category: custom
    endpoint: https://openrouter.ai/api/v1
    model: auto
    api_key: sk-or-test
    valid: true
routing:
  complexity_routing: true
  assignments:
    - agent_type: planner
      provider: openrouter
      cost_tier: premium
    - agent_type: greeter
      cost_tier: cheap
      complexity: simple
auto_scaling:
  fallback_enabled: true
  fallback_provider: ollama
  max_retries: 1
  retry_delay_ms: 0
  cost_limit_enabled: true
  daily_cost_limit: 10.0
  monthly_cost_limit: 200.0
  cost_limit_fallback_provider: ollama
  warn_at_percentage: 80
  downgrade_at_percentage: 90
"#,
    )
    .unwrap()
}

#[test]
fn test_from_config_seeds_registry_and_table() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    assert_eq!(engine.list_providers(ProviderCategory::Cloud).len(), 1);
    assert_eq!(engine.list_providers(ProviderCategory::Local).len(), 1);
    assert_eq!(engine.list_providers(ProviderCategory::Custom).len(), 1);

    // Assignment routes planner to the custom provider.
    let route = engine.route_for("planner").unwrap();
    assert_eq!(route.provider_id, "openrouter");
    assert_eq!(route.cost_tier, CostTier::Premium);

    // Unassigned agent types get the default (local-first) route.
    let route = engine.route_for("browser").unwrap();
    assert_eq!(route.provider_id, "ollama");
}

#[test]
fn test_cloud_resolution_through_engine() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    let route = engine.resolve(Some(ProviderCategory::Cloud)).unwrap();
    assert_eq!(route.provider_id, "hosted");
    assert_eq!(route.model, "large-v2");
}

#[test]
fn test_complexity_routing_from_config() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    // "greeter" is simple and unassigned; the cheap-tier scan finds no
    // cheap-tier provider assignment with a target, so it falls back to
    // the default route.
    let route = engine.route_for("greeter").unwrap();
    assert_eq!(route.provider_id, "ollama");
    assert_eq!(route.cost_tier, CostTier::Cheap);

    // Give the cheap tier a concrete target; the scan now matches.
    engine.assign("summarizer", Some("openrouter".to_string()), CostTier::Cheap);
    let route = engine.route_for("greeter").unwrap();
    assert_eq!(route.provider_id, "openrouter");
}

#[tokio::test]
async fn test_invoke_uses_configured_fallback() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Ok(json!({"served_by": "fallback"})),
    ]);
    let engine = RoutingEngine::from_config(config(), transport.clone()).unwrap();

    let route = engine.route_for("planner").unwrap();
    let outcome = engine
        .invoke(&route, &json!({"prompt": "hi"}), Some(Duration::from_secs(1)))
        .await
        .unwrap();

    // max_retries = 1: two primary attempts, then the ollama fallback.
    assert!(outcome.used_fallback);
    assert_eq!(outcome.provider_id, "ollama");
    assert_eq!(
        transport.calls(),
        vec![
            "openrouter".to_string(),
            "openrouter".to_string(),
            "ollama".to_string()
        ]
    );
}

#[tokio::test]
async fn test_full_flow_usage_degrades_routing() {
    let engine =
        RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    let route = engine.route_for("planner").unwrap();
    assert_eq!(route.provider_id, "openrouter");

    // The billing service reports spend near the daily limit.
    engine.record_usage(9.6);
    assert_eq!(engine.check_budget().state, BudgetState::Degraded);

    // Every subsequent per-agent route is overridden, tier preserved.
    let route = engine.route_for("planner").unwrap();
    assert_eq!(route.provider_id, "ollama");
    assert_eq!(route.cost_tier, CostTier::Premium);
    assert!(route.degraded);
}

#[test]
fn test_preference_surface_through_engine() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    // Make the custom provider preferred; default resolution still
    // prefers the local category first.
    engine
        .set_preferred(ProviderCategory::Custom, Some("openrouter"))
        .unwrap();
    let route = engine.resolve(None).unwrap();
    assert_eq!(route.provider_id, "ollama");

    // With the local provider invalidated, the preferred custom wins.
    engine.set_provider_validity("ollama", false).unwrap();
    let route = engine.resolve(None).unwrap();
    assert_eq!(route.provider_id, "openrouter");
}

#[test]
fn test_state_round_trips_across_engines() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();
    engine
        .import_legacy_records(&[])
        .unwrap();

    let exported = engine.export_state();
    let serialized = serde_json::to_string(&exported).unwrap();

    // A fresh engine restored from persisted state behaves identically.
    let restored = RoutingEngine::new(ScriptedTransport::new(vec![]));
    restored.import_state(serde_json::from_str(&serialized).unwrap());

    assert!(restored.is_migrated());
    assert_eq!(
        restored.list_providers(ProviderCategory::Local).len(),
        engine.list_providers(ProviderCategory::Local).len()
    );
    assert_eq!(
        restored.resolve(None).unwrap().provider_id,
        engine.resolve(None).unwrap().provider_id
    );
}

#[test]
fn test_remove_provider_cascade_through_engine() {
    let engine = RoutingEngine::from_config(config(), ScriptedTransport::new(vec![])).unwrap();

    engine.remove_provider("openrouter").unwrap();

    // The planner assignment now routes via the default path.
    let route = engine.route_for("planner").unwrap();
    assert_eq!(route.provider_id, "ollama");
    // Tier of the (cleared) assignment is preserved.
    assert_eq!(route.cost_tier, CostTier::Premium);
}
