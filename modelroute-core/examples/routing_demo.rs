//! Routing Demo - Provider Precedence and Fallback
//!
//! This example demonstrates the resolution features:
//! - Category precedence (local before custom)
//! - The single preferred provider
//! - Agent-type assignments and cost tiers
//! - Automatic fallback on invocation failure
//!
//! Run with: cargo run --example routing_demo

use async_trait::async_trait;
use modelroute_core::{
    AgentComplexity, CostTier, InvocationTransport, ProviderCategory, ProviderRecord,
    ResolvedRoute, RoutingEngine, TransportError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Demo transport: the "primary" provider fails twice before the
/// fallback serves the call.
struct FlakyTransport {
    calls: AtomicU32,
}

#[async_trait]
impl InvocationTransport for FlakyTransport {
    async fn invoke(
        &self,
        route: &ResolvedRoute,
        _payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if route.model == "flaky-model" && call < 2 {
            return Err(TransportError::Timeout);
        }
        Ok(json!({"content": format!("served by {}", route.provider_id)}))
    }
}

#[tokio::main]
async fn main() {
    println!("\n🚀 Modelroute Demo - Routing & Resolution\n");
    println!("=========================================\n");

    let engine = RoutingEngine::new(Arc::new(FlakyTransport {
        calls: AtomicU32::new(0),
    }));

    // Configure one provider per category.
    println!("📋 Registering providers:");
    println!("  Local:  Ollama (llama3)");
    println!("  Custom: OpenRouter (BYOK)");
    println!();

    let ollama = ProviderRecord::new(ProviderCategory::Local, "Ollama")
        .with_endpoint("http://localhost:11434")
        .with_model("flaky-model")
        .valid();
    let ollama_id = ollama.id.clone();
    engine.put_provider(ollama).unwrap();

    let openrouter = ProviderRecord::new(ProviderCategory::Custom, "OpenRouter")
        .with_endpoint("https://openrouter.ai/api/v1")
        .with_model("auto")
        .with_credential("sk-or-demo")
        .valid();
    let openrouter_id = openrouter.id.clone();
    engine.put_provider(openrouter).unwrap();

    // Example 1: default resolution prefers the local category.
    println!("📝 Example 1: Default Resolution");
    println!("─────────────────────────────────");
    let route = engine.resolve(None).unwrap();
    println!("  Resolved provider: {} (local wins)", route.provider_id);
    println!();

    // Example 2: agent-type assignment overrides the default.
    println!("📝 Example 2: Agent Assignment");
    println!("───────────────────────────────");
    engine.assign("planner", Some(openrouter_id.clone()), CostTier::Premium);
    engine.set_complexity("planner", AgentComplexity::Complex);
    let route = engine.route_for("planner").unwrap();
    println!(
        "  planner -> {} (tier: {:?})",
        route.provider_id, route.cost_tier
    );
    println!();

    // Example 3: invocation with retries and fallback swap.
    println!("📝 Example 3: Invocation with Fallback");
    println!("───────────────────────────────────────");
    let mut policy = engine.policy();
    policy.max_retries = 1;
    policy.retry_delay_ms = 10;
    policy.fallback_enabled = true;
    policy.fallback_provider = Some(openrouter_id);
    engine.set_policy(policy).unwrap();

    let route = engine.route_for("browser").unwrap();
    println!("  browser routed to {} first", route.provider_id);
    assert_eq!(route.provider_id, ollama_id);

    match engine
        .invoke(&route, &json!({"prompt": "hello"}), Some(Duration::from_secs(5)))
        .await
    {
        Ok(outcome) => {
            println!("✅ Invocation succeeded!");
            println!("  Provider used: {}", outcome.provider_id);
            println!("  Fallback used: {}", outcome.used_fallback);
            println!("  Attempts made: {}", outcome.attempts);
        }
        Err(e) => println!("❌ Invocation failed: {}", e),
    }

    println!("\n✨ Demo complete\n");
}
