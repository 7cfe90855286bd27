//! Budget Demo - Cost Governance and Route Degradation
//!
//! This example demonstrates the cost governor:
//! - Daily/monthly spend tracking
//! - Warning and downgrade thresholds
//! - Automatic substitution of a cheaper fallback provider
//!
//! Run with: cargo run --example budget_demo

use async_trait::async_trait;
use modelroute_core::{
    AutoScalingPolicy, InvocationTransport, ProviderCategory, ProviderRecord, ResolvedRoute,
    RoutingEngine, TransportError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct EchoTransport;

#[async_trait]
impl InvocationTransport for EchoTransport {
    async fn invoke(
        &self,
        route: &ResolvedRoute,
        _payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        Ok(json!({"served_by": route.provider_id}))
    }
}

#[tokio::main]
async fn main() {
    println!("\n💰 Modelroute Demo - Budget Governance\n");
    println!("======================================\n");

    let engine = RoutingEngine::new(Arc::new(EchoTransport));

    let premium = ProviderRecord::new(ProviderCategory::Custom, "Premium BYOK")
        .with_endpoint("https://api.example.com/v1")
        .with_model("big-model")
        .with_credential("sk-premium")
        .valid();
    let premium_id = premium.id.clone();
    engine.put_provider(premium).unwrap();

    let cheap = ProviderRecord::new(ProviderCategory::Local, "Ollama")
        .with_endpoint("http://localhost:11434")
        .with_model("small-model")
        .valid();
    let cheap_id = cheap.id.clone();
    engine.put_provider(cheap).unwrap();

    engine
        .set_policy(AutoScalingPolicy {
            cost_limit_enabled: true,
            daily_cost_limit: 10.0,
            monthly_cost_limit: 200.0,
            cost_limit_fallback_provider: Some(cheap_id),
            warn_at_percentage: 80.0,
            downgrade_at_percentage: 90.0,
            ..AutoScalingPolicy::default()
        })
        .unwrap();

    engine.on_budget_warning(Box::new(|period, pct| {
        println!("  ⚠️ budget warning: {:.1}% of the {} limit spent", pct, period);
    }));

    engine.assign(
        "planner",
        Some(premium_id),
        modelroute_core::CostTier::Premium,
    );

    println!("📋 Policy: daily limit $10, warn at 80%, downgrade at 90%\n");

    let route = engine.route_for("planner").unwrap();
    println!("  planner -> {} before any spend\n", route.provider_id);

    for spend in [4.0, 4.5, 1.0] {
        engine.record_usage(spend);
        let report = engine.check_budget();
        println!(
            "  recorded ${:.2} -> state: {:?}",
            spend, report.state
        );
    }

    println!();
    println!("📝 Routing after degradation:");
    match engine.route_for("planner") {
        Ok(route) => {
            println!("  planner -> {} (degraded: {})", route.provider_id, route.degraded);
        }
        Err(e) => println!("  routing halted: {}", e),
    }

    println!("\n✨ Demo complete\n");
}
