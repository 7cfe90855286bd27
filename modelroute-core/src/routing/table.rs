//! Agent-type routing assignments
//!
//! Maps agent types to a provider and cost tier. When no explicit
//! assignment exists the caller falls back to the preference resolver's
//! default; the complexity-routing policy is an explicit, inspectable
//! toggle consulted only on that unassigned path.

use crate::registry::record::CostTier;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::debug;

/// Complexity label attached per agent type, for UI and recommendation.
/// It affects resolution only while complexity routing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentComplexity {
    Simple,
    Moderate,
    Complex,
}

impl AgentComplexity {
    /// The tier an unassigned agent of this complexity routes to when
    /// complexity routing is enabled
    pub fn preferred_tier(&self) -> Option<CostTier> {
        match self {
            Self::Simple => Some(CostTier::Cheap),
            Self::Moderate => None,
            Self::Complex => Some(CostTier::Premium),
        }
    }
}

/// A single agent-type routing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingAssignment {
    /// Logical agent identifier (planning agent, browsing agent, ...)
    pub agent_type: String,

    /// Target provider, or `None` to use the complexity default
    pub provider_id: Option<String>,

    /// Governance bucket for calls made under this assignment
    pub cost_tier: CostTier,

    /// Optional complexity label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<AgentComplexity>,
}

#[derive(Debug, Default)]
struct TableState {
    // Insertion-ordered so tier scans are deterministic.
    assignments: Vec<RoutingAssignment>,
    complexity_routing: bool,
}

/// Maps agent-type identifiers to providers and cost tiers
#[derive(Debug, Default)]
pub struct RoutingTable {
    inner: RwLock<TableState>,
}

impl RoutingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an agent type to a provider and cost tier. Passing
    /// `provider_id = None` keeps the entry but routes via the
    /// complexity default.
    pub fn assign(
        &self,
        agent_type: impl Into<String>,
        provider_id: Option<String>,
        cost_tier: CostTier,
    ) {
        let agent_type = agent_type.into();
        let mut state = self.inner.write().expect("routing table lock poisoned");
        debug!(agent_type = %agent_type, ?provider_id, ?cost_tier, "routing assignment updated");
        match state
            .assignments
            .iter_mut()
            .find(|a| a.agent_type == agent_type)
        {
            Some(entry) => {
                entry.provider_id = provider_id;
                entry.cost_tier = cost_tier;
            }
            None => state.assignments.push(RoutingAssignment {
                agent_type,
                provider_id,
                cost_tier,
                complexity: None,
            }),
        }
    }

    /// Remove the assignment for an agent type
    pub fn unassign(&self, agent_type: &str) {
        let mut state = self.inner.write().expect("routing table lock poisoned");
        state.assignments.retain(|a| a.agent_type != agent_type);
    }

    /// Clear every assignment pointing at a removed provider. The
    /// affected agent types fall back to the default route.
    pub fn unassign_provider(&self, provider_id: &str) {
        let mut state = self.inner.write().expect("routing table lock poisoned");
        for entry in state
            .assignments
            .iter_mut()
            .filter(|a| a.provider_id.as_deref() == Some(provider_id))
        {
            debug!(agent_type = %entry.agent_type, provider_id, "clearing assignment for removed provider");
            entry.provider_id = None;
        }
    }

    /// The assignment for an agent type, if any
    pub fn lookup(&self, agent_type: &str) -> Option<RoutingAssignment> {
        let state = self.inner.read().expect("routing table lock poisoned");
        state
            .assignments
            .iter()
            .find(|a| a.agent_type == agent_type)
            .cloned()
    }

    /// All assignments, in insertion order
    pub fn assignments(&self) -> Vec<RoutingAssignment> {
        self.inner
            .read()
            .expect("routing table lock poisoned")
            .assignments
            .clone()
    }

    /// Attach a complexity label to an agent type
    pub fn set_complexity(&self, agent_type: impl Into<String>, complexity: AgentComplexity) {
        let agent_type = agent_type.into();
        let mut state = self.inner.write().expect("routing table lock poisoned");
        match state
            .assignments
            .iter_mut()
            .find(|a| a.agent_type == agent_type)
        {
            Some(entry) => entry.complexity = Some(complexity),
            None => state.assignments.push(RoutingAssignment {
                agent_type,
                provider_id: None,
                cost_tier: CostTier::default(),
                complexity: Some(complexity),
            }),
        }
    }

    /// The complexity label for an agent type
    pub fn complexity_of(&self, agent_type: &str) -> Option<AgentComplexity> {
        self.lookup(agent_type).and_then(|a| a.complexity)
    }

    /// Enable or disable complexity-based routing for unassigned agents
    pub fn set_complexity_routing(&self, enabled: bool) {
        let mut state = self.inner.write().expect("routing table lock poisoned");
        state.complexity_routing = enabled;
    }

    /// Whether complexity-based routing is enabled
    pub fn complexity_routing_enabled(&self) -> bool {
        self.inner
            .read()
            .expect("routing table lock poisoned")
            .complexity_routing
    }

    /// First assigned provider whose tier matches, scanning assignments
    /// in insertion order
    pub fn provider_for_tier(&self, tier: CostTier) -> Option<String> {
        let state = self.inner.read().expect("routing table lock poisoned");
        state
            .assignments
            .iter()
            .filter(|a| a.cost_tier == tier)
            .find_map(|a| a.provider_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_lookup() {
        let table = RoutingTable::new();
        table.assign("planner", Some("p1".to_string()), CostTier::Premium);

        let entry = table.lookup("planner").unwrap();
        assert_eq!(entry.provider_id.as_deref(), Some("p1"));
        assert_eq!(entry.cost_tier, CostTier::Premium);
        assert!(table.lookup("browser").is_none());
    }

    #[test]
    fn test_reassign_replaces() {
        let table = RoutingTable::new();
        table.assign("planner", Some("p1".to_string()), CostTier::Premium);
        table.assign("planner", Some("p2".to_string()), CostTier::Cheap);

        let entry = table.lookup("planner").unwrap();
        assert_eq!(entry.provider_id.as_deref(), Some("p2"));
        assert_eq!(entry.cost_tier, CostTier::Cheap);
        assert_eq!(table.assignments().len(), 1);
    }

    #[test]
    fn test_unassign() {
        let table = RoutingTable::new();
        table.assign("planner", Some("p1".to_string()), CostTier::Standard);
        table.unassign("planner");
        assert!(table.lookup("planner").is_none());
    }

    #[test]
    fn test_unassign_provider_cascade() {
        let table = RoutingTable::new();
        table.assign("planner", Some("p1".to_string()), CostTier::Premium);
        table.assign("browser", Some("p2".to_string()), CostTier::Cheap);

        table.unassign_provider("p1");

        // Entry survives, but routes via the default path now.
        let entry = table.lookup("planner").unwrap();
        assert!(entry.provider_id.is_none());
        assert_eq!(
            table.lookup("browser").unwrap().provider_id.as_deref(),
            Some("p2")
        );
    }

    #[test]
    fn test_complexity_label_without_assignment() {
        let table = RoutingTable::new();
        table.set_complexity("coder", AgentComplexity::Complex);

        assert_eq!(table.complexity_of("coder"), Some(AgentComplexity::Complex));
        assert!(table.lookup("coder").unwrap().provider_id.is_none());
    }

    #[test]
    fn test_provider_for_tier_scans_in_order() {
        let table = RoutingTable::new();
        table.assign("a", None, CostTier::Premium);
        table.assign("b", Some("first-premium".to_string()), CostTier::Premium);
        table.assign("c", Some("second-premium".to_string()), CostTier::Premium);
        table.assign("d", Some("cheap".to_string()), CostTier::Cheap);

        assert_eq!(
            table.provider_for_tier(CostTier::Premium).as_deref(),
            Some("first-premium")
        );
        assert_eq!(
            table.provider_for_tier(CostTier::Cheap).as_deref(),
            Some("cheap")
        );
        assert!(table.provider_for_tier(CostTier::Standard).is_none());
    }

    #[test]
    fn test_complexity_tiers() {
        assert_eq!(
            AgentComplexity::Simple.preferred_tier(),
            Some(CostTier::Cheap)
        );
        assert_eq!(AgentComplexity::Moderate.preferred_tier(), None);
        assert_eq!(
            AgentComplexity::Complex.preferred_tier(),
            Some(CostTier::Premium)
        );
    }
}
