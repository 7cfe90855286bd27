//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use crate::config::secrets::SecretString;
use crate::registry::record::{CostTier, ProviderCategory};
use crate::routing::table::AgentComplexity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure for the routing engine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Provider records seeded into the registry
    #[serde(default)]
    pub providers: Vec<ProviderSeed>,

    /// Agent-type routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Fallback and cost-limit policy
    #[serde(default)]
    pub auto_scaling: AutoScalingPolicy,

    /// Transport connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Custom metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A provider record as configured, before it enters the registry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSeed {
    /// Stable id; generated when omitted
    #[serde(default)]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// Provider category
    pub category: ProviderCategory,

    /// Backend network address (required for local/custom)
    #[serde(default)]
    pub endpoint: String,

    /// Backend-specific model name
    #[serde(default)]
    pub model: String,

    /// API key (supports environment variable interpolation)
    #[serde(default)]
    pub api_key: SecretString,

    /// Whether the record starts out valid (e.g. verified elsewhere)
    #[serde(default)]
    pub valid: bool,

    /// Whether this record is the preferred backend
    #[serde(default)]
    pub preferred: bool,

    /// Parameters passed through to the backend unchanged
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, serde_json::Value>,
}

/// Agent-type routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Enable complexity-based routing for unassigned agent types
    #[serde(default)]
    pub complexity_routing: bool,

    /// Explicit agent-type assignments
    #[serde(default)]
    pub assignments: Vec<AssignmentConfig>,
}

/// One agent-type routing entry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssignmentConfig {
    /// Logical agent identifier
    pub agent_type: String,

    /// Target provider id, or omitted to use the complexity default
    #[serde(default)]
    pub provider: Option<String>,

    /// Governance bucket
    #[serde(default)]
    pub cost_tier: CostTier,

    /// Optional complexity label
    #[serde(default)]
    pub complexity: Option<AgentComplexity>,
}

/// Fallback and cost-limit policy (process-wide, single instance)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoScalingPolicy {
    /// Enable the fallback swap after primary exhaustion
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Provider substituted after primary exhaustion
    #[serde(default)]
    pub fallback_provider: Option<String>,

    /// Retries on the primary after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between primary attempts (milliseconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Enable budget governance
    #[serde(default)]
    pub cost_limit_enabled: bool,

    /// Daily spend limit; zero disables the daily tracker
    #[serde(default)]
    pub daily_cost_limit: f64,

    /// Monthly spend limit; zero disables the monthly tracker
    #[serde(default)]
    pub monthly_cost_limit: f64,

    /// Provider substituted for degraded routes
    #[serde(default)]
    pub cost_limit_fallback_provider: Option<String>,

    /// Percentage of a limit at which observers are warned (0-100)
    #[serde(default = "default_warn_percentage")]
    pub warn_at_percentage: f64,

    /// Percentage of a limit past which routes degrade (0-100,
    /// must be >= warn_at_percentage)
    #[serde(default = "default_downgrade_percentage")]
    pub downgrade_at_percentage: f64,
}

impl Default for AutoScalingPolicy {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            fallback_provider: None,
            max_retries: 3,
            retry_delay_ms: 1_000,
            cost_limit_enabled: false,
            daily_cost_limit: 0.0,
            monthly_cost_limit: 0.0,
            cost_limit_fallback_provider: None,
            warn_at_percentage: 80.0,
            downgrade_at_percentage: 90.0,
        }
    }
}

/// Connection configuration for the HTTP transport
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Default per-attempt request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            max_idle_per_host: 10,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1_000
}
fn default_warn_percentage() -> f64 {
    80.0
}
fn default_downgrade_percentage() -> f64 {
    90.0
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_request_timeout() -> u64 {
    60_000
}
fn default_max_idle() -> usize {
    10
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != "0.1" {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: "0.1".to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        // Check for duplicate provider ids and names.
        let mut seen_ids = std::collections::HashSet::new();
        for (i, seed) in self.providers.iter().enumerate() {
            if let Some(id) = &seed.id {
                if !seen_ids.insert(id) {
                    return Err(ValidationError::new(
                        format!("providers[{}].id", i),
                        ValidationErrorKind::DuplicateValue { value: id.clone() },
                    ));
                }
            }
            seed.validate(&format!("providers[{}]", i))?;
        }

        self.auto_scaling.validate("auto_scaling")?;

        for (i, assignment) in self.routing.assignments.iter().enumerate() {
            if assignment.agent_type.is_empty() {
                return Err(ValidationError::required(format!(
                    "routing.assignments[{}].agent_type",
                    i
                )));
            }
        }

        Ok(())
    }
}

impl ProviderSeed {
    /// Validate a provider seed
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        match self.category {
            ProviderCategory::Local | ProviderCategory::Custom => {
                if self.endpoint.is_empty() {
                    return Err(ValidationError::required(format!("{}.endpoint", path))
                        .with_context(format!(
                            "{} providers require an endpoint",
                            self.category
                        )));
                }
            }
            ProviderCategory::Cloud => {}
        }

        if !self.endpoint.is_empty() {
            match url::Url::parse(&self.endpoint) {
                Ok(url) => {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        return Err(ValidationError::new(
                            format!("{}.endpoint", path),
                            ValidationErrorKind::InvalidUrl {
                                message: format!(
                                    "URL scheme must be http or https, got: {}",
                                    url.scheme()
                                ),
                            },
                        ));
                    }
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        format!("{}.endpoint", path),
                        ValidationErrorKind::InvalidUrl {
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }

        Ok(())
    }
}

impl AutoScalingPolicy {
    /// Validate the auto-scaling policy
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        for (field, value) in [
            ("warn_at_percentage", self.warn_at_percentage),
            ("downgrade_at_percentage", self.downgrade_at_percentage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::out_of_range(
                    format!("{}.{}", path, field),
                    "Must be between 0 and 100",
                ));
            }
        }

        if self.downgrade_at_percentage < self.warn_at_percentage {
            return Err(ValidationError::new(
                format!("{}.downgrade_at_percentage", path),
                ValidationErrorKind::Incompatible {
                    message: "Must be >= warn_at_percentage".to_string(),
                },
            ));
        }

        if self.daily_cost_limit < 0.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.daily_cost_limit", path),
                "Must be non-negative",
            ));
        }

        if self.monthly_cost_limit < 0.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.monthly_cost_limit", path),
                "Must be non-negative",
            ));
        }

        Ok(())
    }
}
