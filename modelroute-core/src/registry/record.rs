//! Provider record types and the transient resolved route
//!
//! Records are keyed by a generated id; the display name is a plain
//! attribute, never the identity key.

use crate::config::error::ValidationError;
use crate::config::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Category a provider record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCategory {
    /// Hosted cloud service
    Cloud,
    /// Self-hosted local endpoint
    Local,
    /// User-supplied bring-your-own-key provider
    Custom,
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => write!(f, "cloud"),
            Self::Local => write!(f, "local"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Governance bucket for a route, independent of the provider's
/// intrinsic price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Cheap,
    Standard,
    Premium,
}

impl Default for CostTier {
    fn default() -> Self {
        Self::Standard
    }
}

/// A configured model backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Opaque identifier, unique within the registry
    pub id: String,

    /// Provider category
    pub category: ProviderCategory,

    /// Human-readable name; display only
    #[serde(default)]
    pub display_name: String,

    /// Network address of the backend
    #[serde(default)]
    pub endpoint: String,

    /// Backend-specific model name
    #[serde(default)]
    pub model: String,

    /// Opaque secret; may be empty for local backends that need none
    #[serde(default)]
    pub credential: SecretString,

    /// Set after a successful connectivity/capability check
    #[serde(default)]
    pub is_valid: bool,

    /// At most one record across all categories may be preferred
    #[serde(default)]
    pub is_preferred: bool,

    /// Free-form parameters passed through to the backend unchanged
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, serde_json::Value>,
}

impl ProviderRecord {
    /// Create a record with a generated id
    pub fn new(category: ProviderCategory, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            display_name: display_name.into(),
            endpoint: String::new(),
            model: String::new(),
            credential: SecretString::default(),
            is_valid: false,
            is_preferred: false,
            extra_params: HashMap::new(),
        }
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the credential
    pub fn with_credential(mut self, credential: impl Into<SecretString>) -> Self {
        self.credential = credential.into();
        self
    }

    /// Mark the record valid
    pub fn valid(mut self) -> Self {
        self.is_valid = true;
        self
    }

    /// Mark the record preferred
    pub fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }

    /// Add an extra backend parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_params.insert(key.into(), value);
        self
    }

    /// Validate the record before it enters the registry
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::required("record.id"));
        }

        // Local and custom backends are unreachable without an endpoint;
        // the hosted cloud service supplies its own.
        match self.category {
            ProviderCategory::Local | ProviderCategory::Custom => {
                if self.endpoint.trim().is_empty() {
                    return Err(ValidationError::required("record.endpoint").with_context(
                        format!("{} providers require an endpoint", self.category),
                    ));
                }
            }
            ProviderCategory::Cloud => {}
        }

        Ok(())
    }
}

/// The route a resolution produced; transient, computed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    /// Id of the record the route points at
    pub provider_id: String,

    /// Network address of the backend
    pub endpoint: String,

    /// Backend-specific model name
    pub model: String,

    /// Credential to present to the backend
    pub credential: SecretString,

    /// Backend parameters passed through unchanged
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, serde_json::Value>,

    /// Governance bucket the call is accounted under
    pub cost_tier: CostTier,

    /// True when the cost governor substituted a fallback
    pub degraded: bool,
}

impl ResolvedRoute {
    /// Build a route from a registry record
    pub fn from_record(record: &ProviderRecord, cost_tier: CostTier) -> Self {
        Self {
            provider_id: record.id.clone(),
            endpoint: record.endpoint.clone(),
            model: record.model.clone(),
            credential: record.credential.clone(),
            extra_params: record.extra_params.clone(),
            cost_tier,
            degraded: false,
        }
    }

    /// Mark the route as degraded by budget governance
    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ValidationErrorKind;

    #[test]
    fn test_new_record_has_generated_id() {
        let record = ProviderRecord::new(ProviderCategory::Local, "Ollama");
        assert!(!record.id.is_empty());
        assert!(!record.is_valid);
        assert!(!record.is_preferred);
    }

    #[test]
    fn test_local_requires_endpoint() {
        let record = ProviderRecord::new(ProviderCategory::Local, "Ollama");
        let err = record.validate().unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::RequiredFieldMissing));

        let record = record.with_endpoint("http://localhost:11434");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_custom_requires_endpoint() {
        let record = ProviderRecord::new(ProviderCategory::Custom, "My key");
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_cloud_endpoint_optional() {
        let record = ProviderRecord::new(ProviderCategory::Cloud, "Hosted").with_model("large-v2");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut record =
            ProviderRecord::new(ProviderCategory::Local, "x").with_endpoint("http://h");
        record.id = "  ".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_route_from_record() {
        let record = ProviderRecord::new(ProviderCategory::Custom, "BYOK")
            .with_endpoint("https://api.example.com/v1")
            .with_model("m-1")
            .with_credential("sk-test")
            .with_param("temperature", serde_json::json!(0.2));

        let route = ResolvedRoute::from_record(&record, CostTier::Premium);
        assert_eq!(route.provider_id, record.id);
        assert_eq!(route.endpoint, "https://api.example.com/v1");
        assert_eq!(route.model, "m-1");
        assert_eq!(route.cost_tier, CostTier::Premium);
        assert!(!route.degraded);
        assert_eq!(route.extra_params.len(), 1);
    }
}
