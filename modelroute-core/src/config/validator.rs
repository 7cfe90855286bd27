//! Cross-field configuration validation
//!
//! Field-level checks live on the schema types; this validator covers
//! rules that span sections: provider references from routing and
//! auto-scaling, and the single-preferred-seed invariant.

use super::error::ValidationError;
use super::schema::EngineConfig;

/// Validates an engine configuration beyond field-level checks
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Run field-level and cross-field validation
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        config.validate()?;
        self.validate_preferred_uniqueness(config)?;
        self.validate_provider_references(config)?;
        Ok(())
    }

    /// At most one seeded provider may be preferred
    fn validate_preferred_uniqueness(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        let preferred: Vec<&str> = config
            .providers
            .iter()
            .filter(|p| p.preferred)
            .map(|p| p.name.as_str())
            .collect();

        if preferred.len() > 1 {
            return Err(ValidationError::new(
                "providers",
                super::error::ValidationErrorKind::Incompatible {
                    message: format!(
                        "at most one provider may be preferred, found {}: {}",
                        preferred.len(),
                        preferred.join(", ")
                    ),
                },
            ));
        }

        Ok(())
    }

    /// Routing assignments and fallback settings must reference seeded
    /// providers when they name one
    fn validate_provider_references(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        let known: Vec<&str> = config
            .providers
            .iter()
            .filter_map(|p| p.id.as_deref())
            .collect();

        // Only ids declared in the config can be checked here; ids
        // generated at seed time are unknown until construction.
        let check = |field: &str, id: &Option<String>| -> Result<(), ValidationError> {
            if let Some(id) = id {
                let declared_any = config.providers.iter().any(|p| p.id.is_none());
                if !declared_any && !known.contains(&id.as_str()) {
                    return Err(ValidationError::unknown_reference(
                        field,
                        format!("no seeded provider with id '{}'", id),
                    ));
                }
            }
            Ok(())
        };

        check(
            "auto_scaling.fallback_provider",
            &config.auto_scaling.fallback_provider,
        )?;
        check(
            "auto_scaling.cost_limit_fallback_provider",
            &config.auto_scaling.cost_limit_fallback_provider,
        )?;

        for (i, assignment) in config.routing.assignments.iter().enumerate() {
            check(
                &format!("routing.assignments[{}].provider", i),
                &assignment.provider,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProviderSeed;
    use crate::registry::record::ProviderCategory;

    fn base_config() -> EngineConfig {
        serde_yaml::from_str(
            r#"
version: "0.1"
providers:
  - id: ollama
    name: Ollama
    category: local
    endpoint: http://localhost:11434
    model: llama3
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = base_config();
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_two_preferred_seeds_rejected() {
        let mut config = base_config();
        let mut seed = ProviderSeed {
            id: Some("other".to_string()),
            name: "Other".to_string(),
            category: ProviderCategory::Custom,
            endpoint: "https://api.example.com".to_string(),
            model: String::new(),
            api_key: Default::default(),
            valid: false,
            preferred: true,
            extra_params: Default::default(),
        };
        config.providers.push(seed.clone());
        seed.id = Some("third".to_string());
        seed.name = "Third".to_string();
        config.providers.push(seed);

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_unknown_fallback_reference_rejected() {
        let mut config = base_config();
        config.auto_scaling.fallback_provider = Some("missing".to_string());

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.field_path.contains("fallback_provider"));
    }

    #[test]
    fn test_unknown_assignment_reference_rejected() {
        let mut config = base_config();
        config.routing.assignments.push(
            serde_yaml::from_str(
                r#"
agent_type: planner
provider: missing
cost_tier: premium
"#,
            )
            .unwrap(),
        );

        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
