//! Tests for configuration loading and validation

use modelroute_core::config::{self, ConfigError, ValidationErrorKind};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const VALID_YAML: &str = r#"
version: "0.1"
providers:
  - id: ollama
    name: Ollama
    category: local
    endpoint: http://localhost:11434
    model: llama3
    valid: true
    preferred: true
  - id: openrouter
    name: OpenRouter
    category: custom
    endpoint: https://openrouter.ai/api/v1
    model: auto
    api_key: sk-or-test
routing:
  complexity_routing: true
  assignments:
    - agent_type: planner
      provider: openrouter
      cost_tier: premium
      complexity: complex
    - agent_type: greeter
      cost_tier: cheap
      complexity: simple
auto_scaling:
  fallback_enabled: true
  fallback_provider: ollama
  max_retries: 2
  retry_delay_ms: 250
  cost_limit_enabled: true
  daily_cost_limit: 10.0
  monthly_cost_limit: 200.0
  cost_limit_fallback_provider: ollama
  warn_at_percentage: 80
  downgrade_at_percentage: 90
connection:
  connect_timeout_ms: 5000
  request_timeout_ms: 30000
  max_idle_per_host: 4
"#;

#[test]
fn test_load_valid_yaml_file() {
    let file = write_temp(VALID_YAML);
    let config = config::load_from_yaml(file.path()).unwrap();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.providers.len(), 2);
    assert!(config.routing.complexity_routing);
    assert_eq!(config.routing.assignments.len(), 2);
    assert_eq!(config.auto_scaling.retry_delay_ms, 250);
    assert_eq!(config.connection.request_timeout_ms, 30_000);
}

#[test]
fn test_load_valid_json_file() {
    let json = r#"
{
  "version": "0.1",
  "providers": [
    {
      "id": "ollama",
      "name": "Ollama",
      "category": "local",
      "endpoint": "http://localhost:11434",
      "model": "llama3"
    }
  ]
}
"#;
    let file = write_temp(json);
    let config = config::load_from_json(file.path()).unwrap();
    assert_eq!(config.providers.len(), 1);
    assert_eq!(config.providers[0].name, "Ollama");
}

#[test]
fn test_env_var_interpolation() {
    std::env::set_var("MODELROUTE_TEST_KEY", "sk-from-env");
    let yaml = r#"
version: "0.1"
providers:
  - id: byok
    name: BYOK
    category: custom
    endpoint: https://api.example.com/v1
    api_key: ${MODELROUTE_TEST_KEY}
"#;
    let file = write_temp(yaml);
    let config = config::load_from_yaml(file.path()).unwrap();
    assert_eq!(config.providers[0].api_key.expose_secret(), "sk-from-env");
    std::env::remove_var("MODELROUTE_TEST_KEY");
}

#[test]
fn test_missing_env_var_is_an_error() {
    let yaml = r#"
version: "0.1"
providers:
  - id: byok
    name: BYOK
    category: custom
    endpoint: https://api.example.com/v1
    api_key: ${MODELROUTE_DEFINITELY_MISSING}
"#;
    let file = write_temp(yaml);
    let err = config::load_from_yaml(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::EnvVarNotFound { .. }));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = config::load_from_yaml("/nonexistent/modelroute.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::IoError { .. }));
}

#[test]
fn test_malformed_yaml_reports_location() {
    let file = write_temp("version: \"0.1\"\nproviders: [not closed");
    let err = config::load_from_yaml(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn test_unknown_version_rejected() {
    let file = write_temp("version: \"9.9\"\n");
    let err = config::load_from_yaml(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError(e) => {
            assert!(matches!(e.kind, ValidationErrorKind::InvalidVersion { .. }));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_local_provider_without_endpoint_rejected() {
    let yaml = r#"
version: "0.1"
providers:
  - id: ollama
    name: Ollama
    category: local
    model: llama3
"#;
    let file = write_temp(yaml);
    let err = config::load_from_yaml(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError(e) => {
            assert!(e.field_path.contains("endpoint"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_bad_endpoint_scheme_rejected() {
    let yaml = r#"
version: "0.1"
providers:
  - id: ollama
    name: Ollama
    category: local
    endpoint: ftp://localhost:11434
"#;
    let file = write_temp(yaml);
    let err = config::load_from_yaml(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError(e) => {
            assert!(matches!(e.kind, ValidationErrorKind::InvalidUrl { .. }));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_provider_ids_rejected() {
    let yaml = r#"
version: "0.1"
providers:
  - id: same
    name: First
    category: custom
    endpoint: https://a.example.com
  - id: same
    name: Second
    category: custom
    endpoint: https://b.example.com
"#;
    let file = write_temp(yaml);
    let err = config::load_from_yaml(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError(e) => {
            assert!(matches!(e.kind, ValidationErrorKind::DuplicateValue { .. }));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_two_preferred_seeds_rejected() {
    let yaml = r#"
version: "0.1"
providers:
  - id: a
    name: A
    category: local
    endpoint: http://localhost:1
    preferred: true
  - id: b
    name: B
    category: custom
    endpoint: https://b.example.com
    preferred: true
"#;
    let file = write_temp(yaml);
    assert!(config::load_from_yaml(file.path()).is_err());
}

#[test]
fn test_threshold_ordering_rejected() {
    let yaml = r#"
version: "0.1"
auto_scaling:
  warn_at_percentage: 95
  downgrade_at_percentage: 90
"#;
    let file = write_temp(yaml);
    let err = config::load_from_yaml(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError(e) => {
            assert!(e.field_path.contains("downgrade_at_percentage"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_unknown_fields_rejected() {
    let yaml = r#"
version: "0.1"
surprise: true
"#;
    let file = write_temp(yaml);
    assert!(matches!(
        config::load_from_yaml(file.path()).unwrap_err(),
        ConfigError::ParseError { .. }
    ));
}
