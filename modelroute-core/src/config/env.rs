//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::secrets::SecretString;
use regex::Regex;
use std::env;

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let env_var_pattern = env_pattern();
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for cap in env_var_pattern.captures_iter(content) {
        let full_match = match cap.get(0) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let var_name = &cap[1];

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    // Report the first missing variable (to match the error type)
    if let Some(var) = missing_vars.first() {
        return Err(ConfigError::EnvVarNotFound { var: var.clone() });
    }

    Ok(result)
}

/// Interpolate environment variables left in credential and endpoint
/// fields after parsing
pub fn interpolate_config_env_vars(
    config: &mut super::schema::EngineConfig,
) -> Result<(), ConfigError> {
    let env_var_pattern = env_pattern();

    for seed in &mut config.providers {
        let api_key_str = seed.api_key.expose_secret();
        if env_var_pattern.is_match(api_key_str) {
            let interpolated = interpolate_single_value(api_key_str)?;
            seed.api_key = SecretString::new(interpolated);
        }

        if env_var_pattern.is_match(&seed.endpoint) {
            seed.endpoint = interpolate_single_value(&seed.endpoint)?;
        }
    }

    Ok(())
}

/// Interpolate a single value that may contain environment variables
fn interpolate_single_value(value: &str) -> Result<String, ConfigError> {
    let env_var_pattern = env_pattern();

    if let Some(cap) = env_var_pattern.captures(value) {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(env_value) => Ok(value.replace(&cap[0], &env_value)),
            Err(_) => Err(ConfigError::EnvVarNotFound {
                var: var_name.to_string(),
            }),
        }
    } else {
        Ok(value.to_string())
    }
}

fn env_pattern() -> Regex {
    // The pattern is a literal; compilation cannot fail.
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern")
}
