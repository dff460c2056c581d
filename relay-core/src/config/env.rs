//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::RelayConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;

fn env_var_pattern() -> Regex {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
}

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let pattern = env_var_pattern();
    let mut result = content.to_string();

    for capture in pattern.captures_iter(content) {
        let full_match = capture.get(0).map(|m| m.as_str()).unwrap_or_default();
        let var_name = &capture[1];

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Interpolate env vars remaining in sensitive fields after parsing.
/// Targeted at provider credentials and base URLs.
pub fn interpolate_config_env_vars(config: &mut RelayConfig) -> Result<(), ConfigError> {
    let pattern = env_var_pattern();

    for provider in &mut config.providers {
        let api_key = provider.api_key.expose_secret();
        if pattern.is_match(api_key) {
            provider.api_key = SecretString::new(interpolate_env_vars(api_key)?);
        }
        if pattern.is_match(&provider.base_url) {
            provider.base_url = interpolate_env_vars(&provider.base_url)?;
        }
    }

    Ok(())
}
