//! Configuration loading, interpolation and validation

use relay_core::config::{load_from_json, load_from_yaml, ConfigError};
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn yaml_config_loads_with_env_interpolation() {
    env::set_var("RELAY_CFG_TEST_KEY", "sk-or-from-env");
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openrouter
    api_key: ${RELAY_CFG_TEST_KEY}
    base_url: https://openrouter.ai/api/v1
    models:
      - id: openai/gpt-4o-mini
        rarity: common
        capabilities: [chat, structured-output]
      - id: google/gemini-2.5-flash-image
        rarity: uncommon
        capabilities: [image-output]
gateway:
  default_model: openai/gpt-4o-mini
  trace_resolution: true
"#,
    );

    let config = load_from_yaml(file.path()).unwrap();
    env::remove_var("RELAY_CFG_TEST_KEY");

    assert_eq!(config.providers[0].api_key.expose_secret(), "sk-or-from-env");
    assert!(config.gateway.trace_resolution);
    assert!(!config.gateway.lock_models);

    let catalog = config.catalog();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.contains("openai/gpt-4o-mini"));
}

#[test]
fn missing_env_var_fails_loading() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openrouter
    api_key: ${RELAY_CFG_DEFINITELY_MISSING}
    base_url: https://openrouter.ai/api/v1
"#,
    );

    match load_from_yaml(file.path()) {
        Err(ConfigError::EnvVarNotFound { var }) => {
            assert_eq!(var, "RELAY_CFG_DEFINITELY_MISSING");
        }
        other => panic!("expected EnvVarNotFound, got {other:?}"),
    }
}

#[test]
fn invalid_base_url_fails_validation_with_field_path() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openrouter
    api_key: sk-or-test
    base_url: "not a url at all"
"#,
    );

    match load_from_yaml(file.path()) {
        Err(ConfigError::Validation(error)) => {
            assert_eq!(error.field_path, "providers[0].base_url");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn json_config_loads() {
    let file = write_config(
        r#"{
  "version": "0.1",
  "providers": [{
    "name": "openai",
    "api_key": "sk-test",
    "base_url": "https://api.openai.com/v1",
    "models": [{"id": "openai/gpt-4o", "rarity": "rare", "capabilities": ["chat"]}]
  }],
  "gateway": {"lock_models": true}
}"#,
    );

    let config = load_from_json(file.path()).unwrap();
    assert!(config.gateway.lock_models);
    assert_eq!(config.providers[0].name, "openai");
}

#[test]
fn gateway_builds_from_a_loaded_config() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openrouter
    api_key: sk-or-test
    base_url: https://openrouter.ai/api/v1
    models:
      - id: openai/gpt-4o-mini
        rarity: common
        capabilities: [chat, structured-output]
gateway:
  default_model: openai/gpt-4o-mini
  disable_fallbacks: true
"#,
    );

    let config = load_from_yaml(file.path()).unwrap();
    assert!(relay_core::Gateway::from_config(&config).is_ok());
}

#[test]
fn malformed_yaml_reports_parse_error() {
    let file = write_config("version: [unclosed");
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn unknown_fields_are_rejected() {
    let file = write_config(
        r#"
version: "0.1"
surprise_field: true
"#,
    );
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}
