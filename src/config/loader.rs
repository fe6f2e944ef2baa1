//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables read once at startup.
pub const ENV_VARS: &[(&str, bool)] = &[
    ("GATEWAY_CONFIG", false),
    ("GATEWAY_BIND_ADDRESS", false),
    ("LLM_API_KEY", true),
    ("OPENAI_API_KEY", true),
    ("LLM_BASE_URL", false),
    ("LLM_MODEL", false),
    ("SCOPESTACK_API_TOKEN", true),
    ("SCOPESTACK_BASE_URL", false),
    ("SCOPESTACK_ACCOUNT_SLUG", false),
];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment-provided settings onto `config`.
///
/// `lookup` abstracts the environment so callers (and tests) decide where
/// values come from. Empty values are ignored.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(addr) = get("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(key) = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = get("LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = get("LLM_MODEL") {
        config.llm.default_model = model;
    }
    if let Some(token) = get("SCOPESTACK_API_TOKEN") {
        config.scopestack.api_token = Some(token);
    }
    if let Some(url) = get("SCOPESTACK_BASE_URL") {
        config.scopestack.base_url = url;
    }
    if let Some(slug) = get("SCOPESTACK_ACCOUNT_SLUG") {
        config.scopestack.account_slug = Some(slug);
    }
}

/// Build the startup configuration: optional file, then environment, then validation.
pub fn load_config<F>(path: Option<&Path>, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// [`load_config`] against the real process environment.
pub fn load_from_process_env(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_config(path, |key| std::env::var(key).ok())
}
