use std::time::Duration;

use anyhow::ensure;
use kc_core::core::{AccessGate, ConfigError, ModelName, Passphrase};

use crate::config::{AppConfig, LogFormat};
use crate::polling::PollConfig;

// ---------------------------------------------------------------------------
// RuntimeConfig — fully validated runtime configuration
// ---------------------------------------------------------------------------

pub struct RuntimeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
    pub model_fetch_concurrency: usize,
    pub default_model: ModelName,
    pub access_gate: AccessGate,
    pub log_level: String,
    pub log_format: LogFormat,
}

// ---------------------------------------------------------------------------
// into_runtime — converts raw AppConfig into validated RuntimeConfig
// ---------------------------------------------------------------------------

pub fn into_runtime(config: AppConfig) -> Result<RuntimeConfig, anyhow::Error> {
    let base_url = validate_base_url(config.backend.base_url.as_deref())?;

    ensure!(
        config.backend.request_timeout_secs > 0,
        "request_timeout_secs must be positive"
    );
    ensure!(config.polling.interval_ms > 0, "polling interval_ms must be positive");
    ensure!(
        config.polling.max_attempts > 0,
        "polling max_attempts must be positive"
    );
    ensure!(
        config.analysis.model_fetch_concurrency > 0,
        "model_fetch_concurrency must be at least 1"
    );
    ensure!(
        !config.analysis.default_model.trim().is_empty(),
        "default_model must not be empty"
    );

    let admin = passphrase(config.access.admin_passphrase, "admin_passphrase")?;
    let viewer = passphrase(config.access.viewer_passphrase, "viewer_passphrase")?;

    Ok(RuntimeConfig {
        base_url,
        request_timeout: Duration::from_secs(config.backend.request_timeout_secs),
        poll: PollConfig {
            interval: Duration::from_millis(config.polling.interval_ms),
            max_attempts: config.polling.max_attempts,
        },
        model_fetch_concurrency: config.analysis.model_fetch_concurrency,
        default_model: ModelName::new(config.analysis.default_model.trim()),
        access_gate: AccessGate::new(admin, viewer),
        log_level: config.logging.level,
        log_format: config.logging.format,
    })
}

/// Missing or non-http base URLs fail here, before any request is built.
pub fn validate_base_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let url = raw
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ConfigError::MissingBaseUrl)?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(url.to_owned()));
    }
    Ok(url.trim_end_matches('/').to_owned())
}

fn passphrase(value: Option<String>, field: &str) -> Result<Option<Passphrase>, anyhow::Error> {
    match value {
        Some(v) => {
            ensure!(!v.is_empty(), "{field} must not be empty when set");
            Ok(Some(Passphrase::new(v)))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
