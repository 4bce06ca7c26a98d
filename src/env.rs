//! Environment configuration utilities for the probe binary.

use std::{env, str::FromStr, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use hedged_http::{HedgeConfig, HedgedClient};
use http::Uri;

/// Everything the probe needs, as read from the environment.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub target: Uri,
    pub config: HedgeConfig,
    pub calls: usize,
}

/// Parses `env_key` if it is set, otherwise returns `default`.
pub fn var_or<T>(env_key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(env_key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("invalid value for {env_key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Loads probe settings from environment variables.
///
/// Looks for the following environment variables:
/// - `HEDGED_TARGET_URL` (required)
/// - `HEDGED_INTERVAL_MS` (default 50)
/// - `HEDGED_MAX_ATTEMPTS` (default 3)
/// - `HEDGED_TIMEOUT_MS` (optional)
/// - `HEDGED_CALLS` (default 10)
pub fn settings_from_env() -> Result<ProbeSettings> {
    let Ok(target) = env::var("HEDGED_TARGET_URL") else {
        color_eyre::eyre::bail!(
            "No target configured.\n\
             Set HEDGED_TARGET_URL, and optionally HEDGED_INTERVAL_MS, \
             HEDGED_MAX_ATTEMPTS, HEDGED_TIMEOUT_MS, HEDGED_CALLS"
        );
    };
    let target: Uri = target
        .parse()
        .wrap_err_with(|| format!("invalid HEDGED_TARGET_URL: {target:?}"))?;

    let interval_ms: i64 = var_or("HEDGED_INTERVAL_MS", 50)?;
    let max_attempts: i64 = var_or("HEDGED_MAX_ATTEMPTS", 3)?;
    let mut config = HedgeConfig::from_millis(interval_ms, max_attempts)?;

    if env::var_os("HEDGED_TIMEOUT_MS").is_some() {
        let timeout_ms: u64 = var_or("HEDGED_TIMEOUT_MS", 0)?;
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }

    Ok(ProbeSettings {
        target,
        config,
        calls: var_or("HEDGED_CALLS", 10)?,
    })
}

/// Builds a hedged client from environment variables.
pub fn build_client_from_env() -> Result<(HedgedClient, ProbeSettings)> {
    let settings = settings_from_env()?;
    let client = HedgedClient::from_config(settings.config);
    Ok((client, settings))
}
