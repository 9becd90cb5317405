//! Small helpers shared by all adapters.

use troupe_domain::config::ProviderConfig;
use troupe_domain::error::{Error, Result};

/// Map a reqwest error to the domain error type, preserving the timeout
/// distinction so callers can tell a slow backend from a broken one.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key for a provider from its configured env var.
///
/// A provider with no `api_key_env` gets an empty key (local backends and
/// bridges typically need none).
pub(crate) fn resolve_api_key(cfg: &ProviderConfig) -> Result<String> {
    let env_var = match &cfg.api_key_env {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(String::new()),
    };
    match std::env::var(env_var) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(Error::Auth(format!(
            "provider '{}': env var {env_var} is unset or empty",
            cfg.id
        ))),
    }
}

/// Default HTTP client for provider adapters: generous timeout, since
/// streaming responses stay open for the duration of a completion.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(from_reqwest)
}
