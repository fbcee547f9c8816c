//! HTTP client initialization.

use crate::config::Config;
use crate::error_handling::InitializationError;
use reqwest::ClientBuilder;

/// Initializes the shared HTTP client.
///
/// No global timeout is set: the registry, stats and worker calls each apply
/// their own per-request timeout.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &Config) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}
