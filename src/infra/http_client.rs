//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound HTTP clients (currently only the welcome mailer) are built here
//! rather than with `reqwest::Client::new()`, so a hung mail API can never
//! pin a notification task forever.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (total request/response time).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build an HTTP client with default timeouts.
///
/// Falls back to a plain client if the builder fails (e.g., TLS backend
/// misconfiguration), logging the reason.
pub fn build_client() -> Client {
    try_build_client().unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to build HTTP client with timeouts, using defaults");
        Client::new()
    })
}

pub fn try_build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}
