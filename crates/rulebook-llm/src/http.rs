//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Create an HTTP client with the standard connect/request timeouts.
///
/// Config: 30s connect timeout, `request_timeout` per request, rustls TLS,
/// `rulebook/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn client_with_timeout(request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(request_timeout)
        .user_agent(concat!("rulebook/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

#[must_use]
pub fn default_client() -> reqwest::Client {
    client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}
