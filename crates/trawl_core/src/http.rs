//! Shared HTTP plumbing for live verification.

use std::time::Duration;

use crate::error::DetectorError;

/// HTTP `User-Agent` header sent during secret verification requests.
pub const USER_AGENT: &str = concat!("trawl-secret-scanner/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout applied to every verification call.
///
/// Timeouts are per request, not per scan: a slow provider degrades one
/// candidate to "unverified" without stalling the rest of the chunk.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the pooled client shared by all verifying detectors.
///
/// The client is safe for concurrent use and is expected to be constructed
/// once by the host and passed by reference into every `from_data` call.
pub fn verification_client() -> Result<reqwest::Client, DetectorError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DetectorError::ClientInit(e.to_string()))
}

/// Returns the current time as an ISO 8601 UTC timestamp.
#[must_use]
pub fn current_timestamp() -> Box<str> {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
        .into_boxed_str()
}
