//! Registry-specific token verification.
//!
//! Most npm-compatible registries answer `GET /-/whoami` with the token
//! holder's username, but the platforms disagree on what an *invalid*
//! token looks like: Artifactory, Nexus 3 and JetBrains Space happily
//! return HTTP 200 with an anonymous-equivalent username, and Nexus 2 has
//! no whoami endpoint at all. The dispatch here encodes those
//! idiosyncrasies so a "valid-looking" response is never mistaken for a
//! live credential.

use std::collections::BTreeMap;

use trawl_core::current_timestamp;

use crate::npm::registry::{RegistryInfo, RegistryType};

/// Errors that leave a token's status undetermined.
#[derive(Debug, thiserror::Error)]
pub enum NpmVerificationError {
    /// An HTTP request to the registry failed in transit.
    #[error("npm verification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry host could not be reached at all; no endpoint fallback
    /// is worth trying.
    #[error("registry '{uri}' is unreachable: {source}")]
    Unreachable {
        /// The registry URI that could not be reached.
        uri: String,
        /// The underlying connection error.
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a status the protocol does not account for.
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        /// The HTTP status received.
        status: u16,
        /// The endpoint that produced it.
        endpoint: String,
    },

    /// No verification path is implemented for this platform.
    #[error("verification not supported for {registry_type} registries")]
    Unsupported {
        /// The platform lacking a verification path.
        registry_type: RegistryType,
    },
}

/// The outcome of checking a token against its registry.
#[derive(Debug, Clone, Default)]
pub struct TokenVerification {
    /// Whether the registry accepted the token as an authenticated user.
    pub verified: bool,
    /// Side-channel detail: username, endpoint used, timestamps.
    pub metadata: BTreeMap<Box<str>, Box<str>>,
}

impl TokenVerification {
    fn not_verified() -> Self {
        Self::default()
    }

    fn verified_as(username: Option<&str>, endpoint_kind: &str) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(username) = username {
            metadata.insert("username".into(), username.into());
        }
        metadata.insert("endpoint".into(), endpoint_kind.into());
        metadata.insert("verified_at".into(), current_timestamp());
        Self {
            verified: true,
            metadata,
        }
    }

    fn with_note(mut self, note: &str) -> Self {
        self.metadata.insert("note".into(), note.into());
        self
    }
}

/// Checks a token against the registry it was inferred to belong to.
///
/// A determinate rejection (HTTP 401) is not an error: it returns an
/// unverified outcome. Errors mean the status could not be determined and
/// the caller should not treat the candidate as a false positive.
pub async fn verify_token(
    client: &reqwest::Client,
    info: &RegistryInfo,
    token: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    match info.registry_type {
        RegistryType::Gitlab | RegistryType::GoogleArtifact | RegistryType::AwsCodeArtifact => {
            Err(NpmVerificationError::Unsupported {
                registry_type: info.registry_type,
            })
        }
        RegistryType::Nexus2 => check_all_docs(client, info, token).await,
        RegistryType::Other => check_unknown_registry(client, info, token).await,
        _ => check_whoami(client, info, token).await,
    }
}

/// `GET /-/whoami` with a bearer token.
async fn check_whoami(
    client: &reqwest::Client,
    info: &RegistryInfo,
    token: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    let endpoint = format!("{}/-/whoami", info.base_url());
    let response = client.get(&endpoint).bearer_auth(token).send().await?;

    match response.status().as_u16() {
        200 => {
            let body: serde_json::Value = response.json().await?;
            let username = body.get("username").and_then(|v| v.as_str()).unwrap_or_default();
            if username.is_empty() {
                return Ok(TokenVerification::not_verified());
            }
            if is_anonymous_sentinel(info.registry_type, username) {
                return confirm_anonymous(client, &endpoint, username).await;
            }
            Ok(TokenVerification::verified_as(Some(username), "whoami"))
        }
        401 => Ok(TokenVerification::not_verified()),
        status => Err(NpmVerificationError::UnexpectedStatus { status, endpoint }),
    }
}

/// Whether a 200 whoami response actually means "unauthenticated" on this
/// platform.
fn is_anonymous_sentinel(registry_type: RegistryType, username: &str) -> bool {
    match registry_type {
        RegistryType::ArtifactoryCloud | RegistryType::ArtifactoryHosted => username == "anonymous",
        RegistryType::Nexus3 => username.starts_with("anonymous"),
        RegistryType::Jetbrains => username == "internal",
        _ => false,
    }
}

/// Re-issues a whoami request without credentials to confirm a sentinel
/// username appears regardless of auth. Either way the token is not
/// treated as verified; the note records what the registry reported.
async fn confirm_anonymous(
    client: &reqwest::Client,
    endpoint: &str,
    username: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    let unauthenticated = async {
        let response = client.get(endpoint).send().await.ok()?;
        if response.status().as_u16() != 200 {
            return None;
        }
        let body: serde_json::Value = response.json().await.ok()?;
        body.get("username").and_then(|v| v.as_str()).map(String::from)
    }
    .await;

    let note = if unauthenticated.as_deref() == Some(username) {
        format!("registry reports '{username}' for anonymous access")
    } else {
        format!("registry mapped the token to anonymous-equivalent user '{username}'")
    };
    Ok(TokenVerification::not_verified().with_note(&note))
}

/// `GET /-/all` for registries without a whoami endpoint (Nexus 2). A 200
/// is taken as sufficient evidence; there is no username to extract.
async fn check_all_docs(
    client: &reqwest::Client,
    info: &RegistryInfo,
    token: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    let endpoint = format!("{}/-/all", info.base_url());
    let response = client.get(&endpoint).bearer_auth(token).send().await?;

    match response.status().as_u16() {
        200 => Ok(TokenVerification::verified_as(None, "all")),
        401 => Ok(TokenVerification::not_verified()),
        status => Err(NpmVerificationError::UnexpectedStatus { status, endpoint }),
    }
}

/// `GET /-/v1/search` as a weaker authenticated probe.
async fn check_search(
    client: &reqwest::Client,
    info: &RegistryInfo,
    token: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    let endpoint = format!("{}/-/v1/search", info.base_url());
    let response = client
        .get(&endpoint)
        .query(&[("text", "test"), ("size", "1")])
        .bearer_auth(token)
        .send()
        .await?;

    match response.status().as_u16() {
        200 => Ok(TokenVerification::verified_as(None, "search")),
        401 => Ok(TokenVerification::not_verified()),
        status => Err(NpmVerificationError::UnexpectedStatus { status, endpoint }),
    }
}

/// Endpoint chain for unrecognised registries: whoami, then search, then
/// `/-/all`, accepting the first determinate answer. A connection failure
/// short-circuits immediately: the registry itself is unreachable, so the
/// remaining endpoints cannot fare better.
async fn check_unknown_registry(
    client: &reqwest::Client,
    info: &RegistryInfo,
    token: &str,
) -> Result<TokenVerification, NpmVerificationError> {
    let mut last_error = None;

    for attempt in 0..3u8 {
        let outcome = match attempt {
            0 => check_whoami(client, info, token).await,
            1 => check_search(client, info, token).await,
            _ => check_all_docs(client, info, token).await,
        };

        match outcome {
            Ok(result) => return Ok(result),
            Err(error) => {
                if is_unreachable(&error) {
                    return Err(promote_unreachable(error, &info.uri));
                }
                last_error = Some(error);
            }
        }
    }

    match last_error {
        Some(error) => Err(error),
        None => Ok(TokenVerification::not_verified()),
    }
}

fn is_unreachable(error: &NpmVerificationError) -> bool {
    matches!(error, NpmVerificationError::Http(e) if e.is_connect())
}

fn promote_unreachable(error: NpmVerificationError, uri: &str) -> NpmVerificationError {
    match error {
        NpmVerificationError::Http(source) => NpmVerificationError::Unreachable {
            uri: uri.to_string(),
            source,
        },
        other => other,
    }
}
