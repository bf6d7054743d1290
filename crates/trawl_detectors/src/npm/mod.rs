//! npm token detection and registry correlation.
//!
//! An npm access token on its own says nothing about where it works: the
//! same `.npmrc` syntax authenticates against the public registry, a
//! private Artifactory, a Nexus repository, or a dozen hosted platforms.
//! This module infers which registry a leaked token belongs to from the
//! surrounding chunk, then verifies the token against that registry's own
//! endpoints.

mod detector;
/// Registry URL inference from chunk context.
pub mod registry;
/// Registry-specific token verification.
pub mod verify;

pub use detector::NpmTokenDetector;
pub use registry::{RegistryInfo, RegistryType, Scheme, find_all_urls, find_token_registry};
pub use verify::{NpmVerificationError, TokenVerification, verify_token};
