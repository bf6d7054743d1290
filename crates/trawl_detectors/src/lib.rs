//! Detector families for the trawl secret scanner.
//!
//! Two families live here, both implementing the [`trawl_core::Detector`]
//! capability:
//!
//! - [`custom`] - user-defined regex detectors loaded from TOML, with
//!   bounded match permutation and optional webhook verification.
//! - [`npm`] - npm access tokens, correlated to the package registry they
//!   belong to and verified against registry-specific endpoints.

/// User-defined regex detectors.
pub mod custom;
/// npm token detection and registry correlation.
pub mod npm;

pub use custom::{CustomDetector, DetectorConfig, ValidationError, VerifierConfig};
pub use npm::{NpmTokenDetector, NpmVerificationError, RegistryInfo, RegistryType, Scheme};
