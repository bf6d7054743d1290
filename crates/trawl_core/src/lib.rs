//! Core detector boundary for trawl.
//!
//! This crate defines the capability contract between the scanning host and
//! the concrete detector families: the [`Detector`] trait, the [`Detection`]
//! record detectors produce, and the shared plumbing every verifying
//! detector needs (a pooled HTTP client, Shannon entropy scoring, error
//! types).
//!
//! # Main Types
//!
//! - [`Detector`] - The capability a detector exposes to the scanning host
//! - [`Detection`] - A candidate secret, optionally verified against a live API
//! - [`DetectorType`] - Stable identifier for a detector family
//! - [`DetectorError`] - Failures that abort a whole `from_data` call
//!
//! # Error Handling
//!
//! This crate uses [`thiserror`] for structured, typed errors. Determinate
//! "this credential is invalid" outcomes are not errors: they surface as an
//! unverified [`Detection`]. Only internal invariant violations (a regex
//! that validated but no longer compiles) and client construction failures
//! abort a call.

/// The candidate-secret record produced by detectors.
pub mod detection;
/// The detector capability trait and its async return type.
pub mod detector;
pub(crate) mod entropy;
/// Error types shared across detector families.
pub mod error;
/// Shared HTTP client construction for live verification.
pub mod http;

pub use detection::Detection;
pub use detector::{BoxFuture, Detector, DetectorType};
pub use entropy::shannon_entropy;
pub use error::DetectorError;
pub use http::{USER_AGENT, current_timestamp, verification_client};
