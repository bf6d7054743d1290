//! User-defined regex detectors.
//!
//! A custom detector pairs a set of named regexes with optional webhook
//! verification. Definitions are authored in TOML, validated eagerly at
//! load time, and compiled into a [`CustomDetector`] that implements the
//! [`trawl_core::Detector`] capability.

/// Definition loading from TOML.
pub mod config;
/// Bounded cartesian permutation of matches.
pub mod permute;
/// `{name}` / `{name.group}` placeholder parsing and substitution.
pub mod template;
/// Eager definition validation.
pub mod validate;

mod detector;

pub use config::{ConfigError, DetectorConfig, VerifierConfig};
pub use detector::CustomDetector;
pub use permute::{MAX_COMBINATIONS, MatchBundle, MatchGroups, permute};
pub use template::parse_regex_vars;
pub use validate::ValidationError;
