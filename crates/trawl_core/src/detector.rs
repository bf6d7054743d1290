//! The detector capability contract.

use std::fmt;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::error::DetectorError;

/// A pinned, boxed, `Send` future used as the return type for async scanning.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stable identifier for a detector family.
///
/// Assigned once per concrete detector and never changed; downstream
/// consumers key suppressions and reporting on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorType {
    /// A user-defined regex detector loaded from configuration.
    CustomRegex,
    /// npm registry access tokens.
    Npm,
}

impl DetectorType {
    /// Returns the lowercase string identifier used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomRegex => "custom-regex",
            Self::Npm => "npm",
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The capability a detector exposes to the scanning host.
///
/// The host invokes [`Detector::from_data`] once per chunk per detector,
/// potentially from many workers concurrently. Implementations must hold no
/// mutable state across calls: compiled regexes and validated configuration
/// are read-only and safely shared.
pub trait Detector: Send + Sync {
    /// Returns the stable identifier for this detector family.
    fn detector_type(&self) -> DetectorType;

    /// Returns lowercase literal substrings used by the host's keyword
    /// prefilter. A chunk that contains none of these is never passed to
    /// [`Detector::from_data`]. The set must cover every string the
    /// detector's regexes can match.
    fn keywords(&self) -> &[Box<str>];

    /// Scans `data` for candidate secrets.
    ///
    /// When `verify` is false the call performs no network I/O and every
    /// returned [`Detection`] is unverified. When `verify` is true,
    /// candidates are checked against their provider's API using `client`;
    /// an indeterminate failure (timeout, transport error, unexpected
    /// status) degrades that one candidate to "unverified with a
    /// verification error" rather than failing the call.
    fn from_data<'a>(
        &'a self,
        client: &'a reqwest::Client,
        verify: bool,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<Detection>, DetectorError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_type_display_is_lowercase() {
        assert_eq!(format!("{}", DetectorType::CustomRegex), "custom-regex");
        assert_eq!(format!("{}", DetectorType::Npm), "npm");
    }

    #[test]
    fn detector_type_serialises_as_kebab_case() {
        let json = serde_json::to_string(&DetectorType::CustomRegex).unwrap();
        assert_eq!(json, r#""custom-regex""#);
    }
}
