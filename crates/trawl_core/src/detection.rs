//! The candidate-secret record produced by detectors.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::detector::DetectorType;

/// A candidate secret found in a chunk, optionally verified live.
///
/// Created once per match by a detector's `from_data` call and never
/// mutated afterwards by other components. `raw` holds the matched secret
/// itself; `raw_v2`, when present, is a disambiguating composite (for
/// example token plus registry URI) used where a single secret string is
/// not unique enough to deduplicate on.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// Which detector family produced this detection.
    pub detector_type: DetectorType,
    /// The matched secret value.
    pub raw: Box<str>,
    /// Optional composite of the secret plus distinguishing context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_v2: Option<Box<str>>,
    /// Whether the secret was confirmed live against its provider's API.
    pub verified: bool,
    /// Side-channel metadata (usernames, registry URIs, timestamps).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_data: BTreeMap<Box<str>, Box<str>>,
    /// Why verification could not reach a determinate answer, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<Box<str>>,
    /// The most security-sensitive value within a multi-part match,
    /// designated by the detector's configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_secret: Option<Box<str>>,
}

impl Detection {
    /// Creates an unverified detection with no metadata attached.
    #[must_use]
    pub fn new(detector_type: DetectorType, raw: impl Into<Box<str>>) -> Self {
        Self {
            detector_type,
            raw: raw.into(),
            raw_v2: None,
            verified: false,
            extra_data: BTreeMap::new(),
            verification_error: None,
            primary_secret: None,
        }
    }

    /// Attaches a disambiguating composite value.
    #[must_use]
    pub fn with_raw_v2(mut self, raw_v2: impl Into<Box<str>>) -> Self {
        self.raw_v2 = Some(raw_v2.into());
        self
    }

    /// Designates the primary secret within a multi-part match.
    #[must_use]
    pub fn with_primary_secret(mut self, value: impl Into<Box<str>>) -> Self {
        self.primary_secret = Some(value.into());
        self
    }

    /// Records a metadata key/value pair.
    pub fn insert_extra(&mut self, key: impl Into<Box<str>>, value: impl Into<Box<str>>) {
        self.extra_data.insert(key.into(), value.into());
    }

    /// Marks the secret as confirmed live.
    pub fn set_verified(&mut self, verified: bool) {
        self.verified = verified;
    }

    /// Records an indeterminate verification failure.
    ///
    /// A detection carrying a verification error is always unverified; the
    /// host should surface it as "found but could not be checked".
    pub fn set_verification_error(&mut self, message: impl Into<Box<str>>) {
        self.verified = false;
        self.verification_error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_detection_is_unverified_and_empty() {
        let detection = Detection::new(DetectorType::Npm, "npm_abc123");
        assert!(!detection.verified);
        assert!(detection.raw_v2.is_none());
        assert!(detection.extra_data.is_empty());
        assert!(detection.verification_error.is_none());
        assert!(detection.primary_secret.is_none());
    }

    #[test]
    fn with_raw_v2_attaches_composite() {
        let detection = Detection::new(DetectorType::Npm, "token").with_raw_v2("tokenregistry.npmjs.org");
        assert_eq!(detection.raw_v2.as_deref(), Some("tokenregistry.npmjs.org"));
    }

    #[test]
    fn set_verification_error_clears_verified_flag() {
        let mut detection = Detection::new(DetectorType::CustomRegex, "secret");
        detection.set_verified(true);
        detection.set_verification_error("connection reset");

        assert!(!detection.verified);
        assert_eq!(detection.verification_error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn insert_extra_keeps_keys_sorted() {
        let mut detection = Detection::new(DetectorType::Npm, "token");
        detection.insert_extra("username", "alice");
        detection.insert_extra("registry", "registry.npmjs.org");

        let keys: Vec<_> = detection.extra_data.keys().map(AsRef::as_ref).collect();
        assert_eq!(keys, vec!["registry", "username"]);
    }

    #[test]
    fn serialises_without_empty_optional_fields() {
        let detection = Detection::new(DetectorType::Npm, "token");
        let json = serde_json::to_string(&detection).unwrap();

        assert!(json.contains(r#""raw":"token""#));
        assert!(!json.contains("raw_v2"));
        assert!(!json.contains("extra_data"));
        assert!(!json.contains("verification_error"));
    }
}
