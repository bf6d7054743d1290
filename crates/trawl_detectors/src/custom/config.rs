//! User-authored detector definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One HTTP endpoint used to confirm a candidate secret is live.
///
/// The endpoint and header values may embed `{name}` or `{name.group}`
/// placeholders referencing the definition's named regexes; they are
/// substituted with the matched values before the request is issued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// URL the verification request is sent to.
    pub endpoint: String,
    /// Permits a plain-text `http://` endpoint. Off by default: secrets are
    /// never sent in clear text without an explicit opt-in.
    #[serde(default, rename = "unsafe")]
    pub insecure: bool,
    /// `"Key: Value"` header lines applied to the request.
    #[serde(default)]
    pub headers: Vec<String>,
    /// HTTP statuses treated as a successful verification: single codes
    /// (`"200"`) or inclusive ranges (`"200-299"`). Empty means exactly 200.
    #[serde(default)]
    pub success_ranges: Vec<String>,
}

/// A user-defined regex detector declared in TOML.
///
/// Definitions are plain data until passed through
/// [`crate::custom::validate`]; a definition that fails validation can
/// never reach the scanning runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Human-readable label, also used as the webhook payload key.
    pub name: String,
    /// Lowercase literal substrings for the host's keyword prefilter. At
    /// least one must appear in a chunk for the detector to run.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Named regex patterns. Names are iterated in lexicographic order
    /// wherever ordering is observable (permutation truncation, `raw`
    /// concatenation).
    #[serde(default)]
    pub regex: BTreeMap<String, String>,
    /// Names the regex whose match is the most security-sensitive part of
    /// a multi-part detection. Defaults to the first name in lexicographic
    /// order when unset.
    #[serde(default)]
    pub primary_regex_name: Option<String>,
    /// Candidates whose chosen secret value matches any of these patterns
    /// are discarded.
    #[serde(default)]
    pub exclude_regexes_capture: Vec<String>,
    /// Candidates whose full match text matches any of these patterns are
    /// discarded.
    #[serde(default)]
    pub exclude_regexes_match: Vec<String>,
    /// Case-insensitive substrings that disqualify a candidate secret.
    #[serde(default)]
    pub exclude_words: Vec<String>,
    /// Minimum Shannon entropy for a candidate secret.
    #[serde(default)]
    pub entropy: Option<f64>,
    /// Verification endpoints, tried in order until one succeeds.
    #[serde(default)]
    pub verify: Vec<VerifierConfig>,
}

impl DetectorConfig {
    /// Parses a definition from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Loads a definition from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Errors that can occur when reading or parsing a detector definition file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The definition file could not be read from disk.
    #[error("failed to read detector definition '{path}': {source}")]
    Read {
        /// Path to the definition file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The definition file contained invalid TOML or unexpected values.
    #[error("failed to parse detector definition '{path}': {source}")]
    Parse {
        /// Path to the definition that could not be parsed.
        path: PathBuf,
        /// The underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn from_toml_parses_minimal_definition() {
        let config = DetectorConfig::from_toml(
            r#"
            name = "internal-api-key"
            keywords = ["intapi"]

            [regex]
            key = 'intapi_[a-z0-9]{32}'
        "#,
        )
        .unwrap();

        assert_eq!(config.name, "internal-api-key");
        assert_eq!(config.keywords, vec!["intapi"]);
        assert_eq!(config.regex.get("key").map(String::as_str), Some("intapi_[a-z0-9]{32}"));
        assert!(config.verify.is_empty());
        assert!(config.entropy.is_none());
    }

    #[test]
    fn from_toml_parses_full_definition() {
        let config = DetectorConfig::from_toml(
            r#"
            name = "paired-credential"
            keywords = ["acct"]
            primary_regex_name = "secret"
            exclude_words = ["changeme", "example"]
            exclude_regexes_capture = ['0{8,}']
            exclude_regexes_match = ['acct_id = "test"']
            entropy = 3.0

            [regex]
            id = 'acct_id = "([a-z0-9]{12})"'
            secret = 'acct_secret = "([a-z0-9]{32})"'

            [[verify]]
            endpoint = "https://api.internal.example/v1/check"
            headers = ["Authorization: Bearer {secret.1}"]
            success_ranges = ["200-299"]
        "#,
        )
        .unwrap();

        assert_eq!(config.regex.len(), 2);
        assert_eq!(config.primary_regex_name.as_deref(), Some("secret"));
        assert_eq!(config.exclude_words.len(), 2);
        assert_eq!(config.entropy, Some(3.0));
        assert_eq!(config.verify.len(), 1);
        assert_eq!(config.verify[0].success_ranges, vec!["200-299"]);
        assert!(!config.verify[0].insecure);
    }

    #[test]
    fn from_toml_maps_unsafe_key_to_insecure_flag() {
        let config = DetectorConfig::from_toml(
            r#"
            name = "plain-http"

            [[verify]]
            endpoint = "http://10.0.0.5/check"
            unsafe = true
        "#,
        )
        .unwrap();
        assert!(config.verify[0].insecure);
    }

    #[test]
    fn regex_names_iterate_in_lexicographic_order() {
        let config = DetectorConfig::from_toml(
            r#"
            name = "ordering"

            [regex]
            zeta = 'z+'
            alpha = 'a+'
            mid = 'm+'
        "#,
        )
        .unwrap();

        let names: Vec<_> = config.regex.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn from_toml_rejects_malformed_toml() {
        assert!(DetectorConfig::from_toml("name = [unterminated").is_err());
    }

    #[test]
    fn load_reads_definition_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name = \"from-disk\"").unwrap();

        let config = DetectorConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "from-disk");
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let error = DetectorConfig::load(Path::new("/nonexistent/detector.toml")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/detector.toml"));
    }
}
