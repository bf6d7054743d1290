use thiserror::Error;

/// Errors that abort an entire `from_data` call.
///
/// Verification failures never appear here: an indeterminate check attaches
/// a message to the affected [`crate::Detection`] instead, so one flaky
/// network call can not make the scanner miss a real secret.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The shared HTTP client could not be initialised.
    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(String),

    /// A regex that passed definition-time validation failed to compile at
    /// scan time. This is an internal invariant violation, not a user error.
    #[error("invalid regex for '{name}': {source}")]
    PatternCompile {
        /// Name of the regex entry that failed to compile.
        name: String,
        /// The underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_compile_error_names_the_failing_entry() {
        let source = regex::Regex::new("[unclosed").unwrap_err();
        let error = DetectorError::PatternCompile {
            name: "api_key".into(),
            source,
        };
        assert!(error.to_string().contains("api_key"));
    }
}
