//! Eager validation of detector definitions.
//!
//! Every rule runs when a definition is constructed into a
//! [`crate::custom::CustomDetector`]; a definition that fails any check is
//! rejected outright and never reaches the scanning runtime. Messages name
//! the offending field so operators can fix configuration before scanning.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use regex::Regex;

use crate::custom::config::DetectorConfig;
use crate::custom::template::parse_regex_vars;

/// Inclusive bounds for acceptable HTTP status codes in success ranges.
const STATUS_BOUNDS: RangeInclusive<u16> = 100..=599;

/// A definition failed one of the load-time validation rules.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The definition declared no keywords.
    #[error("keywords must not be empty")]
    EmptyKeywords,

    /// A keyword was the empty string.
    #[error("keywords must not contain empty strings")]
    EmptyKeyword,

    /// The definition declared no regex entries.
    #[error("regex map must not be empty")]
    EmptyRegexMap,

    /// A regex entry failed to compile.
    #[error("invalid regex '{name}': {source}")]
    InvalidPattern {
        /// Name of the regex entry that failed to compile.
        name: String,
        /// The underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A verifier declared an empty endpoint.
    #[error("verifier endpoint must not be empty")]
    EmptyEndpoint,

    /// A verifier declared a plain-text endpoint without opting in.
    #[error("endpoint '{endpoint}' uses http; set unsafe = true to allow sending secrets in clear text")]
    InsecureEndpoint {
        /// The offending endpoint URL.
        endpoint: String,
    },

    /// A header line contained no colon separator.
    #[error("malformed header '{header}': expected 'Key: Value'")]
    MalformedHeader {
        /// The offending header line.
        header: String,
    },

    /// A success range entry could not be interpreted.
    #[error("invalid success range '{range}': {reason}")]
    InvalidRange {
        /// The offending range string.
        range: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// A template body referenced a regex name the definition does not declare.
    #[error("template '{body}' references unknown regex variable '{name}'")]
    UnknownVariable {
        /// The endpoint or header body containing the reference.
        body: String,
        /// The undeclared variable name.
        name: String,
    },

    /// `primary_regex_name` named a regex entry that does not exist.
    #[error("primary_regex_name '{name}' does not match any regex entry")]
    UnknownPrimaryRegexName {
        /// The undeclared primary regex name.
        name: String,
    },
}

/// Runs every validation rule against a definition.
pub fn validate(config: &DetectorConfig) -> Result<(), ValidationError> {
    validate_keywords(&config.keywords)?;
    validate_regex(&config.regex)?;

    for verifier in &config.verify {
        validate_verify_endpoint(&verifier.endpoint, verifier.insecure)?;
        validate_verify_headers(&verifier.headers)?;
        parse_success_ranges(&verifier.success_ranges)?;

        let bodies = std::iter::once(verifier.endpoint.as_str()).chain(verifier.headers.iter().map(String::as_str));
        validate_regex_vars(&config.regex, bodies)?;
    }

    validate_primary_regex_name(&config.regex, config.primary_regex_name.as_deref())?;
    Ok(())
}

/// Requires a non-empty keyword list with no empty entries.
pub fn validate_keywords(keywords: &[String]) -> Result<(), ValidationError> {
    if keywords.is_empty() {
        return Err(ValidationError::EmptyKeywords);
    }
    if keywords.iter().any(String::is_empty) {
        return Err(ValidationError::EmptyKeyword);
    }
    Ok(())
}

/// Requires a non-empty regex map in which every pattern compiles.
pub fn validate_regex(regex: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if regex.is_empty() {
        return Err(ValidationError::EmptyRegexMap);
    }
    for (name, pattern) in regex {
        Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
            name: name.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Requires a non-empty endpoint; a literal `http://` prefix is rejected
/// unless `insecure` is set. Other schemes (including a missing scheme) are
/// not this rule's concern.
pub fn validate_verify_endpoint(endpoint: &str, insecure: bool) -> Result<(), ValidationError> {
    if endpoint.is_empty() {
        return Err(ValidationError::EmptyEndpoint);
    }
    if endpoint.starts_with("http://") && !insecure {
        return Err(ValidationError::InsecureEndpoint {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(())
}

/// Requires every header line to contain a colon separator. A trailing
/// colon with an empty value is accepted.
pub fn validate_verify_headers(headers: &[String]) -> Result<(), ValidationError> {
    for header in headers {
        if !header.contains(':') {
            return Err(ValidationError::MalformedHeader { header: header.clone() });
        }
    }
    Ok(())
}

/// Parses success range entries into inclusive status ranges.
///
/// Entries are either a single status code (`"204"`) or a `lower-upper`
/// pair (`"200-299"`); all bounds must lie within 100-599.
pub fn parse_success_ranges(ranges: &[String]) -> Result<Vec<RangeInclusive<u16>>, ValidationError> {
    ranges.iter().map(|entry| parse_range_entry(entry)).collect()
}

fn parse_range_entry(entry: &str) -> Result<RangeInclusive<u16>, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidRange {
        range: entry.to_string(),
        reason: reason.to_string(),
    };

    if !entry.contains('-') {
        let code = parse_status(entry).ok_or_else(|| invalid("not a valid HTTP status code"))?;
        return Ok(code..=code);
    }

    let parts: Vec<&str> = entry.split('-').collect();
    if parts.len() != 2 {
        return Err(invalid("expected 'lower-upper'"));
    }
    let lower = parse_status(parts[0]).ok_or_else(|| invalid("lower bound is not a valid HTTP status code"))?;
    let upper = parse_status(parts[1]).ok_or_else(|| invalid("upper bound is not a valid HTTP status code"))?;
    if lower > upper {
        return Err(invalid("lower bound exceeds upper bound"));
    }
    Ok(lower..=upper)
}

fn parse_status(s: &str) -> Option<u16> {
    let code = s.trim().parse::<u16>().ok()?;
    STATUS_BOUNDS.contains(&code).then_some(code)
}

/// Requires every `{name}` / `{name.group}` placeholder in the given bodies
/// to reference a declared regex name.
pub fn validate_regex_vars<'a>(
    regex: &BTreeMap<String, String>,
    bodies: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    for body in bodies {
        for name in parse_regex_vars(body).into_keys() {
            if !regex.contains_key(name.as_ref()) {
                return Err(ValidationError::UnknownVariable {
                    body: body.to_string(),
                    name: name.into_string(),
                });
            }
        }
    }
    Ok(())
}

/// Requires `primary_regex_name`, when set, to reference a declared regex.
///
/// When unset, the runtime falls back to the first name in lexicographic
/// order; that choice is deterministic per definition but carries no
/// semantic weight.
pub fn validate_primary_regex_name(
    regex: &BTreeMap<String, String>,
    primary: Option<&str>,
) -> Result<(), ValidationError> {
    match primary {
        Some(name) if !regex.contains_key(name) => {
            Err(ValidationError::UnknownPrimaryRegexName { name: name.to_string() })
        }
        _ => Ok(()),
    }
}
