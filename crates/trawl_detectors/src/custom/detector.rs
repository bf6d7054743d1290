//! The custom detector scanning runtime.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use aho_corasick::AhoCorasick;
use regex::Regex;
use tokio::task::JoinSet;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};
use trawl_core::{BoxFuture, Detection, Detector, DetectorError, DetectorType, shannon_entropy};

use crate::custom::config::DetectorConfig;
use crate::custom::permute::{MatchBundle, MatchGroups, permute};
use crate::custom::template;
use crate::custom::validate::{self, ValidationError, parse_success_ranges};

/// A validated, scan-ready custom detector.
///
/// Construction runs every validation rule; an instance can only exist for
/// a definition that passed them all. The instance holds no mutable state,
/// so one detector can serve many concurrent `from_data` calls.
pub struct CustomDetector {
    config: DetectorConfig,
    keywords: Box<[Box<str>]>,
    primary_regex_name: Box<str>,
    exclude_capture: Vec<Regex>,
    exclude_match: Vec<Regex>,
    exclude_words: Option<AhoCorasick>,
    verifiers: Vec<CompiledVerifier>,
}

#[derive(Debug, Clone)]
struct CompiledVerifier {
    endpoint: String,
    headers: Vec<String>,
    success: Vec<RangeInclusive<u16>>,
}

impl std::fmt::Debug for CustomDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomDetector")
            .field("name", &self.config.name)
            .field("regex_count", &self.config.regex.len())
            .field("verifier_count", &self.verifiers.len())
            .finish_non_exhaustive()
    }
}

impl CustomDetector {
    /// Validates `config` and compiles it into a scan-ready detector.
    pub fn new(config: DetectorConfig) -> Result<Self, ValidationError> {
        validate::validate(&config)?;

        let exclude_capture = compile_exclude_patterns("exclude_regexes_capture", &config.exclude_regexes_capture)?;
        let exclude_match = compile_exclude_patterns("exclude_regexes_match", &config.exclude_regexes_match)?;
        let exclude_words = build_word_automaton(&config.exclude_words);

        let verifiers = config
            .verify
            .iter()
            .map(|v| {
                Ok(CompiledVerifier {
                    endpoint: v.endpoint.clone(),
                    headers: v.headers.clone(),
                    success: parse_success_ranges(&v.success_ranges)?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let primary_regex_name = config
            .primary_regex_name
            .clone()
            .or_else(|| config.regex.keys().next().cloned())
            .ok_or(ValidationError::EmptyRegexMap)?
            .into_boxed_str();

        let keywords = config.keywords.iter().map(|k| k.as_str().into()).collect();

        Ok(Self {
            config,
            keywords,
            primary_regex_name,
            exclude_capture,
            exclude_match,
            exclude_words,
            verifiers,
        })
    }

    /// Returns the definition's human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn compile_regexes(&self) -> Result<BTreeMap<Box<str>, Regex>, DetectorError> {
        self.config
            .regex
            .iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|re| (Box::from(name.as_str()), re))
                    .map_err(|source| DetectorError::PatternCompile {
                        name: name.clone(),
                        source,
                    })
            })
            .collect()
    }

    fn collect_matches(regexes: &BTreeMap<Box<str>, Regex>, text: &str) -> BTreeMap<Box<str>, Vec<MatchGroups>> {
        regexes
            .iter()
            .map(|(name, re)| {
                let matches = re
                    .captures_iter(text)
                    .map(|caps| {
                        caps.iter()
                            .map(|group| group.map_or("", |m| m.as_str()).into())
                            .collect()
                    })
                    .collect();
                (name.clone(), matches)
            })
            .collect()
    }

    fn passes_filters(&self, bundle: &MatchBundle) -> bool {
        for groups in bundle.values() {
            let secret = chosen_secret(groups);

            if self.config.entropy.is_some_and(|min| shannon_entropy(secret) < min) {
                return false;
            }
            if self.exclude_words.as_ref().is_some_and(|words| words.is_match(secret)) {
                return false;
            }
            let full = groups.first().map_or("", AsRef::as_ref);
            if self.exclude_match.iter().any(|re| re.is_match(full)) {
                return false;
            }
            if self.exclude_capture.iter().any(|re| re.is_match(secret)) {
                return false;
            }
        }
        true
    }

    fn build_detection(&self, bundle: &MatchBundle) -> Detection {
        let raw: String = bundle.values().map(|groups| chosen_secret(groups)).collect();
        let mut detection = Detection::new(DetectorType::CustomRegex, raw);
        detection.insert_extra("name", self.config.name.as_str());
        if let Some(groups) = bundle.get(self.primary_regex_name.as_ref()) {
            detection = detection.with_primary_secret(chosen_secret(groups));
        }
        detection
    }
}

impl Detector for CustomDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::CustomRegex
    }

    fn keywords(&self) -> &[Box<str>] {
        &self.keywords
    }

    fn from_data<'a>(
        &'a self,
        client: &'a reqwest::Client,
        verify: bool,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<Detection>, DetectorError>> {
        Box::pin(async move {
            let text = String::from_utf8_lossy(data);
            let regexes = self.compile_regexes()?;
            let matches_by_name = Self::collect_matches(&regexes, &text);

            let bundles: Vec<MatchBundle> = permute(&matches_by_name)
                .into_iter()
                .filter(|bundle| self.passes_filters(bundle))
                .collect();

            #[cfg(feature = "tracing")]
            trace!(detector = %self.config.name, bundles = bundles.len(), "permuted candidate bundles");

            let mut detections: Vec<Detection> = bundles.iter().map(|b| self.build_detection(b)).collect();

            if verify && !self.verifiers.is_empty() {
                let mut workers = JoinSet::new();
                for (index, bundle) in bundles.iter().enumerate() {
                    let client = client.clone();
                    let name = self.config.name.clone();
                    let verifiers = self.verifiers.clone();
                    let bundle = bundle.clone();
                    workers.spawn(async move { (index, verify_bundle(&client, &name, &verifiers, &bundle).await) });
                }

                while let Some(joined) = workers.join_next().await {
                    // A worker that panicked or was aborted drops only its
                    // own bundle's verification outcome.
                    let Ok((index, outcome)) = joined else {
                        continue;
                    };
                    match outcome {
                        Ok(true) => detections[index].set_verified(true),
                        Ok(false) => {}
                        Err(message) => {
                            #[cfg(feature = "tracing")]
                            debug!(detector = %self.config.name, error = %message, "verification inconclusive");
                            detections[index].set_verification_error(message);
                        }
                    }
                }
            }

            Ok(detections)
        })
    }
}

/// The secret value a bundle entry contributes: capture group 1 when the
/// pattern has one, the full match otherwise.
fn chosen_secret(groups: &MatchGroups) -> &str {
    if groups.len() > 1 {
        &groups[1]
    } else {
        groups.first().map_or("", AsRef::as_ref)
    }
}

fn compile_exclude_patterns(field: &str, patterns: &[String]) -> Result<Vec<Regex>, ValidationError> {
    patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| {
            Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
                name: format!("{field}[{index}]"),
                source,
            })
        })
        .collect()
}

fn build_word_automaton(words: &[String]) -> Option<AhoCorasick> {
    if words.is_empty() {
        return None;
    }
    AhoCorasick::builder().ascii_case_insensitive(true).build(words).ok()
}

/// Tries each verifier config in order until one reports success.
///
/// Returns `Ok(true)` on the first response whose status matches the
/// config's success criteria, `Ok(false)` when every config responded
/// without matching, and `Err` when no config produced a response at all.
async fn verify_bundle(
    client: &reqwest::Client,
    detector_name: &str,
    verifiers: &[CompiledVerifier],
    bundle: &MatchBundle,
) -> Result<bool, String> {
    let mut last_error = None;
    let mut any_response = false;

    for verifier in verifiers {
        match send_verification(client, detector_name, verifier, bundle).await {
            Ok(status) => {
                any_response = true;
                if status_matches(status, &verifier.success) {
                    return Ok(true);
                }
            }
            Err(error) => last_error = Some(error.to_string()),
        }
    }

    match last_error {
        Some(message) if !any_response => Err(message),
        _ => Ok(false),
    }
}

async fn send_verification(
    client: &reqwest::Client,
    detector_name: &str,
    verifier: &CompiledVerifier,
    bundle: &MatchBundle,
) -> Result<u16, reqwest::Error> {
    let endpoint = template::expand(&verifier.endpoint, bundle);
    let payload = BTreeMap::from([(detector_name, bundle)]);

    let mut request = client.post(endpoint).json(&payload);
    for line in &verifier.headers {
        let expanded = template::expand(line, bundle);
        if let Some((key, value)) = expanded.split_once(':') {
            request = request.header(key.trim(), value.trim_start());
        }
    }

    let response = request.send().await?;
    Ok(response.status().as_u16())
}

fn status_matches(status: u16, ranges: &[RangeInclusive<u16>]) -> bool {
    if ranges.is_empty() {
        status == 200
    } else {
        ranges.iter().any(|range| range.contains(&status))
    }
}
