//! Registry URL inference.
//!
//! Two tiers of matching. The known tier recognises the URL shapes of the
//! major npm-compatible hosting platforms and classifies each match with a
//! platform tag. The generic tier picks up lower-confidence `.npmrc` /
//! `.yarnrc.yml` / `.upmconfig.toml` idioms against an arbitrary host, but
//! only where the known tier did not already claim the substring. A
//! deny-list of documentation placeholder hosts filters both tiers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Platform tag for a recognised registry URL shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryType {
    /// The public npm registry and its well-known mirrors/proxies.
    Npm,
    /// JFrog Artifactory, cloud-hosted (`*.jfrog.io`).
    ArtifactoryCloud,
    /// JFrog Artifactory, self-hosted.
    ArtifactoryHosted,
    /// Sonatype Nexus Repository 2.
    Nexus2,
    /// Sonatype Nexus Repository 3.
    Nexus3,
    /// GitLab package registry.
    Gitlab,
    /// GitHub Packages.
    Github,
    /// Azure Artifacts / Azure DevOps feeds.
    Azure,
    /// JetBrains Space packages.
    Jetbrains,
    /// Google Artifact Registry.
    GoogleArtifact,
    /// Gemfury.
    Gemfury,
    /// AWS CodeArtifact.
    AwsCodeArtifact,
    /// An unrecognised, presumed self-hosted registry.
    Other,
}

impl RegistryType {
    /// Returns the lowercase identifier used in detection metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::ArtifactoryCloud => "artifactory-cloud",
            Self::ArtifactoryHosted => "artifactory-hosted",
            Self::Nexus2 => "nexus2",
            Self::Nexus3 => "nexus3",
            Self::Gitlab => "gitlab",
            Self::Github => "github",
            Self::Azure => "azure",
            Self::Jetbrains => "jetbrains",
            Self::GoogleArtifact => "google-artifact-registry",
            Self::Gemfury => "gemfury",
            Self::AwsCodeArtifact => "aws-codeartifact",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URL scheme associated with a registry, when it could be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// No scheme was written next to the URL and the chunk gave no other evidence.
    Unknown,
    /// Plain-text HTTP.
    Http,
    /// HTTPS.
    Https,
}

impl Scheme {
    /// Returns the scheme as written in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Returns the prefix used when building request URLs. An unknown
    /// scheme resolves to `https://`: verification never downgrades to
    /// plain text on a guess.
    #[must_use]
    pub const fn as_prefix(self) -> &'static str {
        match self {
            Self::Http => "http://",
            Self::Https | Self::Unknown => "https://",
        }
    }
}

/// The inferred identity of one npm-compatible registry.
///
/// Constructed fresh per chunk scan and never mutated afterwards. `uri` is
/// host plus path with the scheme and any trailing slash stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInfo {
    /// Which platform the URL shape belongs to.
    pub registry_type: RegistryType,
    /// The URL scheme, where it could be determined.
    pub scheme: Scheme,
    /// Normalised host + path.
    pub uri: Box<str>,
}

impl RegistryInfo {
    /// The public npm registry, used when a chunk gives no other evidence.
    #[must_use]
    pub fn public_npm() -> Self {
        Self {
            registry_type: RegistryType::Npm,
            scheme: Scheme::Https,
            uri: "registry.npmjs.org".into(),
        }
    }

    /// Returns `<scheme>://<uri>` for building request URLs.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}{}", self.scheme.as_prefix(), self.uri)
    }
}

struct KnownPlatform {
    group: &'static str,
    registry_type: RegistryType,
    force_https: bool,
    pattern: &'static str,
}

/// One URL shape per hosting platform. Order matters: earlier entries win
/// when two shapes could match at the same position (Artifactory cloud
/// before the self-hosted shape that would also cover `*.jfrog.io`).
const KNOWN_PLATFORMS: &[KnownPlatform] = &[
    KnownPlatform {
        group: "npm",
        registry_type: RegistryType::Npm,
        force_https: true,
        pattern: r"(?:registry\.npmjs\.org|registry\.npmjs\.com|registry\.yarnpkg\.com|registry\.npmmirror\.com|registry\.npm\.taobao\.org)",
    },
    KnownPlatform {
        group: "artifactory_cloud",
        registry_type: RegistryType::ArtifactoryCloud,
        force_https: true,
        pattern: r"[a-z0-9][a-z0-9-]*\.jfrog\.io/artifactory/api/npm/[a-z0-9][a-z0-9._-]*",
    },
    KnownPlatform {
        group: "artifactory_hosted",
        registry_type: RegistryType::ArtifactoryHosted,
        force_https: false,
        pattern: r"[a-z0-9][a-z0-9.-]*(?::\d{1,5})?/artifactory/api/npm/[a-z0-9][a-z0-9._-]*",
    },
    KnownPlatform {
        group: "nexus2",
        registry_type: RegistryType::Nexus2,
        force_https: false,
        pattern: r"[a-z0-9][a-z0-9.-]*(?::\d{1,5})?/nexus/content/(?:repositories|groups)/[a-z0-9][a-z0-9._-]*",
    },
    KnownPlatform {
        group: "nexus3",
        registry_type: RegistryType::Nexus3,
        force_https: false,
        pattern: r"[a-z0-9][a-z0-9.-]*(?::\d{1,5})?/repository/[a-z0-9][a-z0-9._-]*",
    },
    KnownPlatform {
        group: "gitlab",
        registry_type: RegistryType::Gitlab,
        force_https: false,
        pattern: r"gitlab\.[a-z0-9.-]+(?::\d{1,5})?/api/v4/(?:projects/\d+/|groups/\d+/-/)?packages/npm",
    },
    KnownPlatform {
        group: "github",
        registry_type: RegistryType::Github,
        force_https: true,
        pattern: r"npm\.pkg\.github\.com(?:/[a-z0-9._-]+)?",
    },
    KnownPlatform {
        group: "azure",
        registry_type: RegistryType::Azure,
        force_https: true,
        pattern: r"(?:pkgs\.dev\.azure\.com/[a-z0-9._-]+(?:/[a-z0-9._-]+)?|[a-z0-9-]+\.pkgs\.visualstudio\.com(?:/[a-z0-9._-]+)?)/_packaging/[a-z0-9._-]+/npm(?:/registry)?",
    },
    KnownPlatform {
        group: "jetbrains",
        registry_type: RegistryType::Jetbrains,
        force_https: true,
        pattern: r"npm\.pkg\.jetbrains\.space/[a-z0-9-]+/p/[a-z0-9-]+/[a-z0-9._-]+",
    },
    KnownPlatform {
        group: "google",
        registry_type: RegistryType::GoogleArtifact,
        force_https: true,
        pattern: r"[a-z0-9-]+-npm\.pkg\.dev/[a-z0-9-]+/[a-z0-9._-]+",
    },
    KnownPlatform {
        group: "gemfury",
        registry_type: RegistryType::Gemfury,
        force_https: true,
        pattern: r"npm(?:-proxy)?\.fury\.io/[a-z0-9._-]+",
    },
    KnownPlatform {
        group: "aws",
        registry_type: RegistryType::AwsCodeArtifact,
        force_https: true,
        pattern: r"[a-z0-9-]+-\d+\.d\.codeartifact\.[a-z0-9-]+\.amazonaws\.com/npm/[a-z0-9._-]*",
    },
];

static KNOWN_REGISTRY: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = KNOWN_PLATFORMS
        .iter()
        .map(|p| format!("(?P<{}>{})", p.group, p.pattern))
        .collect::<Vec<_>>()
        .join("|");
    #[expect(clippy::unwrap_used, reason = "static platform table is known-valid at compile time")]
    Regex::new(&format!(r"(?i)(?:https?:)?//(?:{alternation})")).unwrap()
});

/// Generic host shape: a dotted domain with a TLD, or a dotted-quad IPv4
/// address, with optional port and path segments.
const GENERIC_HOST: &str =
    r"(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}|\d{1,3}(?:\.\d{1,3}){3})(?::\d{1,5})?(?:/[a-z0-9._~%+-]+)*";

static GENERIC_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "static generic-tier pattern is known-valid at compile time")]
    Regex::new(&format!(
        r#"(?i)(?:@[a-z0-9._-]+\s*:\s*registry|registry|npmRegistryServer|npmAuth\.)\s*[=:]?\s*["']?((?:https?:)?//{GENERIC_HOST})"#
    ))
    .unwrap()
});

static GENERIC_AUTH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "static generic-tier pattern is known-valid at compile time")]
    Regex::new(&format!(r"(?i)//({GENERIC_HOST})/?:_(?:authToken|auth|password)\s*=")).unwrap()
});

/// Hosts that appear in documentation and CI boilerplate, never as real
/// registries.
const DENIED_HOSTS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "travis-ci.org",
    "your-registry.com",
    "yourcompany.com",
];

fn is_denied(uri: &str) -> bool {
    let host = uri
        .split(['/', ':'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    DENIED_HOSTS
        .iter()
        .any(|&denied| host == denied || host.ends_with(&format!(".{denied}")))
}

/// Strips any leading scheme and trailing slashes from a matched URL.
fn clean_uri(url: &str) -> &str {
    let without_scheme = ["https://", "http://", "//"]
        .iter()
        .find_map(|prefix| {
            (url.len() >= prefix.len() && url[..prefix.len()].eq_ignore_ascii_case(prefix))
                .then(|| &url[prefix.len()..])
        })
        .unwrap_or(url);
    without_scheme.trim_end_matches('/')
}

/// Determines a URL's scheme, falling back to chunk-wide evidence.
///
/// A URL that spells out its scheme answers directly. A scheme-less
/// `//host/path` form is searched for elsewhere in the chunk with an
/// explicit `http://` or `https://` prefix; the scheme is adopted only when
/// every such occurrence agrees, and stays unknown otherwise.
fn parse_registry_url_scheme(chunk: &str, url: &str) -> Scheme {
    let lowered = url.to_ascii_lowercase();
    if lowered.starts_with("http://") {
        return Scheme::Http;
    }
    if lowered.starts_with("https://") {
        return Scheme::Https;
    }

    let hostpath = clean_uri(url);
    let Ok(evidence) = Regex::new(&format!(r"(?i)(https?)://{}", regex::escape(hostpath))) else {
        return Scheme::Unknown;
    };

    let mut saw_http = false;
    let mut saw_https = false;
    for captures in evidence.captures_iter(chunk) {
        match captures[1].to_ascii_lowercase().as_str() {
            "http" => saw_http = true,
            _ => saw_https = true,
        }
    }
    match (saw_http, saw_https) {
        (true, false) => Scheme::Http,
        (false, true) => Scheme::Https,
        _ => Scheme::Unknown,
    }
}

/// Classifies a URL against the known-platform table.
fn match_known(chunk: &str, url: &str) -> Option<RegistryInfo> {
    let captures = KNOWN_REGISTRY.captures(url)?;
    let (platform, matched) = KNOWN_PLATFORMS
        .iter()
        .find_map(|p| captures.name(p.group).map(|m| (p, m)))?;

    let mut uri = clean_uri(matched.as_str()).to_string();
    if platform.registry_type == RegistryType::Azure && !uri.ends_with("/registry") {
        uri.push_str("/registry");
    }

    let scheme = if platform.force_https {
        Scheme::Https
    } else {
        parse_registry_url_scheme(chunk, url)
    };

    Some(RegistryInfo {
        registry_type: platform.registry_type,
        scheme,
        uri: uri.into_boxed_str(),
    })
}

/// Finds the registry a specific token is wired to.
///
/// Looks for the high-confidence `.npmrc` shape
/// `//<host>/<path>/:_authToken=<token>` (or `_auth=` / `_password=`)
/// anchored to the exact token value. A match against an unrecognised host
/// is still returned, tagged [`RegistryType::Other`] with the scheme
/// inferred from surrounding context.
#[must_use]
pub fn find_token_registry(chunk: &str, token: &str) -> Option<RegistryInfo> {
    let pattern = format!(
        r#"(?i)//({GENERIC_HOST})/?:_(?:authToken|auth|password)\s*=\s*["']?{}"#,
        regex::escape(token)
    );
    let anchored = Regex::new(&pattern).ok()?;
    let captures = anchored.captures(chunk)?;
    let hostpath = captures.get(1)?.as_str();

    if is_denied(hostpath) {
        return None;
    }

    let url = format!("//{hostpath}");
    Some(match_known(chunk, &url).unwrap_or_else(|| RegistryInfo {
        registry_type: RegistryType::Other,
        scheme: parse_registry_url_scheme(chunk, &url),
        uri: clean_uri(&url).into(),
    }))
}

/// Finds every registry URL mentioned in a chunk.
///
/// Known-platform matches take precedence: a substring the known tier
/// claims is excluded from generic-tier consideration. Results are
/// deduplicated by normalised URI, keeping the first (highest-confidence)
/// entry.
#[must_use]
pub fn find_all_urls(chunk: &str) -> Vec<RegistryInfo> {
    let mut seen: BTreeSet<Box<str>> = BTreeSet::new();
    let mut registries = Vec::new();

    let mut push = |info: RegistryInfo, registries: &mut Vec<RegistryInfo>| {
        if !is_denied(&info.uri) && seen.insert(info.uri.clone()) {
            registries.push(info);
        }
    };

    for matched in KNOWN_REGISTRY.find_iter(chunk) {
        if let Some(info) = match_known(chunk, matched.as_str()) {
            push(info, &mut registries);
        }
    }

    for captures in GENERIC_DECLARATION.captures_iter(chunk) {
        let Some(url) = captures.get(1) else {
            continue;
        };
        if KNOWN_REGISTRY.is_match(url.as_str()) {
            continue;
        }
        push(
            RegistryInfo {
                registry_type: RegistryType::Other,
                scheme: parse_registry_url_scheme(chunk, url.as_str()),
                uri: clean_uri(url.as_str()).into(),
            },
            &mut registries,
        );
    }

    for captures in GENERIC_AUTH_LINE.captures_iter(chunk) {
        let Some(hostpath) = captures.get(1) else {
            continue;
        };
        let url = format!("//{}", hostpath.as_str());
        if KNOWN_REGISTRY.is_match(&url) {
            continue;
        }
        push(
            RegistryInfo {
                registry_type: RegistryType::Other,
                scheme: parse_registry_url_scheme(chunk, &url),
                uri: clean_uri(&url).into(),
            },
            &mut registries,
        );
    }

    registries
}
