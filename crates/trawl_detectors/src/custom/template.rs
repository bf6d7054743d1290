//! `{name}` / `{name.group}` placeholder parsing and substitution.
//!
//! Verification endpoints and headers may embed references to the
//! definition's named regexes: `{token}` expands to the full match of the
//! `token` regex, `{token.1}` to its first capture group. Parsing is
//! deliberately forgiving: anything that fails the placeholder grammar is
//! left in the body untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::custom::permute::MatchBundle;

/// Placeholder grammar: `{`, optional whitespace, an identifier, then an
/// optional `.`-separated group index, optional whitespace, `}`. The group
/// digits are themselves optional (`{name.}` means group 0); a negative
/// index matches the grammar but disqualifies the placeholder entirely.
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "static regex is known-valid at compile time")]
    Regex::new(r"\{\s*([A-Za-z0-9_-]+)\s*(?:\.\s*(-?[0-9]+)?\s*)?\}").unwrap()
});

/// Extracts every placeholder in `body` as a name-to-group-index mapping.
///
/// The last occurrence wins when the same name appears with different
/// group indices. Nested braces resolve to the innermost complete
/// placeholder: `{foo {bar}}` yields only `bar`.
#[must_use]
pub fn parse_regex_vars(body: &str) -> BTreeMap<Box<str>, usize> {
    let mut vars = BTreeMap::new();
    for captures in VAR_PATTERN.captures_iter(body) {
        let Some(name) = captures.get(1) else {
            continue;
        };
        match parse_group_index(captures.get(2).map(|m| m.as_str())) {
            Some(group) => {
                vars.insert(name.as_str().into(), group);
            }
            None => continue,
        }
    }
    vars
}

/// Returns `None` for a negative index (placeholder dropped entirely);
/// absent or unparseable digits mean group 0.
fn parse_group_index(digits: Option<&str>) -> Option<usize> {
    let Some(digits) = digits else {
        return Some(0);
    };
    match digits.parse::<i64>() {
        Ok(value) if value < 0 => None,
        Ok(value) => usize::try_from(value).ok().or(Some(0)),
        Err(_) => Some(0),
    }
}

/// Substitutes placeholders in `template` with values from `bundle`.
///
/// `{name}` and `{name.0}` expand to the full match, `{name.N}` to capture
/// group N. Placeholders referencing an absent name or an out-of-range
/// group are left untouched, as is anything failing the grammar.
#[must_use]
pub fn expand(template: &str, bundle: &MatchBundle) -> String {
    VAR_PATTERN
        .replace_all(template, |captures: &regex::Captures<'_>| {
            let token = &captures[0];
            let Some(name) = captures.get(1) else {
                return token.to_string();
            };
            let Some(group) = parse_group_index(captures.get(2).map(|m| m.as_str())) else {
                return token.to_string();
            };
            match bundle.get(name.as_str()).and_then(|groups| groups.get(group)) {
                Some(value) => value.to_string(),
                None => token.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(entries: &[(&str, &[&str])]) -> MatchBundle {
        entries
            .iter()
            .map(|&(name, groups)| (Box::from(name), groups.iter().map(|&g| Box::from(g)).collect()))
            .collect()
    }

    #[test]
    fn bare_name_maps_to_group_zero() {
        let vars = parse_regex_vars("{hello}");
        assert_eq!(vars.get("hello"), Some(&0));
    }

    #[test]
    fn dotted_name_carries_group_index() {
        let vars = parse_regex_vars("{hello.123}");
        assert_eq!(vars.get("hello"), Some(&123));
    }

    #[test]
    fn dot_without_digits_means_group_zero() {
        let vars = parse_regex_vars("{hello.}");
        assert_eq!(vars.get("hello"), Some(&0));
    }

    #[test]
    fn negative_group_drops_the_placeholder_entirely() {
        let vars = parse_regex_vars("{foo.-1}");
        assert!(vars.is_empty());
    }

    #[test]
    fn nested_braces_yield_only_the_inner_placeholder() {
        let vars = parse_regex_vars("{foo {bar}}");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("bar"), Some(&0));
    }

    #[test]
    fn last_duplicate_occurrence_wins() {
        let vars = parse_regex_vars("{token.1} and later {token.2}");
        assert_eq!(vars.get("token"), Some(&2));
    }

    #[test]
    fn whitespace_inside_braces_is_tolerated() {
        let vars = parse_regex_vars("{ token . 3 }");
        assert_eq!(vars.get("token"), Some(&3));
    }

    #[test]
    fn multiple_distinct_names_all_parse() {
        let vars = parse_regex_vars("https://host/{id.1}/check?s={secret}");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("id"), Some(&1));
        assert_eq!(vars.get("secret"), Some(&0));
    }

    #[test]
    fn plain_text_yields_no_variables() {
        assert!(parse_regex_vars("no placeholders here").is_empty());
        assert!(parse_regex_vars("{}").is_empty());
        assert!(parse_regex_vars("{bad name}").is_empty());
    }

    #[test]
    fn expand_substitutes_full_match_and_groups() {
        let bundle = bundle(&[("token", &["tok_full", "tok_group1"])]);
        assert_eq!(expand("v={token}", &bundle), "v=tok_full");
        assert_eq!(expand("v={token.0}", &bundle), "v=tok_full");
        assert_eq!(expand("v={token.1}", &bundle), "v=tok_group1");
    }

    #[test]
    fn expand_leaves_unknown_names_untouched() {
        let bundle = bundle(&[("token", &["abc"])]);
        assert_eq!(expand("v={other}", &bundle), "v={other}");
    }

    #[test]
    fn expand_leaves_out_of_range_groups_untouched() {
        let bundle = bundle(&[("token", &["abc"])]);
        assert_eq!(expand("v={token.5}", &bundle), "v={token.5}");
    }

    #[test]
    fn expand_handles_multiple_placeholders_in_one_body() {
        let bundle = bundle(&[("id", &["full-id", "id-1"]), ("secret", &["full-secret", "secret-1"])]);
        assert_eq!(
            expand("https://host/{id.1}?s={secret.1}", &bundle),
            "https://host/id-1?s=secret-1"
        );
    }
}
