//! Bounded cartesian permutation of regex matches.
//!
//! Each named regex contributes a list of matches; a candidate secret is
//! one choice of match per name. The product space explodes for
//! pathological inputs (a loose regex matching hundreds of times), so
//! enumeration is generated directly up to a hard cap instead of being
//! materialised and truncated.

use std::collections::BTreeMap;

/// One regex match: index 0 is the full match, later entries are capture
/// groups (empty string for groups that did not participate).
pub type MatchGroups = Vec<Box<str>>;

/// One chosen combination of matches, keyed by regex name.
pub type MatchBundle = BTreeMap<Box<str>, MatchGroups>;

/// Hard cap on the number of bundles produced per chunk.
pub const MAX_COMBINATIONS: usize = 100;

/// Enumerates "pick one match per name" combinations, capped at
/// [`MAX_COMBINATIONS`].
///
/// Names are treated as dimensions in lexicographic order, with the first
/// name varying fastest, so truncation keeps a deterministic prefix of the
/// product space. A name with zero matches empties the whole product: no
/// bundles are produced at all.
#[must_use]
pub fn permute(matches_by_name: &BTreeMap<Box<str>, Vec<MatchGroups>>) -> Vec<MatchBundle> {
    if matches_by_name.is_empty() || matches_by_name.values().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut total = 1usize;
    for matches in matches_by_name.values() {
        total = total.saturating_mul(matches.len());
        if total >= MAX_COMBINATIONS {
            total = MAX_COMBINATIONS;
            break;
        }
    }

    let mut bundles = Vec::with_capacity(total);
    for index in 0..total {
        let mut remainder = index;
        let mut bundle = MatchBundle::new();
        for (name, matches) in matches_by_name {
            let chosen = &matches[remainder % matches.len()];
            remainder /= matches.len();
            bundle.insert(name.clone(), chosen.clone());
        }
        bundles.push(bundle);
    }
    bundles
}
