//! Property-based tests for `trawl_detectors`.
//!
//! These tests verify invariants that should hold for all inputs,
//! catching edge cases that hand-written tests might miss.

use std::collections::BTreeMap;

use proptest::prelude::*;
use trawl_detectors::custom::permute::{MAX_COMBINATIONS, MatchGroups, permute};
use trawl_detectors::custom::template::parse_regex_vars;
use trawl_detectors::custom::validate::parse_success_ranges;

fn dimensions(sizes: &[usize]) -> BTreeMap<Box<str>, Vec<MatchGroups>> {
    sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| {
            let matches = (0..size).map(|j| vec![format!("value{j}").into_boxed_str()]).collect();
            (format!("dim{index}").into_boxed_str(), matches)
        })
        .collect()
}

#[test]
fn permutation_of_2_3_4_5_6_is_capped_at_exactly_100() {
    let bundles = permute(&dimensions(&[2, 3, 4, 5, 6]));

    assert_eq!(bundles.len(), 100);
    for bundle in &bundles {
        assert_eq!(bundle.len(), 5);
    }
}

proptest! {
    /// The bundle count is always min(product, cap), and every bundle has
    /// one entry per dimension.
    #[test]
    fn permutation_count_is_min_of_product_and_cap(sizes in prop::collection::vec(0usize..8, 1..6)) {
        let bundles = permute(&dimensions(&sizes));
        let product: usize = sizes.iter().product();

        prop_assert_eq!(bundles.len(), product.min(MAX_COMBINATIONS));
        for bundle in &bundles {
            prop_assert_eq!(bundle.len(), sizes.len());
        }
    }

    /// A single empty dimension empties the whole product.
    #[test]
    fn permutation_with_an_empty_dimension_is_empty(sizes in prop::collection::vec(1usize..8, 1..5)) {
        let mut sizes = sizes;
        sizes.push(0);
        prop_assert!(permute(&dimensions(&sizes)).is_empty());
    }

    /// The placeholder parser never panics, whatever the template.
    #[test]
    fn template_parser_is_total(body in "\\PC*") {
        let _ = parse_regex_vars(&body);
    }

    /// A well-formed `{name.group}` placeholder round-trips.
    #[test]
    fn template_parser_round_trips_valid_placeholders(
        name in "[A-Za-z0-9_-]{1,12}",
        group in 0usize..1000,
    ) {
        let vars = parse_regex_vars(&format!("{{{name}.{group}}}"));
        prop_assert_eq!(vars.len(), 1);
        prop_assert_eq!(vars.get(name.as_str()), Some(&group));

        let bare = parse_regex_vars(&format!("{{{name}}}"));
        prop_assert_eq!(bare.get(name.as_str()), Some(&0));
    }

    /// Negative group indices disqualify the placeholder entirely.
    #[test]
    fn template_parser_drops_negative_groups(
        name in "[A-Za-z0-9_-]{1,12}",
        group in 1i64..1000,
    ) {
        let vars = parse_regex_vars(&format!("{{{name}.-{group}}}"));
        prop_assert!(vars.is_empty());
    }

    /// Single status codes validate iff they lie in 100-599.
    #[test]
    fn single_status_ranges_validate_only_within_bounds(code in 0u16..2000) {
        let result = parse_success_ranges(&[code.to_string()]);
        prop_assert_eq!(result.is_ok(), (100..=599).contains(&code));
    }

    /// Ordered bound pairs within 100-599 always validate; the parsed
    /// range contains exactly the statuses between the bounds.
    #[test]
    fn ordered_range_pairs_validate_within_bounds(a in 100u16..=599, b in 100u16..=599) {
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        let ranges = parse_success_ranges(&[format!("{lower}-{upper}")]).unwrap();

        prop_assert_eq!(ranges.len(), 1);
        prop_assert!(ranges[0].contains(&lower));
        prop_assert!(ranges[0].contains(&upper));
        prop_assert!(!ranges[0].contains(&(lower - 1)));
    }

    /// Reversed bounds never validate.
    #[test]
    fn reversed_range_pairs_are_rejected(a in 100u16..=598, delta in 1u16..100) {
        let upper = (a + delta).min(599);
        let spec = format!("{upper}-{a}");
        prop_assert!(parse_success_ranges(&[spec]).is_err());
    }
}
