// ABOUTME: Property tests for dotted version comparison.
// ABOUTME: Antisymmetry, reflexivity under zero padding, and display round trips.

use bedrock_keeper::types::{ServerVersion, compare_versions, try_compare_versions};
use proptest::prelude::*;
use std::cmp::Ordering;

fn dotted() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..2000, 1..6)
}

fn join(segments: &[u32]) -> String {
    segments
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

proptest! {
    #[test]
    fn comparison_is_antisymmetric(a in dotted(), b in dotted()) {
        let (a, b) = (join(&a), join(&b));
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn trailing_zeros_do_not_matter(a in dotted(), zeros in 0usize..4) {
        let padded = format!("{}{}", join(&a), ".0".repeat(zeros));
        prop_assert_eq!(compare_versions(&join(&a), &padded), Ordering::Equal);
    }

    #[test]
    fn four_part_versions_order_like_tuples(
        a in prop::array::uniform4(0u32..500),
        b in prop::array::uniform4(0u32..500),
    ) {
        let left = ServerVersion::new(a[0], a[1], a[2], a[3]);
        let right = ServerVersion::new(b[0], b[1], b[2], b[3]);
        prop_assert_eq!(
            compare_versions(&left.to_string(), &right.to_string()),
            left.cmp(&right)
        );
        prop_assert_eq!(left.to_string().parse::<ServerVersion>().unwrap(), left);
    }
}

#[test]
fn release_ordering_examples() {
    assert_eq!(compare_versions("1.21.113.1", "1.21.100.6"), Ordering::Greater);
    assert_eq!(compare_versions("1.20.81.01", "1.21.0.3"), Ordering::Less);
    assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
}

#[test]
fn malformed_versions_compare_equal() {
    assert_eq!(compare_versions("1.x.3", "1.2.3"), Ordering::Equal);
    assert_eq!(compare_versions("", "1.0"), Ordering::Equal);
    assert!(try_compare_versions("1..2", "1.2").is_err());
}
