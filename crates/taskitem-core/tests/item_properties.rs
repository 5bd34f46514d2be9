//! Property tests for the item metadata contract.
//!
//! Run with: cargo test --package taskitem-core --test item_properties
//! Reproducible: Set `PROPTEST_SEED` environment variable for deterministic runs

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::redundant_closure_for_method_calls,
    clippy::doc_markdown
)]

use proptest::prelude::*;
use taskitem_core::{
    codec, escaping, BuildItem, ItemMetadata, Modifier, MODIFIER_COUNT, ORIGINAL_ITEM_SPEC,
};

/// Optimized proptest config for fast metadata property tests.
/// Uses 64 cases for simple invariants.
fn fast_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

/// Custom names that never collide with a modifier.
fn custom_name() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,12}".prop_filter("modifier name", |name| {
        !Modifier::is_modifier(name)
    })
}

fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((custom_name(), ".{0,16}"), 0..8)
}

fn modifier() -> impl Strategy<Value = Modifier> {
    prop::sample::select(Modifier::all().collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(fast_config())]

    #[test]
    fn prop_count_is_modifiers_plus_distinct_names(pairs in pairs()) {
        let item = BuildItem::with_metadata("p.txt", pairs.clone()).unwrap();
        let mut distinct: Vec<String> = pairs.iter().map(|(n, _)| n.to_uppercase()).collect();
        distinct.sort();
        distinct.dedup();

        prop_assert_eq!(item.metadata_count(), MODIFIER_COUNT + distinct.len());
        prop_assert_eq!(item.metadata_names().len(), item.metadata_count());
    }

    #[test]
    fn prop_reads_ignore_name_case(name in custom_name(), value in ".{0,16}") {
        let mut item = BuildItem::new("c.txt");
        item.set_metadata(&name, value.clone().into()).unwrap();

        prop_assert_eq!(item.get_metadata(&name.to_uppercase()), value.clone());
        prop_assert_eq!(item.get_metadata(&name.to_lowercase()), value);
    }

    #[test]
    fn prop_modifier_writes_always_rejected(modifier in modifier(), value in ".{0,8}") {
        let mut item = BuildItem::with_metadata("r.txt", [("keep", "me")]).unwrap();
        let before = item.custom_metadata();

        prop_assert!(item.set_metadata(modifier.name(), value.into()).is_err());
        prop_assert!(item.set_metadata(&modifier.name().to_lowercase(), "x".into()).is_err());
        prop_assert!(item.remove_metadata(modifier.name()).is_err());
        prop_assert_eq!(item.custom_metadata(), before);
    }

    #[test]
    fn prop_copy_preserves_destination_values(
        source in pairs(),
        destination in pairs(),
    ) {
        let from = BuildItem::with_metadata("from", source.clone()).unwrap();
        let mut to = BuildItem::with_metadata("to", destination).unwrap();
        let before = to.custom_metadata();

        from.copy_metadata_to(&mut to).unwrap();

        prop_assert_eq!(to.identity(), "to");
        for (name, value) in before {
            prop_assert_eq!(to.get_metadata(&name), value);
        }
        for (name, _) in source {
            prop_assert!(to.has_custom_metadata(&name));
        }
    }

    #[test]
    fn prop_transfer_adds_exactly_provenance(pairs in pairs(), stem in "[a-z]{1,8}") {
        let identity = format!("{stem}.txt");
        let item = BuildItem::with_metadata(identity.clone(), pairs).unwrap();
        let imported = codec::import(codec::export(&item)).unwrap();

        prop_assert_eq!(imported.identity(), identity.as_str());
        prop_assert_eq!(imported.metadata_count(), item.metadata_count() + 1);
        for name in item.metadata_names() {
            prop_assert_eq!(imported.get_metadata(&name), item.get_metadata(&name));
        }
        prop_assert_eq!(imported.get_metadata(ORIGINAL_ITEM_SPEC), identity);
    }

    #[test]
    fn prop_unescape_inverts_escape(value in ".{0,24}") {
        let escaped = escaping::escape(&value);
        prop_assert_eq!(escaping::unescape(&escaped), value.as_str());
    }
}
