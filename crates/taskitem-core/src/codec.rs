//! Boundary codec: items by value across isolation boundaries
//!
//! An [`ItemSnapshot`] carries everything observable about an item at export
//! time: its identity, every modifier value, the custom entries, and the
//! working directory the modifiers were resolved against. Nothing else
//! crosses, so the far side never needs a live reference to the source.

use std::{path::PathBuf, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    context::ItemContext,
    item::{BuildItem, ItemMetadata},
    metadata::{fold_case, MetadataValue},
    modifiers::Modifier,
    Result,
};

/// Custom metadata added on import, holding the identity at export time.
pub const ORIGINAL_ITEM_SPEC: &str = "OriginalItemSpec";

/// Transfer form of a build item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub identity: String,
    /// Every modifier value at export time, in catalog order
    #[serde(default)]
    pub derived: IndexMap<String, String>,
    /// Custom entries in insertion order; `null` values import as empty
    #[serde(default)]
    pub custom: IndexMap<String, MetadataValue>,
    /// Directory relative identities resolved against on the exporting side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ItemSnapshot {
    /// The exported value of `name`: modifier or custom, empty if absent.
    ///
    /// Lookup is case-insensitive like every other metadata read.
    pub fn get(&self, name: &str) -> &str {
        let table = if Modifier::is_modifier(name) {
            self.derived
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        } else {
            let folded = fold_case(name);
            self.custom
                .iter()
                .find(|(key, _)| fold_case(key) == folded)
                .map(|(_, value)| value.as_str())
        };
        table.unwrap_or("")
    }

    /// Modifier names then custom names, as exported.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.derived
            .keys()
            .chain(self.custom.keys())
            .map(String::as_str)
    }
}

/// Capture `item` for transfer.
pub fn export(item: &dyn ItemMetadata) -> ItemSnapshot {
    let derived = Modifier::all()
        .map(|m| (m.name().to_string(), item.get_metadata(m.name())))
        .collect();
    let custom = item
        .custom_metadata()
        .into_iter()
        .map(|(name, value)| (name, MetadataValue::from(value)))
        .collect();

    ItemSnapshot {
        identity: item.identity().to_string(),
        derived,
        custom,
        working_dir: item
            .item_context()
            .map(|context| context.working_directory().current()),
    }
}

/// Rebuild an item from its transfer form.
///
/// The result gains an `OriginalItemSpec` entry recording the exported identity,
/// unless the snapshot already carries a non-empty one from an earlier hop.
/// Relative identities resolve against the exporter's working directory, so
/// positional modifiers read the same on both sides.
///
/// # Errors
///
/// Returns an invalid-argument error if the snapshot names an empty custom key.
pub fn import(snapshot: ItemSnapshot) -> Result<BuildItem> {
    let recursive_dir = snapshot.get(Modifier::RecursiveDir.name()).to_string();
    let mut item = BuildItem::with_metadata(snapshot.identity.clone(), snapshot.custom)?
        .with_recursive_dir(recursive_dir);
    if let Some(dir) = snapshot.working_dir {
        item = item.in_context(Arc::new(ItemContext::default().with_working_directory(dir)));
    }

    if item.get_metadata(ORIGINAL_ITEM_SPEC).is_empty() {
        item.set_metadata(ORIGINAL_ITEM_SPEC, snapshot.identity.into())?;
    }

    for (name, exported) in &snapshot.derived {
        let Some(modifier) = Modifier::parse(name) else {
            continue;
        };
        if modifier.is_timestamp() {
            continue;
        }
        let local = item.get_metadata(name);
        if &local != exported {
            tracing::debug!(
                %modifier,
                exported = %exported,
                local = %local,
                "derived metadata differs after import"
            );
        }
    }

    Ok(item)
}

/// Serialize snapshots for the wire.
///
/// # Errors
///
/// Returns a codec error if serialization fails.
pub fn encode(snapshots: &[ItemSnapshot]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(snapshots)?)
}

/// Deserialize snapshots from the wire.
///
/// # Errors
///
/// Returns a codec error for malformed input.
pub fn decode(bytes: &[u8]) -> Result<Vec<ItemSnapshot>> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{modifiers::MODIFIER_COUNT, ErrorKind};

    #[test]
    fn test_export_captures_all_modifiers_in_order() -> Result<()> {
        let item = BuildItem::with_metadata("src/lib.rs", [("Kind", "Compile")])?;
        let snapshot = export(&item);

        assert_eq!(snapshot.identity, "src/lib.rs");
        assert_eq!(snapshot.derived.len(), MODIFIER_COUNT);
        assert_eq!(snapshot.derived.keys().next().map(String::as_str), Some("Identity"));
        assert_eq!(snapshot.get("Filename"), "lib");
        assert_eq!(snapshot.get("kind"), "Compile");
        Ok(())
    }

    #[test]
    fn test_import_adds_provenance_once() -> Result<()> {
        let item = BuildItem::with_metadata("a.txt", [("c", "C"), ("d", "D")])?;
        let imported = import(export(&item))?;

        assert_eq!(imported.identity(), "a.txt");
        assert_eq!(imported.get_metadata(ORIGINAL_ITEM_SPEC), "a.txt");
        assert_eq!(imported.metadata_count(), item.metadata_count() + 1);
        Ok(())
    }

    #[test]
    fn test_import_keeps_upstream_provenance() -> Result<()> {
        let item = BuildItem::with_metadata("b.txt", [(ORIGINAL_ITEM_SPEC, "first.txt")])?;
        let imported = import(export(&item))?;
        assert_eq!(imported.get_metadata(ORIGINAL_ITEM_SPEC), "first.txt");
        assert_eq!(imported.metadata_count(), item.metadata_count());
        Ok(())
    }

    #[test]
    fn test_import_resolves_against_exporter_directory() -> Result<()> {
        let exporter = Arc::new(ItemContext::default().with_working_directory("/pinned/elsewhere"));
        let item = BuildItem::new("sub/rel.txt").in_context(exporter);

        let snapshot = export(&item);
        assert_eq!(snapshot.working_dir, Some(PathBuf::from("/pinned/elsewhere")));

        let imported = import(snapshot.clone())?;
        for name in ["FullPath", "RootDir", "Directory", "RelativeDir"] {
            assert_eq!(imported.get_metadata(name), snapshot.get(name), "{name}");
            assert_eq!(imported.get_metadata(name), item.get_metadata(name), "{name}");
        }
        Ok(())
    }

    #[test]
    fn test_null_custom_values_import_as_empty() -> Result<()> {
        let wire = br#"[{"identity":"n.txt","custom":{"m":null,"k":"v"}}]"#;
        let mut snapshots = decode(wire)?;
        assert_eq!(snapshots.len(), 1);

        let item = import(snapshots.remove(0))?;
        assert!(item.has_custom_metadata("m"));
        assert_eq!(item.get_metadata("m"), "");
        assert_eq!(item.get_metadata("k"), "v");
        Ok(())
    }

    #[test]
    fn test_recursive_dir_survives_transfer() -> Result<()> {
        let item = BuildItem::new("deep/x.cs").with_recursive_dir("deep/");
        let imported = import(export(&item))?;
        assert_eq!(imported.get_metadata("RecursiveDir"), "deep/");
        Ok(())
    }

    #[test]
    fn test_modifier_named_custom_keys_are_ignored() -> Result<()> {
        let wire = br#"[{"identity":"q.txt","custom":{"Extension":".bogus"}}]"#;
        let mut snapshots = decode(wire)?;
        let item = import(snapshots.remove(0))?;
        assert_eq!(item.get_metadata("Extension"), ".txt");
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            decode(b"{not json").map_err(|e| e.kind()),
            Err(ErrorKind::Codec)
        );
    }

    #[test]
    fn test_encode_decode_preserves_order() -> Result<()> {
        let item = BuildItem::with_metadata("o.txt", [("z", "1"), ("a", "2"), ("m", "3")])?;
        let decoded = decode(&encode(&[export(&item)])?)?;
        let names: Vec<&str> = decoded[0].custom.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        Ok(())
    }
}
