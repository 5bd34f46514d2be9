//! Custom metadata storage
//!
//! A [`MetadataTable`] maps case-insensitive names to string values and keeps
//! the insertion order of names. It never stores a name that collides with a
//! [`Modifier`]; the guard runs on every mutation, so a table built any other way
//! than through [`MetadataTable::set`] cannot exist.

use std::fmt;

use indexmap::{map, IndexMap};
use serde::{Deserialize, Serialize};

use crate::{modifiers::Modifier, Error, Result};

/// A metadata value after null normalization.
///
/// Absent values (`None`) become the empty string on conversion, which is the
/// single place the "null means empty" rule is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub struct MetadataValue(String);

impl MetadataValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for MetadataValue {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Option<String>> for MetadataValue {
    fn from(value: Option<String>) -> Self {
        Self(value.unwrap_or_default())
    }
}

impl From<Option<&str>> for MetadataValue {
    fn from(value: Option<&str>) -> Self {
        Self(value.map(str::to_string).unwrap_or_default())
    }
}

impl From<MetadataValue> for String {
    fn from(value: MetadataValue) -> Self {
        value.0
    }
}

/// Case-folded lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FoldedName(String);

impl FoldedName {
    fn new(name: &str) -> Self {
        Self(fold_case(name))
    }
}

/// Uppercase one character at a time, leaving characters whose uppercase
/// form is longer than one character (`ß`) as they are.
///
/// Two names are the same metadata name exactly when their folds are equal.
pub fn fold_case(name: &str) -> String {
    name.chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => single,
                _ => c,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredEntry {
    /// Spelling from the first `set`
    name: String,
    value: String,
}

/// Reject names no table may store.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(
            "name",
            "metadata name cannot be empty",
        ));
    }
    if Modifier::is_modifier(name) {
        return Err(Error::reserved_metadata_name(name));
    }
    Ok(())
}

/// Insertion-ordered, case-insensitive custom metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    entries: IndexMap<FoldedName, StoredEntry>,
}

impl MetadataTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from name/value pairs, silently skipping modifier names.
    ///
    /// # Errors
    ///
    /// Returns error if a name is empty.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetadataValue>,
    {
        let mut table = Self::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            if Modifier::is_modifier(name) {
                continue;
            }
            table.set(name, value)?;
        }
        Ok(table)
    }

    /// The value stored under `name`, or empty when absent.
    pub fn get(&self, name: &str) -> &str {
        self.entries
            .get(&FoldedName::new(name))
            .map_or("", |entry| entry.value.as_str())
    }

    /// Whether a value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&FoldedName::new(name))
    }

    /// Store `value` under `name`. An existing entry keeps its position and
    /// original spelling.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `name` is empty or names a modifier;
    /// the table is left unchanged.
    pub fn set(&mut self, name: &str, value: impl Into<MetadataValue>) -> Result<()> {
        check_name(name)?;
        let value = value.into().into_string();
        match self.entries.entry(FoldedName::new(name)) {
            map::Entry::Occupied(mut slot) => slot.get_mut().value = value,
            map::Entry::Vacant(slot) => {
                slot.insert(StoredEntry {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Remove `name`. Removing an absent name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `name` names a modifier.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if Modifier::is_modifier(name) {
            return Err(Error::reserved_metadata_name(name));
        }
        self.entries.shift_remove(&FoldedName::new(name));
        Ok(())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored names in insertion order, as first spelled.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.values().map(|entry| entry.name.as_str())
    }

    /// Stored `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .values()
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_get_absent_is_empty() {
        let table = MetadataTable::new();
        assert_eq!(table.get("Missing"), "");
        assert!(!table.contains("Missing"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() -> Result<()> {
        let mut table = MetadataTable::new();
        table.set("Culture", "en-US")?;
        assert_eq!(table.get("CULTURE"), "en-US");
        assert_eq!(table.get("culture"), "en-US");

        table.set("CULTURE", "fr-FR")?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Culture"), "fr-FR");
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Culture"]);
        Ok(())
    }

    #[test]
    fn test_folding_is_per_character() -> Result<()> {
        assert_eq!(fold_case("émile"), "ÉMILE");
        assert_eq!(fold_case("straße"), "STRAßE");

        let mut table = MetadataTable::new();
        table.set("straße", "one")?;
        table.set("STRASSE", "two")?;
        table.set("ÉMILE", "three")?;
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("straße"), "one");
        assert_eq!(table.get("strasse"), "two");
        assert_eq!(table.get("émile"), "three");
        Ok(())
    }

    #[test]
    fn test_names_keep_insertion_order() -> Result<()> {
        let mut table = MetadataTable::new();
        for name in ["zeta", "Alpha", "mid"] {
            table.set(name, "v")?;
        }
        table.set("ALPHA", "changed")?;
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["zeta", "Alpha", "mid"]);

        table.remove("zeta")?;
        table.set("zeta", "back")?;
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Alpha", "mid", "zeta"]);
        Ok(())
    }

    #[test]
    fn test_reserved_names_rejected_without_mutation() -> Result<()> {
        let mut table = MetadataTable::new();
        table.set("keep", "me")?;
        let before = table.clone();

        for name in ["FullPath", "rootdir", "IDENTITY", "RecursiveDir"] {
            let err = table.set(name, "x").map_err(|e| e.kind());
            assert_eq!(err, Err(ErrorKind::InvalidArgument));
            let err = table.remove(name).map_err(|e| e.kind());
            assert_eq!(err, Err(ErrorKind::InvalidArgument));
        }
        assert_eq!(table, before);
        Ok(())
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut table = MetadataTable::new();
        assert_eq!(
            table.set("", "x").map_err(|e| e.kind()),
            Err(ErrorKind::InvalidArgument)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() -> Result<()> {
        let mut table = MetadataTable::new();
        table.remove("ghost")?;
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn test_null_value_stored_as_empty() -> Result<()> {
        let mut table = MetadataTable::new();
        table.set("m", None::<&str>)?;
        assert!(table.contains("m"));
        assert_eq!(table.get("m"), "");
        Ok(())
    }

    #[test]
    fn test_from_pairs_drops_modifiers() -> Result<()> {
        let table = MetadataTable::from_pairs([
            ("Filename", Some("foo")),
            ("Extension", Some("bar")),
            ("custom", Some("hello")),
            ("blank", None),
        ])?;
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["custom", "blank"]);
        assert_eq!(table.get("CUSTOM"), "hello");
        assert_eq!(table.get("blank"), "");
        Ok(())
    }

    #[test]
    fn test_value_deserializes_null_as_empty() -> std::result::Result<(), serde_json::Error> {
        let value: MetadataValue = serde_json::from_str("null")?;
        assert_eq!(value.as_str(), "");
        let value: MetadataValue = serde_json::from_str("\"x\"")?;
        assert_eq!(value.as_str(), "x");
        Ok(())
    }
}
