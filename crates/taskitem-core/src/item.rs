//! Build items
//!
//! A [`BuildItem`] pairs an identity string with custom metadata. Reads go through
//! one rule: a name that matches a [`Modifier`] is computed from the identity,
//! anything else comes from the custom table. Writes never reach a modifier.
//!
//! [`ItemMetadata`] is the surface the rest of the engine programs against, so
//! items rebuilt on the far side of an isolation boundary can stand in for local
//! ones.

use std::{fmt, sync::Arc};

use crate::{
    context::ItemContext,
    escaping,
    metadata::{MetadataTable, MetadataValue},
    modifiers::{self, Modifier, MODIFIER_COUNT},
    Error, Result,
};

/// Metadata read/write contract shared by every item representation.
pub trait ItemMetadata {
    /// The item's identity string.
    fn identity(&self) -> &str;

    /// Replace the identity; derived metadata follows on the next read.
    fn set_identity(&mut self, identity: String);

    /// Modifier value, custom value, or empty string. Never fails.
    fn get_metadata(&self, name: &str) -> String;

    /// Store a custom value.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an empty or reserved name.
    fn set_metadata(&mut self, name: &str, value: MetadataValue) -> Result<()>;

    /// Remove a custom value; absent names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for a reserved name.
    fn remove_metadata(&mut self, name: &str) -> Result<()>;

    /// Whether a custom value is stored under `name`.
    fn has_custom_metadata(&self, name: &str) -> bool;

    /// Custom entries in insertion order; modifiers excluded.
    fn custom_metadata(&self) -> Vec<(String, String)>;

    /// The collaborators this item resolves modifiers against, when it has any.
    ///
    /// Copies adopt it so they resolve `FullPath`, `Directory` and the
    /// timestamps exactly as their source does.
    fn item_context(&self) -> Option<Arc<ItemContext>> {
        None
    }

    /// Modifier names in catalog order, then custom names in insertion order.
    fn metadata_names(&self) -> Vec<String> {
        Modifier::all()
            .map(|m| m.name().to_string())
            .chain(self.custom_metadata().into_iter().map(|(name, _)| name))
            .collect()
    }

    /// Modifiers plus stored custom entries.
    fn metadata_count(&self) -> usize {
        MODIFIER_COUNT + self.custom_metadata().len()
    }

    /// Copy custom metadata into `destination` without overwriting anything it
    /// already has. The destination's identity is untouched and modifiers are
    /// never copied.
    ///
    /// # Errors
    ///
    /// Propagates a rejected write on the destination.
    fn copy_metadata_to(&self, destination: &mut dyn ItemMetadata) -> Result<()> {
        for (name, value) in self.custom_metadata() {
            if !destination.has_custom_metadata(&name) {
                destination.set_metadata(&name, value.into())?;
            }
        }
        Ok(())
    }
}

/// Identity string plus custom metadata, resolving modifiers on demand.
#[derive(Debug, Clone)]
pub struct BuildItem {
    identity: String,
    /// Set by wildcard expansion; cannot be derived from the identity.
    recursive_dir: String,
    metadata: MetadataTable,
    context: Arc<ItemContext>,
}

impl BuildItem {
    /// An item with no custom metadata.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            recursive_dir: String::new(),
            metadata: MetadataTable::new(),
            context: ItemContext::shared_default(),
        }
    }

    /// An item seeded from name/value pairs. Modifier-named pairs are dropped;
    /// absent values become empty strings.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if a pair has an empty name.
    pub fn with_metadata<I, K, V>(identity: impl Into<String>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetadataValue>,
    {
        Ok(Self {
            metadata: MetadataTable::from_pairs(pairs)?,
            ..Self::new(identity)
        })
    }

    /// An item seeded from an existing table.
    pub fn with_table(identity: impl Into<String>, metadata: MetadataTable) -> Self {
        Self {
            metadata,
            ..Self::new(identity)
        }
    }

    /// A copy of any item representation: same identity, same custom metadata,
    /// same recursive directory, same resolution context when the source has
    /// one. Modifiers are recomputed from those.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the source reports a custom name
    /// this table cannot store.
    pub fn from_item(source: &dyn ItemMetadata) -> Result<Self> {
        let mut item = Self::new(source.identity())
            .with_recursive_dir(source.get_metadata(Modifier::RecursiveDir.name()));
        if let Some(context) = source.item_context() {
            item.context = context;
        }
        source.copy_metadata_to(&mut item)?;
        Ok(item)
    }

    /// [`BuildItem::from_item`] for callers holding an optional source.
    ///
    /// # Errors
    ///
    /// Returns a null-argument error when `source` is `None`.
    pub fn try_from_item(source: Option<&dyn ItemMetadata>) -> Result<Self> {
        source
            .ok_or(Error::null_argument("source"))
            .and_then(Self::from_item)
    }

    /// Resolve modifiers against `context` instead of the process defaults.
    #[must_use]
    pub fn in_context(mut self, context: Arc<ItemContext>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_recursive_dir(mut self, recursive_dir: impl Into<String>) -> Self {
        self.recursive_dir = recursive_dir.into();
        self
    }

    /// Record the wildcard-expansion directory. This is the only way to give
    /// `RecursiveDir` a value; `set_metadata` rejects the name.
    pub fn set_recursive_dir(&mut self, recursive_dir: impl Into<String>) {
        self.recursive_dir = recursive_dir.into();
    }

    /// The identity of an optional item, as a string.
    ///
    /// # Errors
    ///
    /// Returns a null-argument error when `item` is `None`.
    pub fn identity_string(item: Option<&Self>) -> Result<String> {
        item.map(String::from)
            .ok_or(Error::null_argument("item"))
    }

    pub fn context(&self) -> &Arc<ItemContext> {
        &self.context
    }

    /// The stored custom metadata.
    pub fn metadata_table(&self) -> &MetadataTable {
        &self.metadata
    }

    /// [`ItemMetadata::get_metadata`] with engine-special characters escaped.
    pub fn get_metadata_escaped(&self, name: &str) -> String {
        escaping::escape(&self.get_metadata(name)).into_owned()
    }

    /// Store an escaped value, decoding it first.
    ///
    /// # Errors
    ///
    /// Same as [`ItemMetadata::set_metadata`].
    pub fn set_metadata_escaped(&mut self, name: &str, value: &str) -> Result<()> {
        self.metadata.set(name, escaping::unescape(value).into_owned())
    }
}

impl ItemMetadata for BuildItem {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn set_identity(&mut self, identity: String) {
        self.identity = identity;
    }

    fn get_metadata(&self, name: &str) -> String {
        Modifier::parse(name).map_or_else(
            || self.metadata.get(name).to_string(),
            |modifier| {
                modifiers::resolve(modifier, &self.identity, &self.recursive_dir, &self.context)
            },
        )
    }

    fn set_metadata(&mut self, name: &str, value: MetadataValue) -> Result<()> {
        self.metadata.set(name, value)
    }

    fn remove_metadata(&mut self, name: &str) -> Result<()> {
        self.metadata.remove(name)
    }

    fn has_custom_metadata(&self, name: &str) -> bool {
        self.metadata.contains(name)
    }

    fn custom_metadata(&self) -> Vec<(String, String)> {
        self.metadata
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn metadata_count(&self) -> usize {
        MODIFIER_COUNT + self.metadata.len()
    }

    fn item_context(&self) -> Option<Arc<ItemContext>> {
        Some(Arc::clone(&self.context))
    }
}

impl fmt::Display for BuildItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

impl From<&BuildItem> for String {
    fn from(item: &BuildItem) -> Self {
        item.identity.clone()
    }
}
