//! Identity modifiers: the reserved, derived metadata of every build item
//!
//! Modifier values are never stored. Each read recomputes the value from the
//! identity string, and the three timestamp modifiers re-query the file system,
//! so derived metadata can never go stale.

use std::{path::Path, str::FromStr, time::SystemTime};

use chrono::{DateTime, Local, Timelike};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{context::ItemContext, fs::FileTimes, paths};

/// One of the eleven reserved metadata names.
///
/// Declaration order is the enumeration order reported by items.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    Identity,
    FullPath,
    RootDir,
    Filename,
    Extension,
    RelativeDir,
    Directory,
    RecursiveDir,
    ModifiedTime,
    CreatedTime,
    AccessedTime,
}

impl Modifier {
    /// Case-insensitive lookup of a modifier by name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// Whether `name` collides with a modifier.
    pub fn is_modifier(name: &str) -> bool {
        Self::parse(name).is_some()
    }

    /// All modifiers, in catalog order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// The canonical spelling.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether the value depends on live file system state.
    pub const fn is_timestamp(self) -> bool {
        matches!(
            self,
            Self::ModifiedTime | Self::CreatedTime | Self::AccessedTime
        )
    }
}

/// Number of reserved modifiers.
pub const MODIFIER_COUNT: usize = Modifier::COUNT;

/// Format for timestamp modifiers: fixed width, lexically sortable.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `time` as `yyyy-MM-dd HH:mm:ss.fffffff` in local time.
pub fn format_timestamp(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    // Leap seconds report nanoseconds past 1e9; clamp to keep seven digits.
    let ticks = local.nanosecond().min(999_999_999) / 100;
    format!("{}.{ticks:07}", local.format(TIMESTAMP_FORMAT))
}

/// Compute `modifier` for `identity`.
///
/// `recursive_dir` is supplied by whoever expanded the item from a wildcard;
/// it cannot be derived from the identity.
pub fn resolve(
    modifier: Modifier,
    identity: &str,
    recursive_dir: &str,
    context: &ItemContext,
) -> String {
    tracing::trace!(%modifier, identity, "resolving modifier");

    match modifier {
        Modifier::Identity => identity.to_string(),
        Modifier::Filename => paths::file_stem(identity).to_string(),
        Modifier::Extension => paths::extension(identity).to_string(),
        Modifier::RelativeDir => paths::relative_dir(identity).to_string(),
        Modifier::RecursiveDir => recursive_dir.to_string(),
        Modifier::FullPath | Modifier::RootDir | Modifier::Directory => {
            let resolved =
                paths::ResolvedPath::resolve(identity, &context.working_directory().current());
            match modifier {
                Modifier::FullPath => resolved.full_path(),
                Modifier::RootDir => resolved.root_dir().to_string(),
                _ => resolved.directory(),
            }
        }
        Modifier::ModifiedTime | Modifier::CreatedTime | Modifier::AccessedTime => {
            file_times(identity, context).map_or_else(String::new, |times| {
                format_timestamp(match modifier {
                    Modifier::ModifiedTime => times.modified,
                    Modifier::CreatedTime => times.created,
                    _ => times.accessed,
                })
            })
        }
    }
}

/// Current timestamps at the item's full path; `None` when absent or unreadable.
fn file_times(identity: &str, context: &ItemContext) -> Option<FileTimes> {
    let full_path =
        paths::ResolvedPath::resolve(identity, &context.working_directory().current()).full_path();

    match context.file_system().file_times(Path::new(&full_path)) {
        Ok(times) => times,
        Err(e) => {
            tracing::warn!("Failed to read timestamps for {full_path}: {e}");
            None
        }
    }
}
