//! # Taskitem Core
//!
//! Build items for a build engine: an identity string plus metadata. Eleven
//! well-known names (the modifiers) are derived from the identity and the file
//! system on every read; every other name is stored custom metadata.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Reads never fail:
//! absent metadata and unreadable timestamps resolve to the empty string.
//!
//! ## Isolation
//!
//! Items cross isolation contexts by value. See [`codec`] for the transfer
//! form and [`boundary`] for the thread and process contexts.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod codec;
pub mod config;
pub mod context;
mod error;
pub mod escaping;
pub mod fs;
pub mod item;
pub mod metadata;
pub mod modifiers;
pub mod paths;

pub use boundary::{
    with_boundary, BoundaryGuard, HostRequest, HostResponse, IsolationBoundary,
    ProcessBoundary, RemoteItemFactory, ThreadBoundary,
};
pub use codec::{ItemSnapshot, ORIGINAL_ITEM_SPEC};
pub use config::{load_config, Config};
pub use context::{ItemContext, WorkingDirectory};
pub use error::{Error, ErrorKind, Result};
pub use fs::{FileSystem, FileTimes, LocalFileSystem};
pub use item::{BuildItem, ItemMetadata};
pub use metadata::{MetadataTable, MetadataValue};
pub use modifiers::{Modifier, MODIFIER_COUNT};
