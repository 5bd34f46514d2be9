//! File system queries used by the timestamp modifiers
//!
//! The build engine decides where timestamps come from; items only ask. The
//! query is repeated on every read so a deleted file is noticed immediately.

use std::{fmt, io, path::Path, time::SystemTime};

/// The three timestamps a build item can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub modified: SystemTime,
    pub created: SystemTime,
    pub accessed: SystemTime,
}

/// Existence and timestamp queries against some file system.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Timestamps for `path`, or `Ok(None)` when nothing exists there.
    fn file_times(&self, path: &Path) -> io::Result<Option<FileTimes>>;
}

/// The host file system, via `std::fs::metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn file_times(&self, path: &Path) -> io::Result<Option<FileTimes>> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let modified = metadata.modified()?;
        // Not every file system records a birth time.
        let created = metadata.created().unwrap_or(modified);
        let accessed = metadata.accessed().unwrap_or(modified);

        Ok(Some(FileTimes {
            modified,
            created,
            accessed,
        }))
    }
}
