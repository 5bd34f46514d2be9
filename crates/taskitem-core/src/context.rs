//! The collaborators a build item consults when resolving derived metadata.

use std::{
    path::{PathBuf, MAIN_SEPARATOR},
    sync::Arc,
};

use crate::{
    config::Config,
    fs::{FileSystem, LocalFileSystem},
};

/// Where relative identities are resolved from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkingDirectory {
    /// The process working directory, read fresh on every resolution
    #[default]
    Process,
    /// A pinned directory
    Fixed(PathBuf),
}

impl WorkingDirectory {
    /// The directory to resolve against right now.
    pub fn current(&self) -> PathBuf {
        match self {
            Self::Fixed(dir) => dir.clone(),
            Self::Process => std::env::current_dir().unwrap_or_else(|e| {
                tracing::warn!("Failed to read working directory, resolving from root: {e}");
                PathBuf::from(MAIN_SEPARATOR.to_string())
            }),
        }
    }
}

/// Working directory plus file system access, shared by every item built
/// against the same engine state.
#[derive(Debug, Clone)]
pub struct ItemContext {
    working_directory: WorkingDirectory,
    file_system: Arc<dyn FileSystem>,
}

impl Default for ItemContext {
    fn default() -> Self {
        Self::new(WorkingDirectory::Process, Arc::new(LocalFileSystem))
    }
}

impl ItemContext {
    #[must_use]
    pub fn new(working_directory: WorkingDirectory, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            working_directory,
            file_system,
        }
    }

    /// Context honoring `config.working_dir`, on the local file system.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let working_directory = config
            .working_dir
            .clone()
            .map_or(WorkingDirectory::Process, WorkingDirectory::Fixed);
        Self::new(working_directory, Arc::new(LocalFileSystem))
    }

    /// Same file system, pinned working directory.
    #[must_use]
    pub fn with_working_directory(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: WorkingDirectory::Fixed(dir.into()),
            file_system: Arc::clone(&self.file_system),
        }
    }

    pub fn working_directory(&self) -> &WorkingDirectory {
        &self.working_directory
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.file_system.as_ref()
    }

    /// Shared handle to the default context.
    pub fn shared_default() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
