//! Path decomposition for identity strings
//!
//! Identities are plain strings, not `std::path::Path`s: they may be
//! drive-qualified (`c:\dir\a.txt`) or UNC (`\\server\share\a.txt`) regardless of
//! the host platform. Both `\` and `/` separate components. Drive and UNC roots
//! always render with `\`; every other path renders with the native separator.

use std::path::{Path, MAIN_SEPARATOR};

use itertools::Itertools;

const WINDOWS_SEPARATOR: char = '\\';

const fn is_separator(byte: u8) -> bool {
    byte == b'\\' || byte == b'/'
}

/// The root component of a path, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Root {
    /// `\\server\share\`
    Unc { server: String, share: String },
    /// `c:\`
    Drive(char),
    /// A single leading separator
    Separator,
}

impl Root {
    const fn separator(&self) -> char {
        match self {
            Self::Unc { .. } | Self::Drive(_) => WINDOWS_SEPARATOR,
            Self::Separator => MAIN_SEPARATOR,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Unc { server, share } if share.is_empty() => format!("\\\\{server}\\"),
            Self::Unc { server, share } => format!("\\\\{server}\\{share}\\"),
            Self::Drive(letter) => format!("{letter}:\\"),
            Self::Separator => MAIN_SEPARATOR.to_string(),
        }
    }
}

/// Split `path` into its root (if rooted) and the remainder after the root.
fn split_root(path: &str) -> (Option<Root>, &str) {
    let bytes = path.as_bytes();

    let unc = bytes.len() > 2
        && is_separator(bytes[0])
        && is_separator(bytes[1])
        && !is_separator(bytes[2])
        && (cfg!(windows) || (bytes[0] == b'\\' && bytes[1] == b'\\'));
    if unc {
        let after = &path[2..];
        let (server, after) = after
            .find(|c| c == '\\' || c == '/')
            .map_or((after, ""), |i| (&after[..i], &after[i + 1..]));
        let (share, rest) = after
            .find(|c| c == '\\' || c == '/')
            .map_or((after, ""), |i| (&after[..i], &after[i + 1..]));
        let root = Root::Unc {
            server: server.to_string(),
            share: share.to_string(),
        };
        return (Some(root), rest);
    }

    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let rest = path[2..].trim_start_matches(['\\', '/']);
        return (Some(Root::Drive(char::from(bytes[0]))), rest);
    }

    if bytes.first().copied().is_some_and(is_separator) {
        return (Some(Root::Separator), path.trim_start_matches(['\\', '/']));
    }

    (None, path)
}

/// Push the components of `rest` onto `segments`, folding `.` and `..`.
fn push_segments(segments: &mut Vec<String>, rest: &str) {
    for part in rest.split(['\\', '/']) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
}

/// An identity resolved against a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    root: String,
    segments: Vec<String>,
    ends_with_separator: bool,
    separator: char,
}

impl ResolvedPath {
    /// Resolve `identity` against `working_directory`.
    ///
    /// Rooted identities ignore the working directory entirely.
    pub fn resolve(identity: &str, working_directory: &Path) -> Self {
        let mut segments = Vec::new();

        let root = match split_root(identity) {
            (Some(root), rest) => {
                push_segments(&mut segments, rest);
                root
            }
            (None, rest) => {
                let base = working_directory.to_string_lossy();
                let (base_root, base_rest) = split_root(&base);
                push_segments(&mut segments, base_rest);
                push_segments(&mut segments, rest);
                base_root.unwrap_or(Root::Separator)
            }
        };

        Self {
            root: root.render(),
            segments,
            ends_with_separator: identity.as_bytes().last().copied().is_some_and(is_separator),
            separator: root.separator(),
        }
    }

    /// The absolute, separator-normalized path.
    pub fn full_path(&self) -> String {
        let mut full = self.root.clone();
        full.push_str(&self.segments.iter().join(&self.separator.to_string()));
        if self.ends_with_separator && !self.segments.is_empty() {
            full.push(self.separator);
        }
        full
    }

    /// The root component, always ending with a separator.
    pub fn root_dir(&self) -> &str {
        &self.root
    }

    /// The directories between the root and the file name, ending with a
    /// separator when non-empty.
    pub fn directory(&self) -> String {
        let directories = if self.ends_with_separator {
            &self.segments[..]
        } else {
            &self.segments[..self.segments.len().saturating_sub(1)]
        };
        directories
            .iter()
            .map(|d| format!("{d}{}", self.separator))
            .collect()
    }
}

/// Everything after the last separator (or drive qualifier).
pub fn file_name(identity: &str) -> &str {
    let (_, rest) = split_root(identity);
    rest.rfind(['\\', '/']).map_or(rest, |i| &rest[i + 1..])
}

/// The file name without its extension.
pub fn file_stem(identity: &str) -> &str {
    let name = file_name(identity);
    name.rfind('.').map_or(name, |i| &name[..i])
}

/// The extension including its leading dot, or empty.
pub fn extension(identity: &str) -> &str {
    let name = file_name(identity);
    match name.rfind('.') {
        Some(i) if i + 1 < name.len() => &name[i..],
        _ => "",
    }
}

/// The verbatim prefix of `identity` up to and including its last separator.
pub fn relative_dir(identity: &str) -> &str {
    identity.rfind(['\\', '/']).map_or("", |i| &identity[..=i])
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn unix_cwd() -> PathBuf {
        PathBuf::from("/home/builder/src")
    }

    #[test]
    fn test_drive_directory_excludes_root() {
        let resolved = ResolvedPath::resolve(r"c:\subdir\Monkey.txt", &unix_cwd());
        assert_eq!(resolved.directory(), r"subdir\");
        assert_eq!(resolved.root_dir(), r"c:\");
        assert_eq!(resolved.full_path(), r"c:\subdir\Monkey.txt");
    }

    #[test]
    fn test_unc_directory_excludes_share() {
        let resolved = ResolvedPath::resolve(r"\\local\share\subdir\Monkey.txt", &unix_cwd());
        assert_eq!(resolved.directory(), r"subdir\");
        assert_eq!(resolved.root_dir(), r"\\local\share\");
        assert_eq!(resolved.full_path(), r"\\local\share\subdir\Monkey.txt");
    }

    #[test]
    fn test_relative_identity_joins_working_directory() {
        let resolved = ResolvedPath::resolve("Monkey.txt", &unix_cwd());
        let expected = format!("{MAIN_SEPARATOR}home{MAIN_SEPARATOR}builder{MAIN_SEPARATOR}src{MAIN_SEPARATOR}Monkey.txt");
        assert_eq!(resolved.full_path(), expected);
        assert_eq!(resolved.root_dir(), MAIN_SEPARATOR.to_string());
    }

    #[test]
    fn test_dot_segments_are_folded() {
        let resolved = ResolvedPath::resolve("./a/../b/c.txt", Path::new("/w"));
        let s = MAIN_SEPARATOR;
        assert_eq!(resolved.full_path(), format!("{s}w{s}b{s}c.txt"));
        assert_eq!(resolved.directory(), format!("w{s}b{s}"));
    }

    #[test]
    fn test_parent_never_escapes_root() {
        let resolved = ResolvedPath::resolve(r"c:\..\..\x.txt", &unix_cwd());
        assert_eq!(resolved.full_path(), r"c:\x.txt");
        assert_eq!(resolved.directory(), "");
    }

    #[test]
    fn test_trailing_separator_is_kept() {
        let resolved = ResolvedPath::resolve(r"c:\out\bin\", &unix_cwd());
        assert_eq!(resolved.full_path(), r"c:\out\bin\");
        assert_eq!(resolved.directory(), r"out\bin\");
    }

    #[test]
    fn test_mixed_separators_normalize() {
        let resolved = ResolvedPath::resolve("c:/one\\two/three.cs", &unix_cwd());
        assert_eq!(resolved.full_path(), r"c:\one\two\three.cs");
    }

    #[test]
    fn test_file_name_parts() {
        assert_eq!(file_stem("Monkey.txt"), "Monkey");
        assert_eq!(extension("Monkey.txt"), ".txt");
        assert_eq!(file_stem("dir/archive.tar.gz"), "archive.tar");
        assert_eq!(extension("dir/archive.tar.gz"), ".gz");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(extension("noext"), "");
        assert_eq!(file_stem(".gitignore"), "");
        assert_eq!(extension(".gitignore"), ".gitignore");
        assert_eq!(extension("trailing."), "");
        assert_eq!(file_stem("trailing."), "trailing");
        assert_eq!(file_name("c:Monkey.txt"), "Monkey.txt");
    }

    #[test]
    fn test_relative_dir_is_verbatim() {
        assert_eq!(relative_dir("Monkey.txt"), "");
        assert_eq!(relative_dir("src/lib/Monkey.txt"), "src/lib/");
        assert_eq!(relative_dir(r"..\shared\Monkey.txt"), r"..\shared\");
        assert_eq!(relative_dir(r"c:\subdir\Monkey.txt"), r"c:\subdir\");
    }
}
