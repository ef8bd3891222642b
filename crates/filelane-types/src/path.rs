//! Logical file paths and the keys derived from them.
//!
//! A [`FilePath`] is the caller-facing spelling of a remote path, normalized
//! structurally (rooted, no `.`/`..`, no doubled or trailing separators) but
//! with its case preserved for display and for the remote store.
//!
//! A [`FileKey`] is the identity used to address lanes and handles. It is
//! derived from a `FilePath` under a [`CaseFolding`] policy so that every
//! spelling of the same remote file lands on the same key. Nothing else is
//! trusted as identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Path separator used by remote paths.
pub const SEPARATOR: char = '/';

/// Error from parsing a logical path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path escapes root: {0}")]
    EscapesRoot(String),
    #[error("invalid character {ch:?} in path {path:?}")]
    InvalidCharacter { ch: char, path: String },
    #[error("key is not a normalized path: {0:?}")]
    NotNormalized(String),
}

/// How a [`FilePath`] is folded into a [`FileKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Keys are lowercased. Matches a case-insensitive remote store.
    #[default]
    Lowercase,
    /// Keys keep the path's case. For case-sensitive stores.
    Preserve,
}

/// A normalized, rooted logical path (e.g. `/Notes/todo.txt`).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePath(String);

impl FilePath {
    /// Parse and normalize a path.
    ///
    /// Relative input is treated as rooted. `.` components are dropped and
    /// `..` pops the previous component; popping past the root is an error.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(ch) = raw.chars().find(|c| *c == '\0') {
            return Err(PathError::InvalidCharacter {
                ch,
                path: raw.to_string(),
            });
        }

        let mut parts: Vec<&str> = Vec::new();
        for component in raw.split(SEPARATOR) {
            match component {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(PathError::EscapesRoot(raw.to_string()));
                    }
                }
                name => parts.push(name),
            }
        }

        let mut normalized = String::with_capacity(raw.len() + 1);
        if parts.is_empty() {
            normalized.push(SEPARATOR);
        }
        for part in parts {
            normalized.push(SEPARATOR);
            normalized.push_str(part);
        }
        Ok(Self(normalized))
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<FilePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Final component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit(SEPARATOR).next()
    }

    /// Append a relative child path and re-normalize.
    pub fn join(&self, child: &str) -> Result<FilePath, PathError> {
        Self::parse(&format!("{}{}{}", self.0, SEPARATOR, child))
    }

    /// Iterate over the path's ancestors, nearest first, excluding the root.
    pub fn ancestors(&self) -> impl Iterator<Item = FilePath> + '_ {
        std::iter::successors(self.parent(), |p| p.parent()).filter(|p| !p.is_root())
    }

    /// Derive the identity key for this path.
    pub fn key(&self, folding: CaseFolding) -> FileKey {
        match folding {
            CaseFolding::Lowercase => FileKey(self.0.to_lowercase()),
            CaseFolding::Preserve => FileKey(self.0.clone()),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilePath({})", self.0)
    }
}

impl FromStr for FilePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FilePath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FilePath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> String {
        path.0
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything an operation can be addressed by.
///
/// Strings are parsed on the way in, so an invalid path surfaces as a
/// [`PathError`] from the operation instead of at the call site.
pub trait IntoFilePath {
    fn into_file_path(self) -> Result<FilePath, PathError>;
}

impl IntoFilePath for FilePath {
    fn into_file_path(self) -> Result<FilePath, PathError> {
        Ok(self)
    }
}

impl IntoFilePath for &FilePath {
    fn into_file_path(self) -> Result<FilePath, PathError> {
        Ok(self.clone())
    }
}

impl IntoFilePath for &str {
    fn into_file_path(self) -> Result<FilePath, PathError> {
        FilePath::parse(self)
    }
}

impl IntoFilePath for String {
    fn into_file_path(self) -> Result<FilePath, PathError> {
        FilePath::parse(&self)
    }
}

impl IntoFilePath for &String {
    fn into_file_path(self) -> Result<FilePath, PathError> {
        FilePath::parse(self)
    }
}

/// Identity of a remote file: a folded [`FilePath`].
///
/// Built by [`FilePath::key`]. Deserializing only accepts strings that are
/// already normalized paths, so a key never skips normalization.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileKey(String);

impl TryFrom<String> for FileKey {
    type Error = PathError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if FilePath::parse(&raw)?.as_str() != raw {
            return Err(PathError::NotNormalized(raw));
        }
        Ok(Self(raw))
    }
}

impl From<FileKey> for String {
    fn from(key: FileKey) -> Self {
        key.0
    }
}

impl FileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileKey({})", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FilePath {
        FilePath::parse(s).unwrap()
    }

    // ── Normalization ───────────────────────────────────────────────────

    #[test]
    fn test_rooted_and_trimmed() {
        assert_eq!(p("notes/todo.txt").as_str(), "/notes/todo.txt");
        assert_eq!(p("/notes/todo.txt/").as_str(), "/notes/todo.txt");
        assert_eq!(p("//notes///todo.txt").as_str(), "/notes/todo.txt");
    }

    #[test]
    fn test_dot_components() {
        assert_eq!(p("/a/./b/../c").as_str(), "/a/c");
        assert_eq!(p("/a/..").as_str(), "/");
        assert_eq!(p("/").as_str(), "/");
        assert_eq!(p(".").as_str(), "/");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(FilePath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            FilePath::parse("/a/../.."),
            Err(PathError::EscapesRoot(_))
        ));
        assert!(matches!(
            FilePath::parse("/a\0b"),
            Err(PathError::InvalidCharacter { ch: '\0', .. })
        ));
    }

    #[test]
    fn test_case_preserved_in_path() {
        assert_eq!(p("/Notes/TODO.txt").to_string(), "/Notes/TODO.txt");
    }

    // ── Navigation ──────────────────────────────────────────────────────

    #[test]
    fn test_parent_and_name() {
        let path = p("/a/b/c.txt");
        assert_eq!(path.parent(), Some(p("/a/b")));
        assert_eq!(path.name(), Some("c.txt"));
        assert_eq!(p("/a").parent(), Some(FilePath::root()));
        assert_eq!(FilePath::root().parent(), None);
        assert_eq!(FilePath::root().name(), None);
    }

    #[test]
    fn test_join() {
        let dir = p("/docs");
        assert_eq!(dir.join("a.txt").unwrap(), p("/docs/a.txt"));
        assert_eq!(dir.join("../b.txt").unwrap(), p("/b.txt"));
        assert!(dir.join("../../x").is_err());
    }

    #[test]
    fn test_ancestors() {
        let ancestors: Vec<String> = p("/a/b/c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["/a/b", "/a"]);
        assert_eq!(p("/a").ancestors().count(), 0);
    }

    // ── Keys ────────────────────────────────────────────────────────────

    #[test]
    fn test_same_file_same_key() {
        let a = p("/Notes/Todo.txt").key(CaseFolding::Lowercase);
        let b = p("notes//./todo.TXT/").key(CaseFolding::Lowercase);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "/notes/todo.txt");
    }

    #[test]
    fn test_distinct_files_distinct_keys() {
        let a = p("/notes/a.txt").key(CaseFolding::Lowercase);
        let b = p("/notes/b.txt").key(CaseFolding::Lowercase);
        assert_ne!(a, b);
    }

    #[test]
    fn test_preserve_folding() {
        let a = p("/A.txt").key(CaseFolding::Preserve);
        let b = p("/a.txt").key(CaseFolding::Preserve);
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_revalidates() {
        let path: FilePath = serde_json::from_str("\"docs//x/../y.txt\"").unwrap();
        assert_eq!(path.as_str(), "/docs/y.txt");
        assert!(serde_json::from_str::<FilePath>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/docs/y.txt\"");
    }

    #[test]
    fn test_key_serde_requires_normalized() {
        let key = p("/Notes/A.txt").key(CaseFolding::Lowercase);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"/notes/a.txt\"");
        assert_eq!(serde_json::from_str::<FileKey>(&json).unwrap(), key);

        assert!(serde_json::from_str::<FileKey>("\"notes//a.txt\"").is_err());
        assert!(serde_json::from_str::<FileKey>("\"/a/../b\"").is_err());
        assert!(serde_json::from_str::<FileKey>("\"\"").is_err());
        assert!(matches!(
            FileKey::try_from("/a/".to_string()),
            Err(PathError::NotNormalized(_))
        ));
    }

    #[test]
    fn test_into_file_path() {
        assert_eq!("/a//b".into_file_path().unwrap(), p("/a/b"));
        assert_eq!(String::from("x").into_file_path().unwrap(), p("/x"));
        assert_eq!((&p("/y")).into_file_path().unwrap(), p("/y"));
        assert_eq!("".into_file_path(), Err(PathError::Empty));
    }
}
