// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Virtual path representation and sanitization

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use crate::error::{FsError, FsResult};

/// A slash-separated path relative to the mount root.
///
/// Construction is the only way to obtain one: inputs are normalized to a
/// relative path and traversal segments are rejected, so a `VirtualPath`
/// can never resolve outside the root it is joined under. The mount root
/// itself is the empty path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VirtualPath(PathBuf);

impl VirtualPath {
    /// The mount root marker.
    pub fn root() -> Self {
        VirtualPath(PathBuf::new())
    }

    /// Parse a client-supplied path. Absolute paths are taken relative to
    /// the mount root, `.` segments are dropped, and `..` segments are
    /// refused.
    pub fn parse(raw: impl AsRef<OsStr>) -> FsResult<Self> {
        let raw = raw.as_ref();
        let mut clean = PathBuf::new();
        for component in Path::new(raw).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(name) => clean.push(name),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(FsError::InvalidPath(raw.to_string_lossy().into_owned()));
                }
            }
        }
        Ok(VirtualPath(clean))
    }

    /// Append a single entry name. Separators and the `.`/`..` names are
    /// refused; use [`Self::parse`] for multi-segment input.
    pub fn join(&self, name: impl AsRef<OsStr>) -> FsResult<Self> {
        let name = name.as_ref();
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes == b"." || bytes == b".." || bytes.contains(&b'/') {
            return Err(FsError::InvalidPath(name.to_string_lossy().into_owned()));
        }
        let mut joined = self.0.clone();
        joined.push(name);
        Ok(VirtualPath(joined))
    }

    /// The containing directory, or `None` for the root marker.
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| VirtualPath(p.to_path_buf()))
    }

    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// The path relative to the mount root; empty for the root itself.
    pub fn as_rel_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_leading_slash_and_dot_segments() {
        assert_eq!(
            VirtualPath::parse("/a/./b").expect("parse"),
            VirtualPath::parse("a/b").expect("parse")
        );
    }

    #[test]
    fn parse_of_root_forms_is_the_root_marker() {
        assert!(VirtualPath::parse("/").expect("parse").is_root());
        assert!(VirtualPath::parse("").expect("parse").is_root());
        assert!(VirtualPath::parse(".").expect("parse").is_root());
    }

    #[test]
    fn parse_rejects_traversal_segments() {
        assert!(matches!(VirtualPath::parse("../x").unwrap_err(), FsError::InvalidPath(_)));
        assert!(matches!(VirtualPath::parse("a/../b").unwrap_err(), FsError::InvalidPath(_)));
    }

    #[test]
    fn join_accepts_single_names_only() {
        let base = VirtualPath::parse("dir").expect("parse");
        assert_eq!(
            base.join("leaf").expect("join"),
            VirtualPath::parse("dir/leaf").expect("parse")
        );
        assert!(base.join("a/b").is_err());
        assert!(base.join("..").is_err());
        assert!(base.join(".").is_err());
        assert!(base.join("").is_err());
    }

    #[test]
    fn parent_walks_toward_the_root() {
        let path = VirtualPath::parse("a/b").expect("parse");
        let parent = path.parent().expect("parent");
        assert_eq!(parent, VirtualPath::parse("a").expect("parse"));
        assert!(parent.parent().expect("parent of a").is_root());
        assert!(VirtualPath::root().parent().is_none());
    }

    #[test]
    fn display_is_rooted_at_slash() {
        assert_eq!(VirtualPath::parse("a/b").expect("parse").to_string(), "/a/b");
        assert_eq!(VirtualPath::root().to_string(), "/");
    }
}
