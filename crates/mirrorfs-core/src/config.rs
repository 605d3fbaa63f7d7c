// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mount-time configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Immutable mount configuration: the backing directory the virtual
/// namespace mirrors. Constructed once at startup, validated by
/// [`crate::MirrorFs::new`], and never mutated afterwards, so it may be
/// read concurrently without synchronization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MountConfig {
    /// Absolute path of the backing root.
    pub root: PathBuf,
}

impl MountConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_json() {
        let config: MountConfig = serde_json::from_str(r#"{"root": "/srv/data"}"#).expect("parse");
        assert_eq!(config.root, PathBuf::from("/srv/data"));
    }
}
