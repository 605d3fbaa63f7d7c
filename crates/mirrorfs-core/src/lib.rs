// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! mirrorfs core — a loopback filesystem translation layer.
//!
//! Presents a virtual namespace whose every operation is satisfied by the
//! equivalent operation on a backing directory tree, confined to a fixed
//! root. The dispatch framework that receives kernel requests lives outside
//! this crate; see `mirrorfs-fuse-host` for the Linux FUSE host.

pub mod config;
pub mod error;
pub mod handle;
pub mod path;
pub mod types;
pub mod vfs;

pub use config::MountConfig;
pub use error::{FsError, FsResult};
pub use handle::OpenHandle;
pub use path::VirtualPath;
pub use types::{DirEntry, EntryKind};
pub use vfs::MirrorFs;
