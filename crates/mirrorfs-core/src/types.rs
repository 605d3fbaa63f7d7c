// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for mirrorfs

use std::ffi::OsString;

/// Directory entry kind, as reported by the backing directory stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    RegularFile,
    Symlink,
    Socket,
}

impl From<nix::dir::Type> for EntryKind {
    fn from(kind: nix::dir::Type) -> Self {
        match kind {
            nix::dir::Type::Fifo => EntryKind::Fifo,
            nix::dir::Type::CharacterDevice => EntryKind::CharDevice,
            nix::dir::Type::Directory => EntryKind::Directory,
            nix::dir::Type::BlockDevice => EntryKind::BlockDevice,
            nix::dir::Type::File => EntryKind::RegularFile,
            nix::dir::Type::Symlink => EntryKind::Symlink,
            nix::dir::Type::Socket => EntryKind::Socket,
        }
    }
}

/// Directory entry information. Ephemeral: produced during enumeration and
/// not retained after being handed to the sink.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: OsString,
    pub ino: u64,
    /// Entry type when the backing filesystem reports one.
    pub kind: Option<EntryKind>,
}
