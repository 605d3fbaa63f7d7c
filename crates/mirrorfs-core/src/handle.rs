// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Open-handle carrier

use std::fs::File;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::dir::Dir;

use crate::error::{FsError, FsResult};

/// Carrier for the OS-level handle behind one logical open. The dispatcher
/// owns it exclusively between the open call and the matching close call;
/// the variant records whether the open produced a file descriptor or a
/// directory stream cursor, so a handle cannot be driven through the wrong
/// operation family. Closing consumes the carrier, retiring the handle.
#[derive(Debug)]
pub enum OpenHandle {
    File(File),
    Directory(Dir),
}

impl OpenHandle {
    pub(crate) fn as_file(&self) -> FsResult<&File> {
        match self {
            OpenHandle::File(file) => Ok(file),
            OpenHandle::Directory(_) => Err(FsError::BadFileDescriptor),
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> FsResult<&mut Dir> {
        match self {
            OpenHandle::Directory(dir) => Ok(dir),
            OpenHandle::File(_) => Err(FsError::BadFileDescriptor),
        }
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        match self {
            OpenHandle::File(file) => file.as_raw_fd(),
            OpenHandle::Directory(dir) => dir.as_raw_fd(),
        }
    }
}
