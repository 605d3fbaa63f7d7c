// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the mirrorfs core

use std::io;

use nix::errno::Errno;

/// Core filesystem error type.
///
/// Backing-operation failures carry the platform error code verbatim; the
/// remaining variants are the fixed conditions this layer can raise on its
/// own. `errno` and `negated` produce the dispatch framework's signed-result
/// convention: zero or positive for success, a negated error code otherwise.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("{0}")]
    Os(#[from] Errno),
    #[error("invalid virtual path: {0}")]
    InvalidPath(String),
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("directory sink is full")]
    BufferFull,
    #[error("unsupported")]
    Unsupported,
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    /// Platform error code for this failure.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::Os(errno) => *errno as i32,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::BadFileDescriptor => libc::EBADF,
            FsError::BufferFull => libc::ENOMEM,
            FsError::Unsupported => libc::EPERM,
        }
    }

    /// The negated form of [`Self::errno`], as returned to the dispatcher.
    pub fn negated(&self) -> i32 {
        -self.errno()
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => FsError::Os(Errno::from_raw(code)),
            None => FsError::Os(Errno::EIO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_errnos_pass_through_verbatim() {
        let err = FsError::from(io::Error::from_raw_os_error(libc::ENOTEMPTY));
        assert_eq!(err.errno(), libc::ENOTEMPTY);
        assert_eq!(err.negated(), -libc::ENOTEMPTY);
    }

    #[test]
    fn io_errors_without_a_code_become_eio() {
        let err = FsError::from(io::Error::new(io::ErrorKind::Other, "synthetic"));
        assert_eq!(err.errno(), libc::EIO);
    }

    #[test]
    fn fixed_codes_for_non_backing_failures() {
        assert_eq!(FsError::InvalidPath("..".into()).errno(), libc::EINVAL);
        assert_eq!(FsError::BadFileDescriptor.errno(), libc::EBADF);
        assert_eq!(FsError::BufferFull.errno(), libc::ENOMEM);
        assert_eq!(FsError::Unsupported.errno(), libc::EPERM);
    }
}
