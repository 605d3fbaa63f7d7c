// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Loopback operation set: every virtual-namespace operation is satisfied by
//! the equivalent operation on the backing directory tree.

use std::ffi::{OsStr, OsString};
use std::fs::{self, DirBuilder, Metadata, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{lchown, symlink, DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use nix::dir::Dir;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::{self, Mode, SFlag};
use nix::sys::statvfs::{self, Statvfs};
use nix::sys::time::TimeVal;
use nix::unistd::{self, AccessFlags};
use tracing::{debug, trace};

use crate::config::MountConfig;
use crate::error::{FsError, FsResult};
use crate::handle::OpenHandle;
use crate::path::VirtualPath;
use crate::types::{DirEntry, EntryKind};

/// The loopback filesystem core.
///
/// Holds only the immutable mount configuration; every operation is
/// reentrant, keeps no state beyond its own call frame and the handle
/// carrier it is given, and blocks only on its own backing I/O. Ordering
/// and durability guarantees are exactly those of the backing filesystem.
#[derive(Debug)]
pub struct MirrorFs {
    config: MountConfig,
}

impl MirrorFs {
    /// Validate the backing root and build the core. The configuration is
    /// read-only for the life of the mount.
    pub fn new(config: MountConfig) -> FsResult<Self> {
        if !config.root.is_absolute() {
            return Err(FsError::InvalidPath(config.root.display().to_string()));
        }
        let meta = fs::metadata(&config.root)?;
        if !meta.is_dir() {
            return Err(FsError::Os(Errno::ENOTDIR));
        }
        debug!(target: "mirrorfs::vfs", root = %config.root.display(), "backing root validated");
        Ok(Self { config })
    }

    /// The backing root this core mirrors.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Map a virtual path to its absolute backing path. Total: the root
    /// marker maps to `root + "/"` with no further suffix, anything else to
    /// `root + "/" + path`. Recomputed on every operation, never cached.
    pub fn resolve(&self, path: &VirtualPath) -> PathBuf {
        let full = if path.is_root() {
            let mut root = self.config.root.clone().into_os_string();
            root.push("/");
            PathBuf::from(root)
        } else {
            self.config.root.join(path.as_rel_path())
        };
        trace!(target: "mirrorfs::vfs", %path, resolved = %full.display(), "resolved");
        full
    }

    /// Query metadata for a virtual path without following a terminal
    /// symlink.
    pub fn getattr(&self, path: &VirtualPath) -> FsResult<Metadata> {
        Ok(fs::symlink_metadata(self.resolve(path))?)
    }

    /// Read a symlink's target text, exactly as stored.
    pub fn readlink(&self, path: &VirtualPath) -> FsResult<OsString> {
        Ok(fs::read_link(self.resolve(path))?.into_os_string())
    }

    /// Create a filesystem node of the requested type, mode, and device at
    /// the resolved path. Parents are not created implicitly.
    pub fn mknod(&self, path: &VirtualPath, mode: u32, dev: u64) -> FsResult<()> {
        let kind = SFlag::from_bits_truncate(mode & SFlag::S_IFMT.bits());
        let perm = Mode::from_bits_truncate(mode & 0o7777);
        stat::mknod(&self.resolve(path), kind, perm, dev)?;
        Ok(())
    }

    /// Create a directory with the given mode. Parents are not created.
    pub fn mkdir(&self, path: &VirtualPath, mode: u32) -> FsResult<()> {
        DirBuilder::new().mode(mode).create(self.resolve(path))?;
        Ok(())
    }

    pub fn unlink(&self, path: &VirtualPath) -> FsResult<()> {
        Ok(fs::remove_file(self.resolve(path))?)
    }

    /// Remove the single named directory; fails on a non-empty one.
    pub fn rmdir(&self, path: &VirtualPath) -> FsResult<()> {
        Ok(fs::remove_dir(self.resolve(path))?)
    }

    /// Create a symlink at `link`. The target text is stored exactly as
    /// supplied by the caller; only the link's own location goes through
    /// resolution.
    pub fn symlink(&self, target: &OsStr, link: &VirtualPath) -> FsResult<()> {
        Ok(symlink(target, self.resolve(link))?)
    }

    /// Move `from` to `to` as a hard link to the new name followed by an
    /// unlink of the old one. The sequence is not atomic: an interruption
    /// between the steps leaves both names linked to the same content, and
    /// a failing step's error propagates without cleanup of the other.
    pub fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> FsResult<()> {
        debug!(target: "mirrorfs::vfs", %from, %to, "rename");
        self.link(from, to)?;
        self.unlink(from)
    }

    pub fn link(&self, from: &VirtualPath, to: &VirtualPath) -> FsResult<()> {
        Ok(fs::hard_link(self.resolve(from), self.resolve(to))?)
    }

    pub fn set_mode(&self, path: &VirtualPath, mode: u32) -> FsResult<()> {
        Ok(fs::set_permissions(self.resolve(path), fs::Permissions::from_mode(mode))?)
    }

    /// Change ownership without following a terminal symlink.
    pub fn set_owner(&self, path: &VirtualPath, uid: Option<u32>, gid: Option<u32>) -> FsResult<()> {
        Ok(lchown(self.resolve(path), uid, gid)?)
    }

    /// Set access and modification times on the resolved path.
    pub fn set_times(
        &self,
        path: &VirtualPath,
        atime: SystemTime,
        mtime: SystemTime,
    ) -> FsResult<()> {
        stat::utimes(&self.resolve(path), &timeval(atime), &timeval(mtime))?;
        Ok(())
    }

    pub fn truncate(&self, path: &VirtualPath, size: u64) -> FsResult<()> {
        unistd::truncate(&self.resolve(path), size as libc::off_t)?;
        Ok(())
    }

    /// Open the resolved path with the caller's flags and store the handle
    /// in the carrier. The handle is owned by the calling session until the
    /// matching release.
    pub fn open(&self, path: &VirtualPath, flags: i32) -> FsResult<OpenHandle> {
        debug!(target: "mirrorfs::vfs", %path, flags, "open");
        let mut options = OpenOptions::new();
        match flags & libc::O_ACCMODE {
            libc::O_WRONLY => {
                options.write(true);
            }
            libc::O_RDWR => {
                options.read(true).write(true);
            }
            _ => {
                options.read(true);
            }
        }
        options.custom_flags(flags & !libc::O_ACCMODE);
        let file = options.open(self.resolve(path))?;
        Ok(OpenHandle::File(file))
    }

    /// Read up to `buf.len()` bytes at `offset` through the stored handle.
    /// The result is exactly the backing read's byte count; a short count is
    /// a normal outcome, not an error.
    pub fn read(&self, handle: &OpenHandle, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        Ok(handle.as_file()?.read_at(buf, offset)?)
    }

    /// Write `data` at `offset` through the stored handle, returning the
    /// backing write's byte count.
    pub fn write(&self, handle: &OpenHandle, offset: u64, data: &[u8]) -> FsResult<usize> {
        Ok(handle.as_file()?.write_at(data, offset)?)
    }

    /// No-op: durability is delegated to fsync and release.
    pub fn flush(&self, handle: &OpenHandle) -> FsResult<()> {
        handle.as_file()?;
        Ok(())
    }

    /// Retire an open file handle. Consuming the carrier makes a second
    /// release of the same handle unrepresentable.
    pub fn release(&self, handle: OpenHandle) -> FsResult<()> {
        match handle {
            OpenHandle::File(file) => {
                drop(file);
                Ok(())
            }
            OpenHandle::Directory(_) => Err(FsError::BadFileDescriptor),
        }
    }

    /// Synchronize the stored handle, file or directory. A data-only sync
    /// skips metadata.
    pub fn fsync(&self, handle: &OpenHandle, data_only: bool) -> FsResult<()> {
        sync_fd(handle.raw_fd(), data_only)
    }

    /// Query capacity and usage of the filesystem backing the resolved
    /// path, returned verbatim.
    pub fn statfs(&self, path: &VirtualPath) -> FsResult<Statvfs> {
        Ok(statvfs::statvfs(&self.resolve(path))?)
    }

    /// Open a directory stream at the resolved path and store the cursor in
    /// the carrier.
    pub fn opendir(&self, path: &VirtualPath) -> FsResult<OpenHandle> {
        let dir = Dir::open(
            &self.resolve(path),
            OFlag::O_RDONLY | OFlag::O_DIRECTORY,
            Mode::empty(),
        )?;
        Ok(OpenHandle::Directory(dir))
    }

    /// Drain the stored directory cursor through `fill`. The stream is
    /// checked for end before any entry is touched, so an empty directory
    /// yields nothing; a failed fetch of the next entry surfaces that
    /// entry's error. `fill` returns `true` when it cannot accept another
    /// entry, which stops enumeration with a resource-exhaustion error.
    /// The stream is finite and not restartable; a fresh open-directory
    /// call is the only way to enumerate again.
    pub fn read_dir<F>(&self, handle: &mut OpenHandle, mut fill: F) -> FsResult<()>
    where
        F: FnMut(DirEntry) -> bool,
    {
        let dir = handle.as_dir_mut()?;
        for next in dir.iter() {
            let entry = next?;
            let name = entry.file_name().to_bytes();
            if name == b"." || name == b".." {
                continue;
            }
            let entry = DirEntry {
                name: OsStr::from_bytes(name).to_os_string(),
                ino: entry.ino(),
                kind: entry.file_type().map(EntryKind::from),
            };
            if fill(entry) {
                return Err(FsError::BufferFull);
            }
        }
        Ok(())
    }

    /// Retire an open directory handle.
    pub fn releasedir(&self, handle: OpenHandle) -> FsResult<()> {
        match handle {
            OpenHandle::Directory(dir) => {
                drop(dir);
                Ok(())
            }
            OpenHandle::File(_) => Err(FsError::BadFileDescriptor),
        }
    }

    /// Test the requested access bits against the resolved path.
    pub fn access(&self, path: &VirtualPath, mask: i32) -> FsResult<()> {
        unistd::access(&self.resolve(path), AccessFlags::from_bits_truncate(mask))?;
        Ok(())
    }

    /// Truncate through the stored handle. Works even when the file no
    /// longer has a resolvable name.
    pub fn truncate_handle(&self, handle: &OpenHandle, size: u64) -> FsResult<()> {
        Ok(handle.as_file()?.set_len(size)?)
    }

    /// Query metadata through the stored handle. Works even when the file
    /// no longer has a resolvable name.
    pub fn getattr_handle(&self, handle: &OpenHandle) -> FsResult<Metadata> {
        Ok(handle.as_file()?.metadata()?)
    }

    // Extended attributes are a deliberate capability gap: every call
    // reports the same failure regardless of arguments.

    pub fn xattr_get(&self, _path: &VirtualPath, _name: &OsStr) -> FsResult<Vec<u8>> {
        Err(FsError::Unsupported)
    }

    pub fn xattr_set(&self, _path: &VirtualPath, _name: &OsStr, _value: &[u8]) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    pub fn xattr_list(&self, _path: &VirtualPath) -> FsResult<Vec<OsString>> {
        Err(FsError::Unsupported)
    }

    pub fn xattr_remove(&self, _path: &VirtualPath, _name: &OsStr) -> FsResult<()> {
        Err(FsError::Unsupported)
    }
}

fn timeval(time: SystemTime) -> TimeVal {
    let elapsed = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    TimeVal::new(
        elapsed.as_secs() as libc::time_t,
        elapsed.subsec_micros() as libc::suseconds_t,
    )
}

fn sync_fd(fd: RawFd, data_only: bool) -> FsResult<()> {
    let rc = if data_only {
        unsafe { libc::fdatasync(fd) }
    } else {
        unsafe { libc::fsync(fd) }
    };
    Errno::result(rc)?;
    Ok(())
}
