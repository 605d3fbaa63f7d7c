// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! mirrorfs FUSE adapter implementation
//!
//! Maps FUSE operations to mirrorfs core calls.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::{c_int, EBADF, EINVAL, ENAMETOOLONG, ENOENT};
use mirrorfs_core::{
    error::FsResult, EntryKind, MirrorFs, MountConfig, OpenHandle, VirtualPath,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// TTL for attribute and entry replies; the kernel re-validates afterwards.
const TTL: Duration = Duration::from_secs(1);

/// Generation number for entry replies; inodes are never reused while known.
const GENERATION: u64 = 0;

/// Maximum single path component length to guard against overly long names
const NAME_MAX: usize = 255;

/// mirrorfs FUSE filesystem adapter
pub struct MirrorFsFuse {
    /// Core filesystem instance
    core: Arc<MirrorFs>,
    /// Cache of inode to virtual path mappings
    inodes: HashMap<u64, VirtualPath>,
    /// Reverse mapping from virtual path to inode
    paths: HashMap<VirtualPath, u64>,
    /// Next available inode number
    next_inode: u64,
    /// Open handles owned by the kernel session, by file-handle id
    handles: HashMap<u64, OpenHandle>,
    /// Next file-handle id
    next_fh: u64,
}

impl MirrorFsFuse {
    /// Create a new FUSE adapter over the given mount configuration
    pub fn new(config: MountConfig) -> FsResult<Self> {
        let core = Arc::new(MirrorFs::new(config)?);
        let mut inodes = HashMap::new();
        let mut paths = HashMap::new();

        inodes.insert(FUSE_ROOT_ID, VirtualPath::root());
        paths.insert(VirtualPath::root(), FUSE_ROOT_ID);

        Ok(Self {
            core,
            inodes,
            paths,
            next_inode: FUSE_ROOT_ID + 1,
            handles: HashMap::new(),
            next_fh: 1,
        })
    }

    /// Get the virtual path for a given inode
    fn inode_to_path(&self, ino: u64) -> Option<VirtualPath> {
        self.inodes.get(&ino).cloned()
    }

    /// Get or allocate an inode for a path
    fn get_or_alloc_inode(&mut self, path: &VirtualPath) -> u64 {
        if let Some(&ino) = self.paths.get(path) {
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.record_path_for_inode(path.clone(), ino);
        ino
    }

    /// Associate a path with an inode
    fn record_path_for_inode(&mut self, path: VirtualPath, ino: u64) {
        self.paths.insert(path.clone(), ino);
        self.inodes.insert(ino, path);
    }

    /// Remove a single path mapping, returning the inode it held
    fn remove_path_mapping(&mut self, path: &VirtualPath) -> Option<u64> {
        if let Some(ino) = self.paths.remove(path) {
            self.inodes.remove(&ino);
            Some(ino)
        } else {
            None
        }
    }

    fn forget_inode(&mut self, ino: u64) {
        if ino == FUSE_ROOT_ID {
            return;
        }
        if let Some(path) = self.inodes.remove(&ino) {
            self.paths.remove(&path);
        }
    }

    /// Resolve `parent`/`name` to a virtual path, or the errno to reply with
    fn child_path(&self, parent: u64, name: &OsStr) -> Result<VirtualPath, c_int> {
        if name.as_bytes().len() > NAME_MAX {
            return Err(ENAMETOOLONG);
        }
        let parent_path = self.inodes.get(&parent).ok_or(ENOENT)?;
        parent_path.join(name).map_err(|err| err.errno())
    }

    /// Store an open handle for the session and hand out its id
    fn alloc_handle(&mut self, handle: OpenHandle) -> u64 {
        let fh = self.next_fh;
        self.next_fh = self.next_fh.saturating_add(1);
        self.handles.insert(fh, handle);
        fh
    }
}

/// Convert backing metadata to a FUSE attribute structure
fn attr_to_fuse(meta: &Metadata, ino: u64) -> FileAttr {
    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        FileType::Directory
    } else if file_type.is_symlink() {
        FileType::Symlink
    } else if file_type.is_fifo() {
        FileType::NamedPipe
    } else if file_type.is_char_device() {
        FileType::CharDevice
    } else if file_type.is_block_device() {
        FileType::BlockDevice
    } else if file_type.is_socket() {
        FileType::Socket
    } else {
        FileType::RegularFile
    };

    FileAttr {
        ino,
        size: meta.len(),
        blocks: meta.blocks(),
        atime: timestamp(meta.atime(), meta.atime_nsec()),
        mtime: timestamp(meta.mtime(), meta.mtime_nsec()),
        ctime: timestamp(meta.ctime(), meta.ctime_nsec()),
        crtime: timestamp(meta.ctime(), meta.ctime_nsec()),
        kind,
        perm: (meta.mode() & 0o7777) as u16,
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev() as u32,
        blksize: meta.blksize() as u32,
        flags: 0,
    }
}

fn timestamp(secs: i64, nanos: i64) -> SystemTime {
    UNIX_EPOCH + Duration::new(secs.max(0) as u64, nanos.max(0) as u32)
}

fn entry_kind_to_fuse(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Fifo => FileType::NamedPipe,
        EntryKind::CharDevice => FileType::CharDevice,
        EntryKind::Directory => FileType::Directory,
        EntryKind::BlockDevice => FileType::BlockDevice,
        EntryKind::RegularFile => FileType::RegularFile,
        EntryKind::Symlink => FileType::Symlink,
        EntryKind::Socket => FileType::Socket,
    }
}

impl fuser::Filesystem for MirrorFsFuse {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), c_int> {
        info!("mirrorfs FUSE adapter initialized over {}", self.core.root().display());
        Ok(())
    }

    fn destroy(&mut self) {
        info!("mirrorfs FUSE adapter destroyed");
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, _nlookup: u64) {
        self.forget_inode(ino);
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.getattr(&child) {
            Ok(meta) => {
                let ino = self.get_or_alloc_inode(&child);
                reply.entry(&TTL, &attr_to_fuse(&meta, ino), GENERATION);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        if let Some(handle) = fh.and_then(|fh| self.handles.get(&fh)) {
            // Handle-based attributes stay correct after rename or unlink.
            if let Ok(meta) = self.core.getattr_handle(handle) {
                reply.attr(&TTL, &attr_to_fuse(&meta, ino));
                return;
            }
        }

        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.getattr(&path) {
            Ok(meta) => reply.attr(&TTL, &attr_to_fuse(&meta, ino)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        if let Some(new_size) = size {
            let result = match fh.and_then(|fh| self.handles.get(&fh)) {
                Some(handle) => self.core.truncate_handle(handle, new_size),
                None => self.core.truncate(&path, new_size),
            };
            if let Err(err) = result {
                reply.error(err.errno());
                return;
            }
        }

        if let Some(new_mode) = mode {
            if let Err(err) = self.core.set_mode(&path, new_mode & 0o7777) {
                reply.error(err.errno());
                return;
            }
        }

        if uid.is_some() || gid.is_some() {
            if let Err(err) = self.core.set_owner(&path, uid, gid) {
                reply.error(err.errno());
                return;
            }
        }

        if atime.is_some() || mtime.is_some() {
            let meta = match self.core.getattr(&path) {
                Ok(meta) => meta,
                Err(err) => {
                    reply.error(err.errno());
                    return;
                }
            };
            let to_time = |req: Option<TimeOrNow>, current_secs: i64, current_nanos: i64| match req
            {
                Some(TimeOrNow::SpecificTime(time)) => time,
                Some(TimeOrNow::Now) => SystemTime::now(),
                None => timestamp(current_secs, current_nanos),
            };
            let new_atime = to_time(atime, meta.atime(), meta.atime_nsec());
            let new_mtime = to_time(mtime, meta.mtime(), meta.mtime_nsec());
            if let Err(err) = self.core.set_times(&path, new_atime, new_mtime) {
                reply.error(err.errno());
                return;
            }
        }

        match self.core.getattr(&path) {
            Ok(meta) => reply.attr(&TTL, &attr_to_fuse(&meta, ino)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        let masked_perm = mode & 0o7777 & !(umask & 0o7777);
        let final_mode = (mode & libc::S_IFMT) | masked_perm;

        match self.core.mknod(&child, final_mode, rdev as u64) {
            Ok(()) => match self.core.getattr(&child) {
                Ok(meta) => {
                    let ino = self.get_or_alloc_inode(&child);
                    reply.entry(&TTL, &attr_to_fuse(&meta, ino), GENERATION);
                }
                Err(err) => reply.error(err.errno()),
            },
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.mkdir(&child, mode) {
            Ok(()) => match self.core.getattr(&child) {
                Ok(meta) => {
                    let ino = self.get_or_alloc_inode(&child);
                    reply.entry(&TTL, &attr_to_fuse(&meta, ino), GENERATION);
                }
                Err(err) => reply.error(err.errno()),
            },
            Err(err) => reply.error(err.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.unlink(&child) {
            Ok(()) => {
                self.remove_path_mapping(&child);
                reply.ok();
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.rmdir(&child) {
            Ok(()) => {
                self.remove_path_mapping(&child);
                reply.ok();
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        link: &std::path::Path,
        reply: ReplyEntry,
    ) {
        let child = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.symlink(link.as_os_str(), &child) {
            Ok(()) => match self.core.getattr(&child) {
                Ok(meta) => {
                    let ino = self.get_or_alloc_inode(&child);
                    reply.entry(&TTL, &attr_to_fuse(&meta, ino), GENERATION);
                }
                Err(err) => reply.error(err.errno()),
            },
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let old_path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };
        let new_path = match self.child_path(newparent, newname) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.rename(&old_path, &new_path) {
            Ok(()) => {
                if let Some(ino) = self.remove_path_mapping(&old_path) {
                    self.record_path_for_inode(new_path, ino);
                }
                reply.ok();
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let old_path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };
        let new_path = match self.child_path(newparent, newname) {
            Ok(path) => path,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.core.link(&old_path, &new_path) {
            Ok(()) => match self.core.getattr(&new_path) {
                Ok(meta) => {
                    self.record_path_for_inode(new_path, ino);
                    reply.entry(&TTL, &attr_to_fuse(&meta, ino), GENERATION);
                }
                Err(err) => reply.error(err.errno()),
            },
            Err(err) => reply.error(err.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.open(&path, flags) {
            Ok(handle) => {
                let fh = self.alloc_handle(handle);
                debug!(target: "mirrorfs::fuse", %path, fh, "opened");
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(EINVAL);
            return;
        }
        let handle = match self.handles.get(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        let mut buf = vec![0u8; size as usize];
        match self.core.read(handle, offset as u64, &mut buf) {
            Ok(bytes_read) => {
                buf.truncate(bytes_read);
                reply.data(&buf);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        if offset < 0 {
            reply.error(EINVAL);
            return;
        }
        let handle = match self.handles.get(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        match self.core.write(handle, offset as u64, data) {
            Ok(bytes_written) => reply.written(bytes_written as u32),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let handle = match self.handles.get(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        match self.core.flush(handle) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // A second release of the same fh is a dispatcher contract
        // violation; it is answered with EBADF rather than a crash.
        match self.handles.remove(&fh) {
            Some(handle) => match self.core.release(handle) {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(err.errno()),
            },
            None => reply.error(EBADF),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let handle = match self.handles.get(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        match self.core.fsync(handle, datasync) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.opendir(&path) {
            Ok(handle) => {
                let fh = self.alloc_handle(handle);
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let dir_path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        let mut next_offset = offset + 1;
        if offset == 0 {
            let parent_ino = dir_path
                .parent()
                .and_then(|parent| self.paths.get(&parent).copied())
                .unwrap_or(ino);
            let _ = reply.add(ino, next_offset, FileType::Directory, ".");
            next_offset += 1;
            let _ = reply.add(parent_ino, next_offset, FileType::Directory, "..");
            next_offset += 1;
        }

        let mut handle = match self.handles.remove(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        let core = Arc::clone(&self.core);
        let result = core.read_dir(&mut handle, |entry| {
            let child = match dir_path.join(&entry.name) {
                Ok(child) => child,
                // Names from the backing stream are single components;
                // skip anything that is not.
                Err(_) => return false,
            };
            let child_ino = self.get_or_alloc_inode(&child);
            let kind = entry.kind.map(entry_kind_to_fuse).unwrap_or(FileType::RegularFile);
            let full = reply.add(child_ino, next_offset, kind, &entry.name);
            if !full {
                next_offset += 1;
            }
            full
        });
        self.handles.insert(fh, handle);

        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        match self.handles.remove(&fh) {
            Some(handle) => match self.core.releasedir(handle) {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(err.errno()),
            },
            None => reply.error(EBADF),
        }
    }

    fn fsyncdir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        datasync: bool,
        reply: ReplyEmpty,
    ) {
        let handle = match self.handles.get(&fh) {
            Some(handle) => handle,
            None => {
                reply.error(EBADF);
                return;
            }
        };

        match self.core.fsync(handle, datasync) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.statfs(&path) {
            Ok(stats) => reply.statfs(
                stats.blocks(),
                stats.blocks_free(),
                stats.blocks_available(),
                stats.files(),
                stats.files_free(),
                stats.block_size() as u32,
                stats.name_max() as u32,
                stats.fragment_size() as u32,
            ),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.access(&path, mask) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        _size: u32,
        reply: ReplyXattr,
    ) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.xattr_get(&path, name) {
            Ok(value) => reply.data(&value),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.xattr_set(&path, name, value) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, _size: u32, reply: ReplyXattr) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.xattr_list(&path) {
            Ok(names) => {
                let mut buffer = Vec::new();
                for name in &names {
                    buffer.extend_from_slice(name.as_bytes());
                    buffer.push(0);
                }
                reply.data(&buffer);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.inode_to_path(ino) {
            Some(path) => path,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.core.xattr_remove(&path, name) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_adapter() -> (MirrorFsFuse, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("backing dir");
        let fuse = MirrorFsFuse::new(MountConfig::new(dir.path())).expect("adapter init");
        (fuse, dir)
    }

    #[test]
    fn root_inode_is_preseeded() {
        let (fuse, _dir) = test_adapter();
        assert_eq!(fuse.inode_to_path(FUSE_ROOT_ID), Some(VirtualPath::root()));
    }

    #[test]
    fn inode_allocation_is_stable_per_path() {
        let (mut fuse, _dir) = test_adapter();
        let path = VirtualPath::parse("a/b").expect("path");
        let first = fuse.get_or_alloc_inode(&path);
        assert_eq!(fuse.get_or_alloc_inode(&path), first);
        assert_eq!(fuse.remove_path_mapping(&path), Some(first));
        assert_ne!(fuse.get_or_alloc_inode(&path), first);
    }

    #[test]
    fn metadata_converts_to_fuse_attr() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("f"), b"hello").expect("write");
        let meta = std::fs::metadata(dir.path().join("f")).expect("metadata");
        let attr = attr_to_fuse(&meta, 7);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.size, 5);
        assert_eq!(attr.kind, FileType::RegularFile);
    }

    #[test]
    fn handle_table_rejects_stale_ids() {
        let (mut fuse, dir) = test_adapter();
        std::fs::write(dir.path().join("f"), b"x").expect("write");
        let path = VirtualPath::parse("f").expect("path");
        let handle = fuse.core.open(&path, libc::O_RDONLY).expect("open");
        let fh = fuse.alloc_handle(handle);
        assert!(fuse.handles.remove(&fh).is_some());
        assert!(fuse.handles.remove(&fh).is_none());
    }

    #[test]
    fn oversized_names_are_rejected() {
        let (fuse, _dir) = test_adapter();
        let long = "n".repeat(NAME_MAX + 1);
        assert_eq!(
            fuse.child_path(FUSE_ROOT_ID, OsStr::new(&long)).unwrap_err(),
            ENAMETOOLONG
        );
    }
}
