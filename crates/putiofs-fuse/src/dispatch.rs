//! Kernel protocol adapter.
//!
//! Implements `fuser::Filesystem` on top of [`PutioFs`]. The session loop
//! calls these methods one at a time from a single thread, so anything that
//! may wait on the remote store is moved onto the runtime's blocking pool
//! together with its reply. The loop goes straight back to reading requests
//! and a slow download never holds up a lookup elsewhere in the tree.
//! Requests answered from local state are replied to inline.

use std::ffi::OsStr;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use tokio::runtime::Handle;
use tracing::debug;

use crate::filesystem::{fail, PutioFs};

#[cfg(target_os = "macos")]
const NO_XATTR: c_int = libc::ENOATTR;
#[cfg(not(target_os = "macos"))]
const NO_XATTR: c_int = libc::ENODATA;

/// The object handed to `fuser` when mounting.
pub struct PutioFuse {
    fs: Arc<PutioFs>,
    runtime: Handle,
}

impl PutioFuse {
    /// `runtime` supplies the blocking pool remote-bound requests run on.
    pub fn new(fs: PutioFs, runtime: Handle) -> Self {
        Self {
            fs: Arc::new(fs),
            runtime,
        }
    }

    /// The filesystem requests are served from.
    pub fn fs(&self) -> &Arc<PutioFs> {
        &self.fs
    }

    /// Runs `work` on the blocking pool. The task is detached; it owns the
    /// reply and answers the kernel itself.
    pub(crate) fn offload<F>(&self, work: F)
    where
        F: FnOnce(&PutioFs) + Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        drop(self.runtime.spawn_blocking(move || work(&fs)));
    }
}

impl Filesystem for PutioFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> std::result::Result<(), c_int> {
        debug!("putiofs init");
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = name.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.lookup_entry(parent, &name) {
            Ok((attr, ttl)) => reply.entry(&ttl, &attr, 0),
            Err(e) => reply.error(fail("lookup", e)),
        });
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        debug!(ino, nlookup, "forget");
        if let Err(e) = self.fs.forget_entry(ino, nlookup) {
            fail("forget", e);
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!(ino, "getattr");
        match self.fs.get_attr(ino) {
            Ok(attr) => reply.attr(&self.fs.root().config().attr_ttl, &attr),
            Err(e) => reply.error(fail("getattr", e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!(ino, ?size, "setattr");
        match self.fs.set_size(ino, size) {
            Ok(attr) => reply.attr(&self.fs.root().config().attr_ttl, &attr),
            Err(e) => reply.error(fail("setattr", e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let name = name.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.make_dir(parent, &name) {
            Ok(attr) => reply.entry(&fs.root().config().entry_ttl, &attr, 0),
            Err(e) => reply.error(fail("mkdir", e)),
        });
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = name.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.remove_entry(parent, &name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(fail("unlink", e)),
        });
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = name.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.remove_entry(parent, &name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(fail("rmdir", e)),
        });
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let name = link_name.to_string_lossy();
        match self.fs.symlink_entry(parent, &name, target) {
            Ok(attr) => reply.entry(&self.fs.root().config().entry_ttl, &attr, 0),
            Err(e) => reply.error(fail("symlink", e)),
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
        let name = name.to_string_lossy().into_owned();
        let newname = newname.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.rename_entry(parent, &name, newparent, &newname) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(fail("rename", e)),
        });
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.fs.open_file(ino, flags) {
            Ok((fh, open_flags)) => reply.opened(fh, open_flags),
            Err(e) => reply.error(fail("open", e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!(ino, fh, offset, size, "read");
        self.offload(move |fs| match fs.read_file(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(fail("read", e)),
        });
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!(ino, fh, offset, len = data.len(), "write");
        let data = data.to_vec();
        self.offload(move |fs| match fs.write_file(fh, offset, &data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(fail("write", e)),
        });
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        debug!(ino, fh, "flush");
        self.offload(move |fs| match fs.flush_file(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(fail("flush", e)),
        });
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!(ino, fh, "release");
        // Waits for any read still holding the handle.
        self.offload(move |fs| {
            fs.release_file(fh);
            reply.ok();
        });
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        match self.fs.fsync_file(ino) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(fail("fsync", e)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        self.offload(move |fs| match fs.open_dir(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(fail("opendir", e)),
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!(ino, fh, offset, "readdir");
        let rows = match self.fs.dir_rows(fh) {
            Ok(rows) => rows,
            Err(e) => {
                reply.error(fail("readdir", e));
                return;
            }
        };
        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, row) in rows.iter().enumerate().skip(skip) {
            if reply.add(row.ino, (i + 1) as i64, row.kind, &row.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        self.fs.release_file(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let s = self.fs.statfs_info();
        reply.statfs(s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let name = name.to_string_lossy().into_owned();
        self.offload(move |fs| match fs.create_file(parent, &name) {
            Ok((attr, fh)) => reply.created(&fs.root().config().entry_ttl, &attr, 0, fh, 0),
            Err(e) => reply.error(fail("create", e)),
        });
    }

    fn getxattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, _size: u32, reply: ReplyXattr) {
        debug!(ino, name = %name.to_string_lossy(), "getxattr");
        reply.error(NO_XATTR);
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        debug!(ino, "listxattr");
        if size == 0 {
            reply.size(0);
        } else {
            reply.data(&[]);
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        debug!(ino, name = %name.to_string_lossy(), "setxattr ignored");
        reply.ok();
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(ino, name = %name.to_string_lossy(), "removexattr ignored");
        reply.ok();
    }
}
