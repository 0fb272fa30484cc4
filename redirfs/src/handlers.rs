// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-syscall handlers.
//!
//! Each handler validates its arguments against the eligibility rules and
//! produces a [`Decision`]: `Claimed` means this crate supplies the final
//! result and the real syscall must not run (a negative result is
//! claimed-with-error); `PassThrough` means the kernel executes the call
//! unmodified. Backend failures are translated into negative error codes
//! and still claimed; a handler never falls back to the kernel after
//! committing to redirection.
//!
//! Both entry points (the raw-syscall hook and the libc-boundary
//! interposers) funnel into these methods, so the eligibility rules live
//! here and nowhere else.

use std::os::fd::RawFd;
use std::os::raw::{c_int, c_long};
use std::path::Path;

use log::{debug, trace, warn};
use nix::errno::Errno;
use redirfs_common::kernel_types::{Stat, Statfs};

use crate::backend::{BackendError, RemoteFs};
use crate::config::RedirConfig;
use crate::dirent::{DirentBuilder, DirentLayout};
use crate::dispatch::Decision;
use crate::fd::DescriptorNamespace;

/// The redirection runtime: configuration, descriptor classifier and the
/// backend servicing claimed calls.
pub struct Redirector {
    config: RedirConfig,
    fds: DescriptorNamespace,
    remote: Box<dyn RemoteFs>,
}

fn claimed_errno(errno: Errno) -> Decision {
    Decision::Claimed(-(errno as c_long))
}

fn claimed_failure(op: &str, err: &BackendError) -> Decision {
    debug!("{op}: backend failure: {err}");
    claimed_errno(err.errno())
}

impl Redirector {
    pub fn new(config: RedirConfig, remote: Box<dyn RemoteFs>) -> Self {
        let fds = DescriptorNamespace::new(config.fd_threshold());
        Self {
            config,
            fds,
            remote,
        }
    }

    pub fn config(&self) -> &RedirConfig {
        &self.config
    }

    fn path_eligible(&self, path: &Path) -> bool {
        path.is_absolute() && self.config.contains(path)
    }

    /// open/openat/creat. Only absolute paths resolved against the cwd
    /// pseudo-handle are considered; `O_PATH`, `O_APPEND` and `O_EXCL` are
    /// claimed-but-unsupported regardless of the path.
    pub fn openat(&self, dirfd: c_int, path: &Path, flags: c_int, mode: u32) -> Decision {
        if flags & (libc::O_PATH | libc::O_APPEND | libc::O_EXCL) != 0 {
            trace!("openat({path:?}): unsupported flags {flags:#x}");
            return claimed_errno(Errno::ENOTSUP);
        }
        if dirfd != libc::AT_FDCWD {
            // Relative resolution against arbitrary directory descriptors
            // is not implemented.
            return Decision::PassThrough;
        }
        if !self.path_eligible(path) {
            return Decision::PassThrough;
        }

        match self.remote.open(path, flags, mode) {
            Ok(fd) => {
                debug_assert!(self.fds.is_redirected(fd), "backend minted a native-range fd");
                debug!("openat({path:?}, flags: {flags:#x}) -> fd {fd}");
                Decision::Claimed(fd as c_long)
            }
            Err(err) => claimed_failure("openat", &err),
        }
    }

    pub fn close(&self, fd: RawFd) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        trace!("close(fd: {fd})");
        match self.remote.close(fd) {
            Ok(()) => Decision::Claimed(0),
            Err(err) => claimed_failure("close", &err),
        }
    }

    /// # Safety
    ///
    /// When `fd` classifies as redirected and `buf` is non-null, `buf` must
    /// be valid for `count` bytes of writes, as with the raw syscall.
    pub unsafe fn read(&self, fd: RawFd, buf: *mut u8, count: usize) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        if buf.is_null() {
            // read(fd, NULL, 0) is a successful no-op for the kernel too.
            return if count == 0 {
                Decision::Claimed(0)
            } else {
                claimed_errno(Errno::EFAULT)
            };
        }
        trace!("read(fd: {fd}, count: {count})");
        let slice = unsafe { std::slice::from_raw_parts_mut(buf, count) };
        match self.remote.read(fd, slice) {
            Ok(n) => Decision::Claimed(n as c_long),
            Err(err) => claimed_failure("read", &err),
        }
    }

    /// # Safety
    ///
    /// When `fd` classifies as redirected and `buf` is non-null, `buf` must
    /// be valid for `count` bytes of reads.
    pub unsafe fn write(&self, fd: RawFd, buf: *const u8, count: usize) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        if buf.is_null() {
            return if count == 0 {
                Decision::Claimed(0)
            } else {
                claimed_errno(Errno::EFAULT)
            };
        }
        trace!("write(fd: {fd}, count: {count})");
        let slice = unsafe { std::slice::from_raw_parts(buf, count) };
        match self.remote.write(fd, slice) {
            Ok(n) => Decision::Claimed(n as c_long),
            Err(err) => claimed_failure("write", &err),
        }
    }

    pub fn lseek(&self, fd: RawFd, offset: i64, whence: c_int) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        trace!("lseek(fd: {fd}, offset: {offset}, whence: {whence})");
        match self.remote.seek(fd, offset, whence) {
            Ok(pos) => Decision::Claimed(pos),
            Err(err) => claimed_failure("lseek", &err),
        }
    }

    pub fn fsync(&self, fd: RawFd) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        trace!("fsync(fd: {fd})");
        match self.remote.fsync(fd) {
            Ok(()) => Decision::Claimed(0),
            Err(err) => claimed_failure("fsync", &err),
        }
    }

    /// # Safety
    ///
    /// When the path is eligible, `statbuf` must be valid for a `Stat`
    /// write or null.
    pub unsafe fn stat(&self, path: &Path, statbuf: *mut Stat) -> Decision {
        if !self.path_eligible(path) {
            return Decision::PassThrough;
        }
        if statbuf.is_null() {
            return claimed_errno(Errno::EFAULT);
        }
        trace!("stat({path:?})");
        match self.remote.stat(path) {
            Ok(stat) => {
                unsafe { statbuf.write(stat) };
                Decision::Claimed(0)
            }
            Err(err) => claimed_failure("stat", &err),
        }
    }

    /// # Safety
    ///
    /// When `fd` classifies as redirected, `statbuf` must be valid for a
    /// `Stat` write or null.
    pub unsafe fn fstat(&self, fd: RawFd, statbuf: *mut Stat) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        if statbuf.is_null() {
            return claimed_errno(Errno::EFAULT);
        }
        trace!("fstat(fd: {fd})");
        match self.remote.fstat(fd) {
            Ok(stat) => {
                unsafe { statbuf.write(stat) };
                Decision::Claimed(0)
            }
            Err(err) => claimed_failure("fstat", &err),
        }
    }

    pub fn access(&self, path: &Path, mask: c_int) -> Decision {
        if !self.path_eligible(path) {
            return Decision::PassThrough;
        }
        trace!("access({path:?}, mask: {mask:#o})");
        match self.remote.access(path, mask) {
            Ok(()) => Decision::Claimed(0),
            Err(err) => claimed_failure("access", &err),
        }
    }

    /// # Safety
    ///
    /// When the path is eligible, `statfsbuf` must be valid for a `Statfs`
    /// write or null.
    pub unsafe fn statfs(&self, path: &Path, statfsbuf: *mut Statfs) -> Decision {
        if !self.path_eligible(path) {
            return Decision::PassThrough;
        }
        if statfsbuf.is_null() {
            return claimed_errno(Errno::EFAULT);
        }
        trace!("statfs({path:?})");
        match self.remote.statfs(path) {
            Ok(mut statfs) => {
                // The redirected mount never honors setuid bits or device
                // nodes, whatever the backend reports.
                statfs.f_flags |= (libc::ST_NOSUID | libc::ST_NODEV) as i64;
                unsafe { statfsbuf.write(statfs) };
                Decision::Claimed(0)
            }
            Err(err) => claimed_failure("statfs", &err),
        }
    }

    /// mkdir/mkdirat, decomposed into an open-for-create-directory call.
    /// Redirection of the derived operation is all-or-nothing: if the open
    /// would pass through, so does the whole mkdir.
    pub fn mkdirat(&self, dirfd: c_int, path: &Path, mode: u32) -> Decision {
        match self.openat(dirfd, path, libc::O_CREAT | libc::O_DIRECTORY, mode) {
            Decision::PassThrough => Decision::PassThrough,
            Decision::Claimed(fd) if fd >= 0 => {
                if let Err(err) = self.remote.close(fd as RawFd) {
                    warn!("mkdirat({path:?}): close of creation fd failed: {err}");
                }
                Decision::Claimed(0)
            }
            Decision::Claimed(err) => Decision::Claimed(err),
        }
    }

    /// unlink/rmdir, unified as unlinkat. Whether the target is a file or a
    /// directory is the backend's decision; only the caller's
    /// directory-removal intent is forwarded.
    pub fn unlinkat(&self, dirfd: c_int, path: &Path, flags: c_int) -> Decision {
        if dirfd != libc::AT_FDCWD {
            return Decision::PassThrough;
        }
        if !self.path_eligible(path) {
            return Decision::PassThrough;
        }
        let remove_dir = flags & libc::AT_REMOVEDIR != 0;
        trace!("unlinkat({path:?}, remove_dir: {remove_dir})");
        match self.remote.remove(path, remove_dir) {
            Ok(()) => Decision::Claimed(0),
            Err(err) => claimed_failure("unlinkat", &err),
        }
    }

    /// getdents/getdents64. Reconstructs kernel-compatible records from the
    /// backend's entry list; the directory cursor rides on the descriptor's
    /// seek position, counted in entries, so listing resumes across calls
    /// and end of listing surfaces as a zero-length read.
    ///
    /// # Safety
    ///
    /// When `fd` classifies as redirected and `dirp` is non-null, `dirp`
    /// must be valid for `count` bytes of writes.
    pub unsafe fn getdents(
        &self,
        fd: RawFd,
        dirp: *mut u8,
        count: usize,
        layout: DirentLayout,
    ) -> Decision {
        if !self.fds.is_redirected(fd) {
            return Decision::PassThrough;
        }
        if dirp.is_null() {
            return claimed_errno(Errno::EFAULT);
        }

        let position = match self.remote.seek(fd, 0, libc::SEEK_CUR) {
            Ok(pos) => pos as u64,
            Err(err) => return claimed_failure("getdents", &err),
        };
        let entries = match self.remote.list_dir(fd, position) {
            Ok(entries) => entries,
            Err(err) => return claimed_failure("getdents", &err),
        };

        let mut builder = DirentBuilder::new(layout, count);
        let mut packed = 0u64;
        for (index, entry) in entries.iter().enumerate() {
            // d_off names the position of the record that follows, which is
            // what a caller seeking back expects to land on.
            let next = position as i64 + index as i64 + 1;
            if !builder.try_push(entry.ino, next, entry.kind, &entry.name) {
                break;
            }
            packed += 1;
        }

        if packed == 0 && !entries.is_empty() {
            // Not even the first record fits; the kernel reports this as an
            // invalid buffer size.
            return claimed_errno(Errno::EINVAL);
        }

        unsafe {
            std::ptr::copy_nonoverlapping(builder.as_bytes().as_ptr(), dirp, builder.len());
        }

        if packed > 0 {
            if let Err(err) = self
                .remote
                .seek(fd, (position + packed) as i64, libc::SEEK_SET)
            {
                return claimed_failure("getdents", &err);
            }
        }

        trace!(
            "getdents(fd: {fd}): {packed} entries, {} bytes",
            builder.len()
        );
        Decision::Claimed(builder.len() as c_long)
    }
}
