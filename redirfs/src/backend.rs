// SPDX-License-Identifier: MIT OR Apache-2.0

//! The remote filesystem collaborator.
//!
//! The wire protocol is not this crate's business; a backend only has to
//! offer a synchronous call/response contract per operation, keyed by
//! absolute path or by a descriptor it minted itself. Backends must mint
//! descriptors at or above the configured threshold so the classifier can
//! tell them apart from kernel descriptors.

use std::os::fd::RawFd;
use std::os::raw::c_int;
use std::path::Path;

use nix::errno::Errno;
use redirfs_common::kernel_types::{Stat, Statfs};
use thiserror::Error;

/// Backend operation failure, translated by the handlers into the negative
/// error code the intercepted caller observes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("no such file or directory")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("file exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("bad remote descriptor")]
    BadDescriptor,
    #[error("no space left on remote filesystem")]
    NoSpace,
    #[error("operation not supported by the backend")]
    Unsupported,
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl BackendError {
    pub fn errno(&self) -> Errno {
        match self {
            BackendError::NotFound => Errno::ENOENT,
            BackendError::PermissionDenied => Errno::EACCES,
            BackendError::AlreadyExists => Errno::EEXIST,
            BackendError::NotADirectory => Errno::ENOTDIR,
            BackendError::IsADirectory => Errno::EISDIR,
            BackendError::NotEmpty => Errno::ENOTEMPTY,
            BackendError::BadDescriptor => Errno::EBADF,
            BackendError::NoSpace => Errno::ENOSPC,
            BackendError::Unsupported => Errno::ENOTSUP,
            BackendError::Remote(_) => Errno::EIO,
        }
    }
}

/// One directory entry as reported by the backend. `kind` is a `DT_*`
/// constant; `name` is the bare entry name without a NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    pub ino: u64,
    pub kind: u8,
    pub name: Vec<u8>,
}

/// Synchronous remote-filesystem operations.
///
/// Handlers are thin relays into these calls; blocking, retries and
/// timeouts are the implementation's concern. Directory descriptors carry a
/// position just like kernel ones: `seek` moves it and `list_dir` reads
/// from it, which is what lets getdents resume across calls.
pub trait RemoteFs: Send + Sync {
    /// Opens (or creates, per `flags`) `path`, returning a descriptor at or
    /// above the configured threshold.
    fn open(&self, path: &Path, flags: c_int, mode: u32) -> Result<RawFd, BackendError>;

    fn close(&self, fd: RawFd) -> Result<(), BackendError>;

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> Result<usize, BackendError>;

    fn write(&self, fd: RawFd, buf: &[u8]) -> Result<usize, BackendError>;

    /// Repositions the descriptor, `whence` being one of the `SEEK_*`
    /// constants. For directory descriptors the offset counts entries.
    fn seek(&self, fd: RawFd, offset: i64, whence: c_int) -> Result<i64, BackendError>;

    fn fsync(&self, fd: RawFd) -> Result<(), BackendError>;

    fn stat(&self, path: &Path) -> Result<Stat, BackendError>;

    fn fstat(&self, fd: RawFd) -> Result<Stat, BackendError>;

    /// Checks accessibility of `path` for the `access(2)` mask.
    fn access(&self, path: &Path, mask: c_int) -> Result<(), BackendError>;

    /// Deletes a file or directory. Whether the target actually is a
    /// directory is the backend's call; the dispatcher only forwards the
    /// caller's intent via `remove_dir`.
    fn remove(&self, path: &Path, remove_dir: bool) -> Result<(), BackendError>;

    fn statfs(&self, path: &Path) -> Result<Statfs, BackendError>;

    /// Directory entries starting at entry index `offset`. An empty vector
    /// signals end of listing.
    fn list_dir(&self, fd: RawFd, offset: u64) -> Result<Vec<RemoteDirEntry>, BackendError>;
}
