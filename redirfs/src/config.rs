// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redirection configuration: where the redirected mount lives in the path
//! namespace and where the descriptor namespace is split.

use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("mount root must be an absolute path")]
    RelativeMountRoot,
    #[error("fd threshold {0} would overlap the standard descriptors")]
    ThresholdTooLow(RawFd),
    #[error("redirection is already installed for this process")]
    AlreadyInstalled,
}

/// Read-only after initialization; every hooked call consults it, so no
/// locking is involved.
#[derive(Debug, Clone)]
pub struct RedirConfig {
    mount_root: PathBuf,
    fd_threshold: RawFd,
}

impl RedirConfig {
    /// Descriptor-space split used when the deployment does not pick its own.
    /// High enough that the kernel will not hand out colliding numbers under
    /// any sane RLIMIT_NOFILE.
    pub const DEFAULT_FD_THRESHOLD: RawFd = 1 << 20;

    pub fn new(mount_root: impl Into<PathBuf>, fd_threshold: RawFd) -> Result<Self, ConfigError> {
        let mount_root = mount_root.into();
        if !mount_root.is_absolute() {
            return Err(ConfigError::RelativeMountRoot);
        }
        if fd_threshold <= 2 {
            return Err(ConfigError::ThresholdTooLow(fd_threshold));
        }
        Ok(Self {
            mount_root,
            fd_threshold,
        })
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    pub fn fd_threshold(&self) -> RawFd {
        self.fd_threshold
    }

    /// Whether a path falls inside the redirected mount. Component-wise, so
    /// `/data` contains `/data/f` but not `/database`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.mount_root)
    }
}
