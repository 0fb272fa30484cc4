// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptor classifier.
//!
//! The integer fd space is partitioned at a threshold fixed at install
//! time: numbers below it are kernel-assigned, numbers at or above it are
//! minted by the backend. A descriptor's namespace is decided at open time
//! and never changes for its lifetime.

use std::os::fd::RawFd;

#[derive(Debug, Clone, Copy)]
pub struct DescriptorNamespace {
    threshold: RawFd,
}

impl DescriptorNamespace {
    pub fn new(threshold: RawFd) -> Self {
        Self { threshold }
    }

    /// Whether `fd` belongs to the redirected namespace. Pure function of
    /// the fd value; handlers that only accept one namespace decline the
    /// other symmetrically.
    pub fn is_redirected(&self, fd: RawFd) -> bool {
        fd >= self.threshold
    }

    pub fn threshold(&self) -> RawFd {
        self.threshold
    }
}
