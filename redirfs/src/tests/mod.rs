// SPDX-License-Identifier: MIT OR Apache-2.0

mod paths;
mod routing;

use std::os::fd::RawFd;

use crate::config::RedirConfig;
use crate::dispatch::Decision;
use crate::handlers::Redirector;
use mock::MockRemoteFs;

/// Descriptor-space split used throughout the tests: fds below this are
/// native, at or above it backend-minted.
pub(crate) const TEST_FD_START: RawFd = 1000;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A redirector serving the `/data` mount from `mock`. The caller keeps its
/// own handle on the mock to seed and inspect state.
pub(crate) fn redirector_for(mock: &MockRemoteFs) -> Redirector {
    init_logging();
    let config = RedirConfig::new("/data", TEST_FD_START).unwrap();
    Redirector::new(config, Box::new(mock.clone()))
}

/// Opens `path` through the handler and unwraps the minted descriptor.
pub(crate) fn open_redirected(redirector: &Redirector, path: &str, flags: i32) -> RawFd {
    match redirector.openat(libc::AT_FDCWD, std::path::Path::new(path), flags, 0o644) {
        Decision::Claimed(fd) if fd >= 0 => fd as RawFd,
        other => panic!("expected a redirected open of {path}, got {other:?}"),
    }
}
