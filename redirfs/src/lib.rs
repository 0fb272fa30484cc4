// SPDX-License-Identifier: MIT OR Apache-2.0

//! Syscall-interception dispatcher that redirects a fixed set of
//! filesystem syscalls to an alternate backend.
//!
//! An external interception engine delivers raw syscall tuples to [`hook`].
//! The dispatcher decodes the arguments, applies per-syscall eligibility
//! rules (path form, flag combinations, file-descriptor provenance) and
//! either claims the call, supplying its result so the real syscall never
//! runs, or forwards it untouched. The file-descriptor space is partitioned
//! at a configured threshold: descriptors minted by the backend live at or
//! above it, kernel descriptors below it, and every handler rejects
//! descriptors outside its own namespace.
//!
//! The engine contract is fixed: return [`SYSCALL_CLAIMED`] (0) and write
//! the result slot to suppress the real syscall, return [`SYSCALL_FORWARD`]
//! (1) to let it proceed, with errno left exactly as the caller had it on a
//! forward. [`HookContext`] keeps the dispatcher's own I/O from being
//! re-intercepted on the same thread.

use std::os::raw::{c_int, c_long};
use std::sync::OnceLock;

pub mod backend;
pub mod config;
pub mod dirent;
pub mod dispatch;
pub mod fd;
pub mod guard;
pub mod handlers;

#[cfg(feature = "syscall-intercept")]
pub mod intercept;
#[cfg(feature = "interpose")]
pub mod interpose;

#[cfg(test)]
mod tests;

pub use backend::{BackendError, RemoteDirEntry, RemoteFs};
pub use config::{ConfigError, RedirConfig};
pub use dirent::{DirentBuilder, DirentIter, DirentLayout};
pub use dispatch::{Decision, SyscallArgs};
pub use guard::HookContext;
pub use handlers::Redirector;

/// Hook return value claiming the syscall; the result slot holds the outcome.
pub const SYSCALL_CLAIMED: c_int = 0;

/// Hook return value leaving the syscall to the kernel, untouched.
pub const SYSCALL_FORWARD: c_int = 1;

static REDIRECTOR: OnceLock<Redirector> = OnceLock::new();

/// Activates redirection process-wide.
///
/// May be called once, during process bootstrap and before the interception
/// engine starts delivering calls. Until then every hooked syscall is
/// forwarded.
pub fn install(config: RedirConfig, remote: Box<dyn RemoteFs>) -> Result<(), ConfigError> {
    REDIRECTOR
        .set(Redirector::new(config, remote))
        .map_err(|_| ConfigError::AlreadyInstalled)
}

/// The installed redirector, if redirection has been activated.
pub fn redirector() -> Option<&'static Redirector> {
    REDIRECTOR.get()
}

/// Whether redirection is active for this process.
pub fn is_active() -> bool {
    REDIRECTOR.get().is_some()
}

/// Interception entry point handed to the engine.
///
/// Contract dictated by the engine: return 0 and set `*result` when the
/// call is claimed (including claimed-with-error, where `*result` carries
/// `-errno`); return nonzero and leave `*result` untouched otherwise.
pub extern "C" fn hook(
    syscall_nr: c_long,
    a0: c_long,
    a1: c_long,
    a2: c_long,
    a3: c_long,
    a4: c_long,
    a5: c_long,
    result: *mut c_long,
) -> c_int {
    let Some(redirector) = redirector() else {
        return SYSCALL_FORWARD;
    };
    if result.is_null() {
        return SYSCALL_FORWARD;
    }

    let args = SyscallArgs::new([a0, a1, a2, a3, a4, a5]);
    let mut res: c_long = 0;
    let claimed = redirector.hook(syscall_nr, &args, &mut res);
    if claimed == SYSCALL_CLAIMED {
        // SAFETY: checked non-null above; the engine owns the slot for the
        // duration of the call.
        unsafe { *result = res };
    }
    claimed
}
