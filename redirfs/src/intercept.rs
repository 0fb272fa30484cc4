// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binding to the libsyscall_intercept engine.
//!
//! The engine itself (trap mechanism, process bootstrap) stays external;
//! this module only wires [`crate::hook`] into the engine's hook point and
//! exposes the engine's escape hatch for issuing syscalls that bypass
//! interception.

use std::os::raw::{c_int, c_long};

/// The engine's hook-function shape: return 0 with `*result` set to claim
/// the call, nonzero to let the real syscall run.
pub type HookFn = extern "C" fn(
    syscall_nr: c_long,
    a0: c_long,
    a1: c_long,
    a2: c_long,
    a3: c_long,
    a4: c_long,
    a5: c_long,
    result: *mut c_long,
) -> c_int;

#[link(name = "syscall_intercept")]
extern "C" {
    static mut intercept_hook_point: Option<HookFn>;

    /// Issues a raw syscall that the engine will not intercept.
    pub fn syscall_no_intercept(syscall_nr: c_long, ...) -> c_long;
}

/// Registers the dispatcher with the engine.
///
/// # Safety
///
/// Changes the behavior of every syscall in the process. Call once, during
/// bootstrap, after [`crate::install`].
pub unsafe fn register() {
    intercept_hook_point = Some(crate::hook);
}

/// Detaches the dispatcher from the engine.
///
/// # Safety
///
/// Must not race with in-flight hooked syscalls.
pub unsafe fn unregister() {
    intercept_hook_point = None;
}
