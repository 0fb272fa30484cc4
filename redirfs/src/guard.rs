// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reentrancy guard around the dispatcher.
//!
//! A handler's own I/O can trigger another interception event on the same
//! thread; without the guard that recursion never terminates. Entering the
//! dispatcher also must not disturb the errno the intercepted caller's
//! surrounding code observes on a pass-through, so the guard snapshots it on
//! entry and restores it on every exit path.

use std::cell::Cell;

use nix::errno::Errno;

thread_local! {
    static IN_DISPATCH: Cell<bool> = const { Cell::new(false) };
}

/// Per-invocation dispatch context. Holding one means this thread is inside
/// the dispatcher and any nested interception event must be forwarded.
///
/// Dropping it restores the saved errno and re-arms the guard, on success
/// and failure paths alike.
#[derive(Debug)]
pub struct HookContext {
    saved_errno: i32,
}

impl HookContext {
    /// Enters the dispatcher on this thread. `None` means the thread is
    /// already dispatching and the caller must forward the syscall without
    /// invoking any handler.
    pub fn enter() -> Option<Self> {
        if IN_DISPATCH.with(|flag| flag.replace(true)) {
            return None;
        }
        Some(Self {
            saved_errno: Errno::last_raw(),
        })
    }
}

impl Drop for HookContext {
    fn drop(&mut self) {
        Errno::set_raw(self.saved_errno);
        IN_DISPATCH.with(|flag| flag.set(false));
    }
}
