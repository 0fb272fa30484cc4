// SPDX-License-Identifier: MIT OR Apache-2.0

//! Syscall demultiplexing.
//!
//! Maps a raw syscall number to its handler, decoding the argument tuple on
//! the way in. Legacy syscalls and their at-suffixed successors normalize
//! to the same handler with the cwd pseudo-handle and reordered arguments,
//! so both ABIs share one set of eligibility rules. Anything without a
//! registered handler is forwarded; process-creation syscalls must never
//! reach this path and abort the process if they do.

use std::ffi::CStr;
use std::os::fd::RawFd;
use std::os::raw::{c_char, c_int, c_long};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use log::error;
use redirfs_common::kernel_types::{Stat, Statfs};

use crate::dirent::DirentLayout;
use crate::guard::HookContext;
use crate::handlers::Redirector;
use crate::{SYSCALL_CLAIMED, SYSCALL_FORWARD};

/// One intercepted syscall invocation: the raw argument registers,
/// constructed once per interception event and consumed by one handler.
#[derive(Debug, Clone, Copy)]
pub struct SyscallArgs {
    args: [c_long; 6],
}

impl SyscallArgs {
    pub fn new(args: [c_long; 6]) -> Self {
        Self { args }
    }

    fn fd(&self, index: usize) -> RawFd {
        self.args[index] as RawFd
    }

    /// Decodes a pointer argument as a NUL-terminated path. `None` for a
    /// null pointer, which is left to the kernel to fault on.
    ///
    /// # Safety
    ///
    /// Non-null values must point to a NUL-terminated string that outlives
    /// the intercepted call, which the engine guarantees for path
    /// arguments.
    unsafe fn path(&self, index: usize) -> Option<&Path> {
        let ptr = self.args[index] as *const c_char;
        if ptr.is_null() {
            return None;
        }
        let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
        Some(Path::new(std::ffi::OsStr::from_bytes(bytes)))
    }

    fn ptr<T>(&self, index: usize) -> *mut T {
        self.args[index] as *mut T
    }
}

/// Handler verdict for one intercepted call. `Claimed` carries the value
/// for the caller's result slot, negative-errno convention for failures;
/// `PassThrough` lets the real syscall run unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Claimed(c_long),
    PassThrough,
}

/// The handler capability a syscall number routes to. Numerically distinct
/// syscalls denoting the same logical operation share a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handler {
    Open,
    Creat,
    Openat,
    Close,
    Read,
    Write,
    Lseek,
    Fsync,
    Stat,
    Fstat,
    Mkdir,
    Mkdirat,
    Statfs,
    Access,
    Unlink,
    Unlinkat,
    Rmdir,
    Getdents,
    Getdents64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// A registered handler decides this call.
    Redirect(Handler),
    /// No handler registered; the kernel executes the call.
    Forward,
    /// Redirecting this call is undefined behavior for this design; it must
    /// have been excluded before ever reaching the dispatcher.
    Forbidden,
}

pub(crate) fn route(syscall_nr: c_long) -> Route {
    match syscall_nr {
        #[cfg(target_arch = "x86_64")]
        libc::SYS_open => Route::Redirect(Handler::Open),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_creat => Route::Redirect(Handler::Creat),
        libc::SYS_openat => Route::Redirect(Handler::Openat),
        libc::SYS_close => Route::Redirect(Handler::Close),
        libc::SYS_read => Route::Redirect(Handler::Read),
        libc::SYS_write => Route::Redirect(Handler::Write),
        libc::SYS_lseek => Route::Redirect(Handler::Lseek),
        libc::SYS_fsync => Route::Redirect(Handler::Fsync),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_stat => Route::Redirect(Handler::Stat),
        libc::SYS_fstat => Route::Redirect(Handler::Fstat),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_mkdir => Route::Redirect(Handler::Mkdir),
        libc::SYS_mkdirat => Route::Redirect(Handler::Mkdirat),
        libc::SYS_statfs => Route::Redirect(Handler::Statfs),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_access => Route::Redirect(Handler::Access),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_unlink => Route::Redirect(Handler::Unlink),
        libc::SYS_unlinkat => Route::Redirect(Handler::Unlinkat),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_rmdir => Route::Redirect(Handler::Rmdir),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_getdents => Route::Redirect(Handler::Getdents),
        libc::SYS_getdents64 => Route::Redirect(Handler::Getdents64),
        #[cfg(target_arch = "x86_64")]
        libc::SYS_fork | libc::SYS_vfork => Route::Forbidden,
        _ => Route::Forward,
    }
}

impl Handler {
    /// Decodes the argument tuple for this handler and invokes it.
    ///
    /// # Safety
    ///
    /// The arguments must be the unmodified registers of a live intercepted
    /// syscall: pointer arguments valid (or null) exactly as the kernel
    /// would have received them.
    unsafe fn invoke(self, redirector: &Redirector, args: &SyscallArgs) -> Decision {
        // Claiming a call with an undecodable path would change caller
        // behavior, so null paths are forwarded for the kernel to reject.
        macro_rules! path_arg {
            ($index:expr) => {
                match unsafe { args.path($index) } {
                    Some(path) => path,
                    None => return Decision::PassThrough,
                }
            };
        }

        match self {
            Handler::Open => redirector.openat(
                libc::AT_FDCWD,
                path_arg!(0),
                args.args[1] as c_int,
                args.args[2] as u32,
            ),
            Handler::Creat => redirector.openat(
                libc::AT_FDCWD,
                path_arg!(0),
                libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                args.args[1] as u32,
            ),
            Handler::Openat => redirector.openat(
                args.args[0] as c_int,
                path_arg!(1),
                args.args[2] as c_int,
                args.args[3] as u32,
            ),
            Handler::Close => redirector.close(args.fd(0)),
            Handler::Read => unsafe {
                redirector.read(args.fd(0), args.ptr::<u8>(1), args.args[2] as usize)
            },
            Handler::Write => unsafe {
                redirector.write(args.fd(0), args.ptr::<u8>(1).cast_const(), args.args[2] as usize)
            },
            Handler::Lseek => {
                redirector.lseek(args.fd(0), args.args[1] as i64, args.args[2] as c_int)
            }
            Handler::Fsync => redirector.fsync(args.fd(0)),
            Handler::Stat => unsafe { redirector.stat(path_arg!(0), args.ptr::<Stat>(1)) },
            Handler::Fstat => unsafe { redirector.fstat(args.fd(0), args.ptr::<Stat>(1)) },
            Handler::Mkdir => {
                redirector.mkdirat(libc::AT_FDCWD, path_arg!(0), args.args[1] as u32)
            }
            Handler::Mkdirat => redirector.mkdirat(
                args.args[0] as c_int,
                path_arg!(1),
                args.args[2] as u32,
            ),
            Handler::Statfs => unsafe {
                redirector.statfs(path_arg!(0), args.ptr::<Statfs>(1))
            },
            Handler::Access => redirector.access(path_arg!(0), args.args[1] as c_int),
            Handler::Unlink => redirector.unlinkat(libc::AT_FDCWD, path_arg!(0), 0),
            Handler::Unlinkat => redirector.unlinkat(
                args.args[0] as c_int,
                path_arg!(1),
                args.args[2] as c_int,
            ),
            Handler::Rmdir => {
                redirector.unlinkat(libc::AT_FDCWD, path_arg!(0), libc::AT_REMOVEDIR)
            }
            Handler::Getdents => unsafe {
                redirector.getdents(
                    args.fd(0),
                    args.ptr::<u8>(1),
                    args.args[2] as usize,
                    DirentLayout::Legacy,
                )
            },
            Handler::Getdents64 => unsafe {
                redirector.getdents(
                    args.fd(0),
                    args.ptr::<u8>(1),
                    args.args[2] as usize,
                    DirentLayout::Dirent64,
                )
            },
        }
    }
}

/// Routes one syscall to its handler, or decides pass-through.
///
/// # Safety
///
/// Same contract as [`Handler::invoke`]: `args` must be the registers of a
/// live intercepted syscall.
pub unsafe fn dispatch(redirector: &Redirector, syscall_nr: c_long, args: &SyscallArgs) -> Decision {
    match route(syscall_nr) {
        Route::Forward => Decision::PassThrough,
        Route::Forbidden => {
            error!("process-creation syscall {syscall_nr} reached the dispatcher");
            std::process::abort();
        }
        Route::Redirect(handler) => unsafe { handler.invoke(redirector, args) },
    }
}

impl Redirector {
    /// Guarded hook entry: reentrancy check, errno snapshot, dispatch,
    /// errno restore. Returns the engine convention (0 claimed with
    /// `*result` set, 1 forward) so both the exported [`crate::hook`] and
    /// tests can drive it directly.
    pub fn hook(&self, syscall_nr: c_long, args: &SyscallArgs, result: &mut c_long) -> c_int {
        let Some(_ctx) = HookContext::enter() else {
            // A handler's own syscall on this thread; forward it or recurse
            // forever.
            return SYSCALL_FORWARD;
        };

        match unsafe { dispatch(self, syscall_nr, args) } {
            Decision::Claimed(value) => {
                *result = value;
                SYSCALL_CLAIMED
            }
            Decision::PassThrough => SYSCALL_FORWARD,
        }
    }
}
