// SPDX-License-Identifier: MIT OR Apache-2.0

//! libc-boundary entry points, for deployments that interpose at the
//! library-call level (LD_PRELOAD) instead of trapping raw syscalls.
//!
//! Each symbol lazily resolves the next implementation in the link chain
//! exactly once, through an idempotent `OnceLock`, so concurrent first use
//! cannot resolve twice or observe a half-written pointer. On every call:
//! if redirection is active and the per-syscall handler claims the call,
//! its result is returned (errno set from a negative result); otherwise the
//! call forwards unmodified to the resolved native implementation. The
//! eligibility rules themselves live in [`crate::handlers`], shared with
//! the raw-syscall hook, so the two entry points cannot drift.
//!
//! These functions bypass the reentrancy guard on purpose: the redirector's
//! own I/O goes through the raw syscall layer, not back through these
//! symbols.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::OnceLock;

use libc::{c_char, c_int, c_long, mode_t, off_t, size_t, ssize_t};
use nix::errno::Errno;

use crate::dispatch::Decision;
use crate::redirector;
use redirfs_common::kernel_types::Stat;

/// Resolves `name` to the next definition in the link chain.
fn next_symbol<T: Copy>(name: &str) -> Option<T> {
    let name = CString::new(name).ok()?;
    let sym = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if sym.is_null() {
        None
    } else {
        // SAFETY: dlsym returned a non-null code address for this symbol;
        // T is the matching fn-pointer type at every call site.
        Some(unsafe { std::mem::transmute_copy(&sym) })
    }
}

/// Converts a claimed result to the libc convention: negative values become
/// -1 with errno set.
fn libc_result(value: c_long) -> c_long {
    if value < 0 {
        Errno::set_raw((-value) as i32);
        -1
    } else {
        value
    }
}

unsafe fn path_ref<'a>(path: *const c_char) -> Option<&'a Path> {
    if path.is_null() {
        return None;
    }
    let bytes = unsafe { std::ffi::CStr::from_ptr(path) }.to_bytes();
    Some(Path::new(std::ffi::OsStr::from_bytes(bytes)))
}

type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;

/// # Safety
///
/// ABI replacement for libc `open`; same contract.
#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    static NEXT: OnceLock<Option<OpenFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("open"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        if let Decision::Claimed(res) = rt.openat(libc::AT_FDCWD, p, flags, mode as u32) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(path, flags, mode) },
        None => enosys(),
    }
}

type OpenatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, mode_t) -> c_int;

/// # Safety
///
/// ABI replacement for libc `openat`; same contract.
#[no_mangle]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    static NEXT: OnceLock<Option<OpenatFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("openat"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        if let Decision::Claimed(res) = rt.openat(dirfd, p, flags, mode as u32) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(dirfd, path, flags, mode) },
        None => enosys(),
    }
}

type CreatFn = unsafe extern "C" fn(*const c_char, mode_t) -> c_int;

/// # Safety
///
/// ABI replacement for libc `creat`; same contract.
#[no_mangle]
pub unsafe extern "C" fn creat(path: *const c_char, mode: mode_t) -> c_int {
    static NEXT: OnceLock<Option<CreatFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("creat"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        let flags = libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC;
        if let Decision::Claimed(res) = rt.openat(libc::AT_FDCWD, p, flags, mode as u32) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(path, mode) },
        None => enosys(),
    }
}

type CloseFn = unsafe extern "C" fn(c_int) -> c_int;

/// # Safety
///
/// ABI replacement for libc `close`; same contract.
#[no_mangle]
pub unsafe extern "C" fn close(fd: c_int) -> c_int {
    static NEXT: OnceLock<Option<CloseFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("close"));

    if let Some(rt) = redirector() {
        if let Decision::Claimed(res) = rt.close(fd) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(fd) },
        None => enosys(),
    }
}

type ReadFn = unsafe extern "C" fn(c_int, *mut libc::c_void, size_t) -> ssize_t;

/// # Safety
///
/// ABI replacement for libc `read`; same contract.
#[no_mangle]
pub unsafe extern "C" fn read(fd: c_int, buf: *mut libc::c_void, count: size_t) -> ssize_t {
    static NEXT: OnceLock<Option<ReadFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("read"));

    if let Some(rt) = redirector() {
        if let Decision::Claimed(res) = unsafe { rt.read(fd, buf.cast(), count) } {
            return libc_result(res) as ssize_t;
        }
    }
    match next {
        Some(f) => unsafe { f(fd, buf, count) },
        None => enosys() as ssize_t,
    }
}

type WriteFn = unsafe extern "C" fn(c_int, *const libc::c_void, size_t) -> ssize_t;

/// # Safety
///
/// ABI replacement for libc `write`; same contract.
#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const libc::c_void, count: size_t) -> ssize_t {
    static NEXT: OnceLock<Option<WriteFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("write"));

    if let Some(rt) = redirector() {
        if let Decision::Claimed(res) = unsafe { rt.write(fd, buf.cast(), count) } {
            return libc_result(res) as ssize_t;
        }
    }
    match next {
        Some(f) => unsafe { f(fd, buf, count) },
        None => enosys() as ssize_t,
    }
}

type LseekFn = unsafe extern "C" fn(c_int, off_t, c_int) -> off_t;

/// # Safety
///
/// ABI replacement for libc `lseek`; same contract.
#[no_mangle]
pub unsafe extern "C" fn lseek(fd: c_int, offset: off_t, whence: c_int) -> off_t {
    static NEXT: OnceLock<Option<LseekFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("lseek"));

    if let Some(rt) = redirector() {
        if let Decision::Claimed(res) = rt.lseek(fd, offset, whence) {
            return libc_result(res) as off_t;
        }
    }
    match next {
        Some(f) => unsafe { f(fd, offset, whence) },
        None => enosys() as off_t,
    }
}

type FsyncFn = unsafe extern "C" fn(c_int) -> c_int;

/// # Safety
///
/// ABI replacement for libc `fsync`; same contract.
#[no_mangle]
pub unsafe extern "C" fn fsync(fd: c_int) -> c_int {
    static NEXT: OnceLock<Option<FsyncFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("fsync"));

    if let Some(rt) = redirector() {
        if let Decision::Claimed(res) = rt.fsync(fd) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(fd) },
        None => enosys(),
    }
}

type StatFn = unsafe extern "C" fn(*const c_char, *mut libc::stat) -> c_int;

/// # Safety
///
/// ABI replacement for libc `stat`; same contract.
#[no_mangle]
pub unsafe extern "C" fn stat(path: *const c_char, buf: *mut libc::stat) -> c_int {
    static NEXT: OnceLock<Option<StatFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("stat"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        if let Decision::Claimed(res) = unsafe { rt.stat(p, buf.cast::<Stat>()) } {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(path, buf) },
        None => enosys(),
    }
}

type UnlinkFn = unsafe extern "C" fn(*const c_char) -> c_int;

/// # Safety
///
/// ABI replacement for libc `unlink`; same contract.
#[no_mangle]
pub unsafe extern "C" fn unlink(path: *const c_char) -> c_int {
    static NEXT: OnceLock<Option<UnlinkFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("unlink"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        if let Decision::Claimed(res) = rt.unlinkat(libc::AT_FDCWD, p, 0) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(path) },
        None => enosys(),
    }
}

type RmdirFn = unsafe extern "C" fn(*const c_char) -> c_int;

/// # Safety
///
/// ABI replacement for libc `rmdir`; same contract.
#[no_mangle]
pub unsafe extern "C" fn rmdir(path: *const c_char) -> c_int {
    static NEXT: OnceLock<Option<RmdirFn>> = OnceLock::new();
    let next = *NEXT.get_or_init(|| next_symbol("rmdir"));

    if let (Some(rt), Some(p)) = (redirector(), unsafe { path_ref(path) }) {
        if let Decision::Claimed(res) = rt.unlinkat(libc::AT_FDCWD, p, libc::AT_REMOVEDIR) {
            return libc_result(res) as c_int;
        }
    }
    match next {
        Some(f) => unsafe { f(path) },
        None => enosys(),
    }
}

fn enosys() -> c_int {
    Errno::set_raw(libc::ENOSYS);
    -1
}
