// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::{ConfigError, RedirConfig};
use crate::dispatch::{route, Handler, Route, SyscallArgs};
use crate::{SYSCALL_CLAIMED, SYSCALL_FORWARD};

use super::mock::MockRemoteFs;
use super::{redirector_for, TEST_FD_START};

#[test]
fn every_intercepted_syscall_has_a_handler() {
    let expected = [
        (libc::SYS_openat, Handler::Openat),
        (libc::SYS_close, Handler::Close),
        (libc::SYS_read, Handler::Read),
        (libc::SYS_write, Handler::Write),
        (libc::SYS_lseek, Handler::Lseek),
        (libc::SYS_fsync, Handler::Fsync),
        (libc::SYS_fstat, Handler::Fstat),
        (libc::SYS_mkdirat, Handler::Mkdirat),
        (libc::SYS_statfs, Handler::Statfs),
        (libc::SYS_unlinkat, Handler::Unlinkat),
        (libc::SYS_getdents64, Handler::Getdents64),
    ];
    for (nr, handler) in expected {
        assert_eq!(route(nr), Route::Redirect(handler), "syscall {nr}");
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn legacy_syscalls_normalize_to_the_shared_handlers() {
    let expected = [
        (libc::SYS_open, Handler::Open),
        (libc::SYS_creat, Handler::Creat),
        (libc::SYS_stat, Handler::Stat),
        (libc::SYS_mkdir, Handler::Mkdir),
        (libc::SYS_access, Handler::Access),
        (libc::SYS_unlink, Handler::Unlink),
        (libc::SYS_rmdir, Handler::Rmdir),
        (libc::SYS_getdents, Handler::Getdents),
    ];
    for (nr, handler) in expected {
        assert_eq!(route(nr), Route::Redirect(handler), "syscall {nr}");
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn process_creation_syscalls_are_forbidden() {
    assert_eq!(route(libc::SYS_fork), Route::Forbidden);
    assert_eq!(route(libc::SYS_vfork), Route::Forbidden);
    // clone is how threads come to be; it is forwarded, not forbidden.
    assert_eq!(route(libc::SYS_clone), Route::Forward);
}

#[test]
fn unregistered_syscalls_are_forwarded_untouched() {
    let mock = MockRemoteFs::new();
    let redirector = redirector_for(&mock);

    let mut res: libc::c_long = 77;
    let args = SyscallArgs::new([0; 6]);
    for nr in [libc::SYS_getpid, libc::SYS_ioctl, libc::SYS_mmap, libc::SYS_futex] {
        assert_eq!(redirector.hook(nr, &args, &mut res), SYSCALL_FORWARD);
        assert_eq!(res, 77, "result slot touched for syscall {nr}");
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn mkdir_and_mkdirat_behave_identically() {
    let mock = MockRemoteFs::new();
    let redirector = redirector_for(&mock);

    let mut res: libc::c_long = -1;
    let path = c"/data/via-legacy";
    let args = SyscallArgs::new([path.as_ptr() as libc::c_long, 0o755, 0, 0, 0, 0]);
    assert_eq!(
        redirector.hook(libc::SYS_mkdir, &args, &mut res),
        SYSCALL_CLAIMED
    );
    assert_eq!(res, 0);
    assert!(mock.has_dir("/data/via-legacy"));

    let path = c"/data/via-at";
    let args = SyscallArgs::new([
        libc::AT_FDCWD as libc::c_long,
        path.as_ptr() as libc::c_long,
        0o755,
        0,
        0,
        0,
    ]);
    assert_eq!(
        redirector.hook(libc::SYS_mkdirat, &args, &mut res),
        SYSCALL_CLAIMED
    );
    assert_eq!(res, 0);
    assert!(mock.has_dir("/data/via-at"));
}

/// Process-wide installation: the exported hook forwards everything until
/// redirection is installed, claims eligible calls afterwards, and refuses
/// a second installation. One test owns the global so ordering stays
/// deterministic.
#[test]
fn global_install_drives_the_exported_hook() {
    super::init_logging();
    assert!(!crate::is_active());

    let path = c"/data/global";
    let mut res: libc::c_long = 0;
    assert_eq!(
        crate::hook(
            libc::SYS_openat,
            libc::AT_FDCWD as libc::c_long,
            path.as_ptr() as libc::c_long,
            (libc::O_RDONLY | libc::O_CREAT) as libc::c_long,
            0o644,
            0,
            0,
            &mut res,
        ),
        SYSCALL_FORWARD
    );

    let mock = MockRemoteFs::new();
    let config = RedirConfig::new("/data", TEST_FD_START).unwrap();
    crate::install(config, Box::new(mock.clone())).unwrap();
    assert!(crate::is_active());

    assert_eq!(
        crate::hook(
            libc::SYS_openat,
            libc::AT_FDCWD as libc::c_long,
            path.as_ptr() as libc::c_long,
            (libc::O_RDONLY | libc::O_CREAT) as libc::c_long,
            0o644,
            0,
            0,
            &mut res,
        ),
        SYSCALL_CLAIMED
    );
    assert!(res >= TEST_FD_START as i64);
    assert!(mock.has_file("/data/global"));

    // A null result slot can never be claimed.
    assert_eq!(
        crate::hook(
            libc::SYS_openat,
            libc::AT_FDCWD as libc::c_long,
            path.as_ptr() as libc::c_long,
            libc::O_RDONLY as libc::c_long,
            0,
            0,
            0,
            std::ptr::null_mut(),
        ),
        SYSCALL_FORWARD
    );

    let again = RedirConfig::new("/data", TEST_FD_START).unwrap();
    assert_eq!(
        crate::install(again, Box::new(MockRemoteFs::new())).unwrap_err(),
        ConfigError::AlreadyInstalled
    );
}
