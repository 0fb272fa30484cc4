// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::Path;

use redirfs_common::kernel_types::{Stat, Statfs};

use crate::dispatch::Decision;

use super::mock::MockRemoteFs;
use super::redirector_for;

#[test]
fn stat_reports_backend_metadata() {
    let mock = MockRemoteFs::new();
    mock.add_file("/data/f", b"0123456789");
    let redirector = redirector_for(&mock);

    let mut stat = Stat::default();
    assert_eq!(
        unsafe { redirector.stat(Path::new("/data/f"), &mut stat) },
        Decision::Claimed(0)
    );
    assert_eq!(stat.st_size, 10);
    assert_eq!(stat.st_mode & libc::S_IFMT, libc::S_IFREG);

    assert_eq!(
        unsafe { redirector.stat(Path::new("/data/missing"), &mut stat) },
        Decision::Claimed(-libc::ENOENT as i64)
    );
    assert_eq!(
        unsafe { redirector.stat(Path::new("/etc/passwd"), &mut stat) },
        Decision::PassThrough
    );
}

#[test]
fn access_follows_mount_eligibility() {
    let mock = MockRemoteFs::new();
    mock.add_file("/data/f", b"x");
    let redirector = redirector_for(&mock);

    assert_eq!(
        redirector.access(Path::new("/data/f"), libc::R_OK),
        Decision::Claimed(0)
    );
    assert_eq!(
        redirector.access(Path::new("/data/missing"), libc::R_OK),
        Decision::Claimed(-libc::ENOENT as i64)
    );
    assert_eq!(
        redirector.access(Path::new("/outside"), libc::R_OK),
        Decision::PassThrough
    );
}

#[test]
fn statfs_populates_the_kernel_record() {
    let mock = MockRemoteFs::new();
    mock.add_file("/data/f", b"x");
    let redirector = redirector_for(&mock);

    let mut statfs = Statfs::default();
    assert_eq!(
        unsafe { redirector.statfs(Path::new("/data"), &mut statfs) },
        Decision::Claimed(0)
    );
    assert_eq!(statfs.f_bsize, 4096);
    assert_eq!(statfs.f_blocks, 40960);
    assert_eq!(statfs.f_namelen, 255);
    // The redirected mount always reports nosuid/nodev.
    assert_ne!(statfs.f_flags & libc::ST_NOSUID as i64, 0);
    assert_ne!(statfs.f_flags & libc::ST_NODEV as i64, 0);

    assert_eq!(
        unsafe { redirector.statfs(Path::new("/outside"), &mut statfs) },
        Decision::PassThrough
    );
}

#[test]
fn mkdir_is_claimed_iff_the_decomposed_open_is() {
    let mock = MockRemoteFs::new();
    let redirector = redirector_for(&mock);

    // Eligible path: claimed, directory created, creation fd released.
    assert_eq!(
        redirector.mkdirat(libc::AT_FDCWD, Path::new("/data/newdir"), 0o755),
        Decision::Claimed(0)
    );
    assert!(mock.has_dir("/data/newdir"));
    assert_eq!(mock.open_count(), 0);

    // Ineligible open means the whole mkdir passes through, with no side
    // effects on the backend.
    assert_eq!(
        redirector.mkdirat(libc::AT_FDCWD, Path::new("/outside/newdir"), 0o755),
        Decision::PassThrough
    );
    assert!(!mock.has_dir("/outside/newdir"));
    assert_eq!(
        redirector.mkdirat(libc::AT_FDCWD, Path::new("relative"), 0o755),
        Decision::PassThrough
    );
    assert_eq!(
        redirector.mkdirat(5, Path::new("/data/other"), 0o755),
        Decision::PassThrough
    );
    assert!(!mock.has_dir("/data/other"));

    // Claimed-with-error from the open surfaces as the mkdir result.
    assert_eq!(
        redirector.mkdirat(libc::AT_FDCWD, Path::new("/data/newdir"), 0o755),
        Decision::Claimed(-libc::EEXIST as i64)
    );
}

#[test]
fn unlink_and_rmdir_share_the_deletion_handler() {
    let mock = MockRemoteFs::new();
    mock.add_file("/data/file", b"x");
    mock.add_dir("/data/empty", vec![]);
    mock.add_dir(
        "/data/full",
        vec![super::mock::dir_entry(1, libc::DT_REG, "child")],
    );
    let redirector = redirector_for(&mock);

    // The handler does not inspect the target's type; the backend decides.
    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/data/empty"), 0),
        Decision::Claimed(-libc::EISDIR as i64)
    );
    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/data/file"), libc::AT_REMOVEDIR),
        Decision::Claimed(-libc::ENOTDIR as i64)
    );

    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/data/file"), 0),
        Decision::Claimed(0)
    );
    assert!(!mock.has_file("/data/file"));

    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/data/full"), libc::AT_REMOVEDIR),
        Decision::Claimed(-libc::ENOTEMPTY as i64)
    );
    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/data/empty"), libc::AT_REMOVEDIR),
        Decision::Claimed(0)
    );
    assert!(!mock.has_dir("/data/empty"));

    // Outside the mount or with a foreign dirfd, deletion passes through.
    assert_eq!(
        redirector.unlinkat(libc::AT_FDCWD, Path::new("/outside/f"), 0),
        Decision::PassThrough
    );
    assert_eq!(
        redirector.unlinkat(9, Path::new("/data/full"), 0),
        Decision::PassThrough
    );
}
