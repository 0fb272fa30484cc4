// SPDX-License-Identifier: MIT OR Apache-2.0

/// File metadata structure, matching the x86_64 kernel's struct stat.
///
/// Written straight into the buffer the intercepted caller passed to
/// stat/fstat, so field order and padding are load-bearing.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Stat {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_nlink: u64,
    pub st_mode: u32,
    pub st_uid: u32,
    pub st_gid: u32,
    pub _pad0: u32,
    pub st_rdev: u64,
    pub st_size: i64,
    pub st_blksize: i64,
    pub st_blocks: i64,
    pub st_atime: i64,
    pub st_atime_nsec: i64,
    pub st_mtime: i64,
    pub st_mtime_nsec: i64,
    pub st_ctime: i64,
    pub st_ctime_nsec: i64,
    pub _unused: [i64; 3],
}

/// Filesystem statistics structure, matching the kernel's struct statfs
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Statfs {
    pub f_type: i64,       /* Type of filesystem */
    pub f_bsize: i64,      /* Optimal transfer block size */
    pub f_blocks: u64,     /* Total data blocks in filesystem */
    pub f_bfree: u64,      /* Free blocks in filesystem */
    pub f_bavail: u64,     /* Free blocks available to unprivileged user */
    pub f_files: u64,      /* Total inodes in filesystem */
    pub f_ffree: u64,      /* Free inodes in filesystem */
    pub f_fsid: [i32; 2],  /* Filesystem ID */
    pub f_namelen: i64,    /* Maximum length of filenames */
    pub f_frsize: i64,     /* Fragment size */
    pub f_flags: i64,      /* Mount flags of filesystem */
    pub f_spare: [i64; 4], /* Padding bytes reserved for future use */
}

/// Byte offset of `d_name` inside the kernel's private `struct linux_dirent`
/// (fs/readdir.c): `d_ino` and `d_off` are unsigned long, `d_reclen` is
/// unsigned short. The legacy record carries no type byte.
pub const DIRENT_NAME_OFFSET: usize = 8 + 8 + 2;

/// Byte offset of `d_name` inside `struct linux_dirent64`
/// (include/linux/dirent.h): u64 inode, s64 offset, u16 reclen, u8 type.
pub const DIRENT64_NAME_OFFSET: usize = 8 + 8 + 2 + 1;

/// Record alignment used by the kernel when packing directory entries,
/// the `ALIGN(x, sizeof(long))` from fs/readdir.c.
pub const DIRENT_ALIGN: usize = core::mem::size_of::<u64>();

/// Rounds a record length up to the kernel's dirent alignment.
pub const fn dirent_align(len: usize) -> usize {
    (len + DIRENT_ALIGN - 1) & !(DIRENT_ALIGN - 1)
}
