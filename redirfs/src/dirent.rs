// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-entry record construction for getdents/getdents64.
//!
//! Callers of getdents parse the returned buffer by raw offset arithmetic,
//! so the records emitted here must be byte-identical to the kernel's:
//! back-to-back variable-length records, each padded so the next one starts
//! on a long-aligned boundary, end of listing signalled by a shorter read.
//! The builder packs records into a budgeted byte buffer; [`DirentIter`]
//! walks a packed buffer back into structured records for verification.

use redirfs_common::kernel_types::{
    dirent_align, DIRENT64_NAME_OFFSET, DIRENT_NAME_OFFSET,
};

/// Which kernel record shape to emit.
///
/// The legacy `linux_dirent` carries no type byte and uses unsigned-long
/// fields; `linux_dirent64` widens the offset and adds `d_type` after
/// `d_reclen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirentLayout {
    Legacy,
    Dirent64,
}

impl DirentLayout {
    fn name_offset(self) -> usize {
        match self {
            DirentLayout::Legacy => DIRENT_NAME_OFFSET,
            DirentLayout::Dirent64 => DIRENT64_NAME_OFFSET,
        }
    }

    /// Total record length for an entry name of `name_len` bytes, including
    /// the NUL and the alignment padding.
    pub fn record_len(self, name_len: usize) -> usize {
        dirent_align(self.name_offset() + name_len + 1)
    }
}

/// Packs directory records into a caller-provided byte budget.
#[derive(Debug)]
pub struct DirentBuilder {
    layout: DirentLayout,
    capacity: usize,
    buf: Vec<u8>,
}

impl DirentBuilder {
    pub fn new(layout: DirentLayout, capacity: usize) -> Self {
        Self {
            layout,
            capacity,
            buf: Vec::new(),
        }
    }

    /// Appends one record. Returns false, leaving the buffer untouched,
    /// when the record does not fit in the remaining budget.
    pub fn try_push(&mut self, ino: u64, off: i64, kind: u8, name: &[u8]) -> bool {
        let reclen = self.layout.record_len(name.len());
        if self.buf.len() + reclen > self.capacity {
            return false;
        }

        match self.layout {
            DirentLayout::Legacy => {
                self.buf.extend_from_slice(&ino.to_ne_bytes());
                self.buf.extend_from_slice(&(off as u64).to_ne_bytes());
                self.buf.extend_from_slice(&(reclen as u16).to_ne_bytes());
            }
            DirentLayout::Dirent64 => {
                self.buf.extend_from_slice(&ino.to_ne_bytes());
                self.buf.extend_from_slice(&off.to_ne_bytes());
                self.buf.extend_from_slice(&(reclen as u16).to_ne_bytes());
                self.buf.push(kind);
            }
        }
        self.buf.extend_from_slice(name);
        self.buf.push(0);
        self.buf.resize(self.buf.len() + reclen - self.layout.name_offset() - name.len() - 1, 0);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// One record parsed back out of a packed buffer. `kind` is `None` for the
/// legacy layout, which has no type byte.
#[derive(Debug, PartialEq, Eq)]
pub struct DirentRecord<'a> {
    pub ino: u64,
    pub off: i64,
    pub reclen: u16,
    pub kind: Option<u8>,
    pub name: &'a [u8],
}

/// Lazy walk over a packed record buffer, advancing by each record's
/// declared length, exactly the way callers of getdents do.
#[derive(Debug, Clone)]
pub struct DirentIter<'a> {
    layout: DirentLayout,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DirentIter<'a> {
    pub fn new(layout: DirentLayout, buf: &'a [u8]) -> Self {
        Self { layout, buf, pos: 0 }
    }

    /// Byte position of the next record, i.e. how far the offset-advance
    /// rule has walked so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_u64(&self, at: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[at..at + 8]);
        u64::from_ne_bytes(raw)
    }

    fn read_u16(&self, at: usize) -> u16 {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(&self.buf[at..at + 2]);
        u16::from_ne_bytes(raw)
    }
}

impl<'a> Iterator for DirentIter<'a> {
    type Item = DirentRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let name_offset = self.layout.name_offset();
        if self.pos + name_offset > self.buf.len() {
            return None;
        }

        let base = self.pos;
        let ino = self.read_u64(base);
        let off = self.read_u64(base + 8) as i64;
        let reclen = self.read_u16(base + 16);
        // A record shorter than its header or running past the buffer means
        // the layout is corrupt; stop rather than walk garbage.
        if (reclen as usize) < name_offset || base + reclen as usize > self.buf.len() {
            return None;
        }
        let kind = match self.layout {
            DirentLayout::Legacy => None,
            DirentLayout::Dirent64 => Some(self.buf[base + 18]),
        };

        let name_area = &self.buf[base + name_offset..base + reclen as usize];
        let name_len = name_area.iter().position(|&b| b == 0).unwrap_or(name_area.len());

        self.pos = base + reclen as usize;
        Some(DirentRecord {
            ino,
            off,
            reclen,
            kind,
            name: &name_area[..name_len],
        })
    }
}
