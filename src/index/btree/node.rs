//! Entry formats and search for B-tree leaf and internal pages.
//!
//! Both page kinds are slotted pages; slot order is key order.
//!
//! # Leaf entry
//! ```text
//! ┌───────────┬───────┬──────────────────────┬──────────────┐
//! │ n_objects │ klen  │ key (aligned to 4)   │ ObjectId (12)│
//! │    u16    │  u16  │                      │              │
//! └───────────┴───────┴──────────────────────┴──────────────┘
//! ```
//!
//! # Internal entry
//! ```text
//! ┌─────────────┬───────┬──────────────────────────────────┐
//! │ child page  │ klen  │ key (klen + 2 aligned to 4)      │
//! │    u32      │  u16  │                                  │
//! └─────────────┴───────┴──────────────────────────────────┘
//! ```
//! Every internal page also carries `p0`, the child covering keys below its
//! first entry.

use crate::common::config::aligned_len;
use crate::common::{Error, ObjectId, PageId, Result};
use crate::storage::page::{PageType, SlottedPage};

use super::key::KeyDesc;

const LEAF_FIXED: usize = 4;
const INTERNAL_CHILD: usize = 4;

/// Bytes taken in the data area by a leaf entry for a `klen`-byte key.
#[inline]
pub const fn leaf_entry_size(klen: usize) -> usize {
    LEAF_FIXED + aligned_len(klen) + ObjectId::SIZE
}

/// Bytes taken in the data area by an internal entry for a `klen`-byte key.
#[inline]
pub const fn internal_entry_size(klen: usize) -> usize {
    INTERNAL_CHILD + aligned_len(klen + 2)
}

#[inline]
fn klen_at(data: &[u8], at: usize) -> usize {
    u16::from_le_bytes([data[at], data[at + 1]]) as usize
}

pub fn leaf_entry_len(data: &[u8]) -> usize {
    leaf_entry_size(klen_at(data, 2))
}

pub fn internal_entry_len(data: &[u8]) -> usize {
    internal_entry_size(klen_at(data, 4))
}

pub fn encode_leaf_entry(key: &[u8], oid: &ObjectId) -> Vec<u8> {
    let mut buf = vec![0u8; leaf_entry_size(key.len())];
    buf[0..2].copy_from_slice(&1u16.to_le_bytes());
    buf[2..4].copy_from_slice(&(key.len() as u16).to_le_bytes());
    buf[4..4 + key.len()].copy_from_slice(key);
    let at = 4 + aligned_len(key.len());
    oid.write_to(&mut buf[at..at + ObjectId::SIZE]);
    buf
}

pub fn encode_internal_entry(child: PageId, key: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; internal_entry_size(key.len())];
    buf[0..4].copy_from_slice(&child.page_no.to_le_bytes());
    buf[4..6].copy_from_slice(&(key.len() as u16).to_le_bytes());
    buf[6..6 + key.len()].copy_from_slice(key);
    buf
}

/// Key bytes of an encoded leaf entry.
pub fn leaf_entry_key(data: &[u8]) -> &[u8] {
    &data[4..4 + klen_at(data, 2)]
}

/// ObjectId stored in an encoded leaf entry.
pub fn leaf_entry_oid(data: &[u8]) -> ObjectId {
    let at = 4 + aligned_len(klen_at(data, 2));
    ObjectId::from_bytes(&data[at..at + ObjectId::SIZE])
}

/// Key bytes of an encoded internal entry.
pub fn internal_entry_key(data: &[u8]) -> &[u8] {
    &data[6..6 + klen_at(data, 4)]
}

pub(super) fn internal_entry_child_no(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

/// Read access to a B-tree page.
pub trait BTreePageExt {
    fn leaf_key(&self, idx: usize) -> &[u8];
    fn leaf_oid(&self, idx: usize) -> ObjectId;
    fn internal_key(&self, idx: usize) -> &[u8];
    fn internal_child(&self, idx: usize) -> PageId;
    /// Encoded entry at `idx`, sized by the page's entry format.
    fn raw_entry(&self, idx: usize) -> &[u8];
}

impl<B: AsRef<[u8]>> BTreePageExt for SlottedPage<B> {
    fn leaf_key(&self, idx: usize) -> &[u8] {
        leaf_entry_key(self.data_at(self.slot(idx).offset))
    }

    fn leaf_oid(&self, idx: usize) -> ObjectId {
        leaf_entry_oid(self.data_at(self.slot(idx).offset))
    }

    fn internal_key(&self, idx: usize) -> &[u8] {
        internal_entry_key(self.data_at(self.slot(idx).offset))
    }

    fn internal_child(&self, idx: usize) -> PageId {
        let no = internal_entry_child_no(self.data_at(self.slot(idx).offset));
        PageId::new(self.page_id().vol_no, no)
    }

    fn raw_entry(&self, idx: usize) -> &[u8] {
        let data = self.data_at(self.slot(idx).offset);
        let len = match self.page_type() {
            PageType::BTreeInternal => internal_entry_len(data),
            _ => leaf_entry_len(data),
        };
        &data[..len]
    }
}

/// Search a leaf for `key`.
///
/// Returns `Ok(idx)` on an exact match, otherwise `Err(pos)` where every
/// entry before `pos` is strictly less than `key`.
pub fn search_leaf<B: AsRef<[u8]>>(
    page: &SlottedPage<B>,
    desc: &KeyDesc,
    key: &[u8],
) -> std::result::Result<usize, usize> {
    let (mut lo, mut hi) = (0, page.n_slots());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match desc.compare(page.leaf_key(mid), key) {
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Equal => return Ok(mid),
        }
    }
    Err(lo)
}

/// Index of the last internal entry whose key is `<= key`, or `None` when
/// `key` sorts before every entry (the `p0` child covers it).
pub fn search_internal<B: AsRef<[u8]>>(
    page: &SlottedPage<B>,
    desc: &KeyDesc,
    key: &[u8],
) -> Option<usize> {
    let (mut lo, mut hi) = (0, page.n_slots());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if desc.compare(page.internal_key(mid), key).is_le() {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.checked_sub(1)
}

/// Child page of an internal page covering `key`.
pub fn child_for<B: AsRef<[u8]>>(page: &SlottedPage<B>, desc: &KeyDesc, key: &[u8]) -> Result<PageId> {
    match search_internal(page, desc, key) {
        Some(idx) => Ok(page.internal_child(idx)),
        None => page.p0().ok_or(Error::CorruptPage {
            page_id: page.page_id(),
            page_type: page.page_type() as u8,
        }),
    }
}

/// Fail with `CorruptPage` unless the page is a leaf or an internal node.
pub fn check_btree_page<B: AsRef<[u8]>>(page: &SlottedPage<B>) -> Result<PageType> {
    match page.page_type() {
        t @ (PageType::BTreeLeaf | PageType::BTreeInternal) => Ok(t),
        other => Err(Error::CorruptPage {
            page_id: page.page_id(),
            page_type: other as u8,
        }),
    }
}
