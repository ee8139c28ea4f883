//! On-page format of heap objects.
//!
//! # Layout
//! ```text
//! ┌────────────┬─────┬──────────┬──────────────────────────────┐
//! │ properties │ tag │  length  │ payload (aligned to 4 bytes) │
//! │    u16     │ u16 │   u32    │                              │
//! └────────────┴─────┴──────────┴──────────────────────────────┘
//! ```

use crate::common::config::aligned_len;
use crate::storage::page::{Page, DATA_CAPACITY, SLOT_SIZE};

/// Size of the encoded [`ObjectHeader`].
pub const OBJECT_HEADER_SIZE: usize = 8;

/// Largest aligned payload that still fits in a single empty page together
/// with its header and slot.
pub const MAX_OBJECT_LEN: usize = (DATA_CAPACITY - OBJECT_HEADER_SIZE - SLOT_SIZE) & !3;

/// Per-object header stored in front of the payload.
///
/// `properties` and `tag` are carried for the caller; `length` is set by the
/// heap manager when the object is written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub properties: u16,
    pub tag: u16,
    pub length: u32,
}

impl ObjectHeader {
    pub fn new(properties: u16, tag: u16) -> Self {
        Self {
            properties,
            tag,
            length: 0,
        }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.properties.to_le_bytes());
        buf[2..4].copy_from_slice(&self.tag.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        Self {
            properties: u16::from_le_bytes([buf[0], buf[1]]),
            tag: u16::from_le_bytes([buf[2], buf[3]]),
            length: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// Bytes occupied in the data area by an object with a `len`-byte payload.
#[inline]
pub const fn object_entry_size(len: usize) -> usize {
    OBJECT_HEADER_SIZE + aligned_len(len)
}

/// Decode the in-page size of the object starting at `data`.
pub fn object_entry_len(data: &[u8]) -> usize {
    object_entry_size(ObjectHeader::from_bytes(data).length as usize)
}

/// Encode header and payload into one data-area entry.
pub(crate) fn encode_object(mut header: ObjectHeader, payload: &[u8]) -> Vec<u8> {
    header.length = payload.len() as u32;
    let mut buf = vec![0u8; object_entry_size(payload.len())];
    header.write_to(&mut buf);
    buf[OBJECT_HEADER_SIZE..OBJECT_HEADER_SIZE + payload.len()].copy_from_slice(payload);
    buf
}

/// Slide the live objects of a heap page together. Slot numbers and unique
/// stamps are unchanged.
pub fn compact_page(page: &mut Page) {
    page.slotted_mut().compact(object_entry_len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FileId, PageId};
    use crate::storage::page::{PageType, Slot};

    #[test]
    fn test_entry_size_is_aligned() {
        assert_eq!(object_entry_size(0), 8);
        assert_eq!(object_entry_size(1), 12);
        assert_eq!(object_entry_size(4), 12);
        assert_eq!(object_entry_size(5), 16);
        assert_eq!(MAX_OBJECT_LEN % 4, 0);
        assert!(object_entry_size(MAX_OBJECT_LEN) + SLOT_SIZE <= DATA_CAPACITY);
    }

    #[test]
    fn test_encode_sets_length() {
        let entry = encode_object(ObjectHeader::new(1, 7), b"abcde");
        let header = ObjectHeader::from_bytes(&entry);
        assert_eq!(header, ObjectHeader { properties: 1, tag: 7, length: 5 });
        assert_eq!(object_entry_len(&entry), 16);
        assert_eq!(&entry[8..13], b"abcde");
        assert_eq!(&entry[13..], &[0, 0, 0]);
    }

    #[test]
    fn test_compact_page_reclaims_holes() {
        let mut page = Page::new();
        let mut sp = page.slotted_mut();
        sp.init(PageType::Slotted, PageId::new(1, 0), FileId(1));
        for (i, body) in [&b"first"[..], b"second", b"third"].iter().enumerate() {
            let off = sp.append_entry(&encode_object(ObjectHeader::default(), body));
            sp.insert_slot_at(i, Slot::new(off, i as u32 + 1));
        }
        let hole = object_entry_size(5);
        sp.set_slot(0, Slot::EMPTY);
        sp.set_unused(hole);
        let before = sp.free_space();

        compact_page(&mut page);

        let sp = page.slotted();
        assert_eq!(sp.unused(), 0);
        assert_eq!(sp.free_space(), before);
        assert_eq!(sp.slot(1).offset, 0);
        assert_eq!(sp.slot(2).unique, 3);
        assert_eq!(&sp.data_at(sp.slot(2).offset)[8..13], b"third");
    }
}
