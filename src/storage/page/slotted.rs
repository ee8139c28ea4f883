//! Slotted page layout shared by heap pages and B-tree pages.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ PageHeader (23) │ SlottedHeader (22) │ pad │               │
//! ├─────────────────┴────────────────────┴─────┘               │
//! │ data area: entries packed from DATA_START  ──▶             │
//! │                                                            │
//! │                  contiguous free space                     │
//! │                                                            │
//! │                       ◀── slot array: slot[n-1] .. slot[0] │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entry offsets stored in slots are relative to [`DATA_START`]. The view
//! never hands out raw addresses, only sub-slices of the page arena.

use crate::common::config::PAGE_SIZE;
use crate::common::{FileId, PageId};

use super::page_header::{PageHeader, PageType};

/// Size of one slot-array entry in bytes.
pub const SLOT_SIZE: usize = 6;

/// Offset value marking a slot as a reusable hole.
pub const EMPTY_SLOT: u16 = u16::MAX;

/// First byte of the data area.
pub const DATA_START: usize = 48;

/// Bytes available to entries plus slots on an empty page.
pub const DATA_CAPACITY: usize = PAGE_SIZE - DATA_START;

const OFFSET_N_SLOTS: usize = PageHeader::SIZE;
const OFFSET_FREE: usize = OFFSET_N_SLOTS + 2;
const OFFSET_UNUSED: usize = OFFSET_FREE + 2;
const OFFSET_UNIQUE: usize = OFFSET_UNUSED + 2;
const OFFSET_PREV: usize = OFFSET_UNIQUE + 4;
const OFFSET_NEXT: usize = OFFSET_PREV + 4;
const OFFSET_P0: usize = OFFSET_NEXT + 4;

/// One entry of the slot array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Entry offset relative to the data area, or [`EMPTY_SLOT`].
    pub offset: u16,
    /// Unique stamp of the record (heap pages only; zero on B-tree pages).
    pub unique: u32,
}

impl Slot {
    pub const EMPTY: Slot = Slot {
        offset: EMPTY_SLOT,
        unique: 0,
    };

    pub fn new(offset: u16, unique: u32) -> Self {
        Self { offset, unique }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset == EMPTY_SLOT
    }
}

/// Typed accessor over a page arena.
///
/// Read methods need only `AsRef<[u8]>`; mutating methods need `AsMut<[u8]>`
/// as well, so a `SlottedPage<&[u8]>` cannot be written through.
pub struct SlottedPage<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    pub fn new(buf: B) -> Self {
        debug_assert_eq!(buf.as_ref().len(), PAGE_SIZE);
        Self { buf }
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    #[inline]
    fn u16_at(&self, offset: usize) -> u16 {
        let b = self.bytes();
        u16::from_le_bytes([b[offset], b[offset + 1]])
    }

    #[inline]
    fn u32_at(&self, offset: usize) -> u32 {
        let b = self.bytes();
        u32::from_le_bytes([b[offset], b[offset + 1], b[offset + 2], b[offset + 3]])
    }

    fn link_at(&self, offset: usize) -> Option<PageId> {
        PageId::from_raw(self.page_id().vol_no, self.u32_at(offset))
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.bytes()[PageHeader::OFFSET_PAGE_TYPE])
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(
            self.u16_at(PageHeader::OFFSET_VOL_NO),
            self.u32_at(PageHeader::OFFSET_PAGE_NO),
        )
    }

    pub fn file_id(&self) -> FileId {
        FileId(self.u32_at(PageHeader::OFFSET_FILE_ID))
    }

    /// Number of slots, live or empty.
    pub fn n_slots(&self) -> usize {
        self.u16_at(OFFSET_N_SLOTS) as usize
    }

    /// Next unused byte of the data area.
    pub fn free(&self) -> usize {
        self.u16_at(OFFSET_FREE) as usize
    }

    /// Bytes held by deleted entries that only compaction can reclaim.
    pub fn unused(&self) -> usize {
        self.u16_at(OFFSET_UNUSED) as usize
    }

    /// Last unique stamp handed out on this page.
    pub fn unique_counter(&self) -> u32 {
        self.u32_at(OFFSET_UNIQUE)
    }

    pub fn prev_page(&self) -> Option<PageId> {
        self.link_at(OFFSET_PREV)
    }

    pub fn next_page(&self) -> Option<PageId> {
        self.link_at(OFFSET_NEXT)
    }

    /// Leftmost child of an internal B-tree page.
    pub fn p0(&self) -> Option<PageId> {
        self.link_at(OFFSET_P0)
    }

    #[inline]
    fn slot_pos(idx: usize) -> usize {
        PAGE_SIZE - (idx + 1) * SLOT_SIZE
    }

    /// # Panics
    /// Panics if `idx >= n_slots()`.
    pub fn slot(&self, idx: usize) -> Slot {
        assert!(idx < self.n_slots(), "slot {} out of range", idx);
        let pos = Self::slot_pos(idx);
        Slot {
            offset: self.u16_at(pos),
            unique: self.u32_at(pos + 2),
        }
    }

    /// Number of slots that reference an entry.
    pub fn live_slots(&self) -> usize {
        (0..self.n_slots()).filter(|&i| !self.slot(i).is_empty()).count()
    }

    pub fn lowest_empty_slot(&self) -> Option<usize> {
        (0..self.n_slots()).find(|&i| self.slot(i).is_empty())
    }

    /// Free bytes between the end of the data and the start of the slot array.
    pub fn contiguous_free(&self) -> usize {
        DATA_CAPACITY.saturating_sub(self.free() + self.n_slots() * SLOT_SIZE)
    }

    /// Free bytes available once the page is compacted.
    pub fn free_space(&self) -> usize {
        self.contiguous_free() + self.unused()
    }

    /// Free space as a whole percentage of [`DATA_CAPACITY`].
    pub fn free_percent(&self) -> usize {
        self.free_space() * 100 / DATA_CAPACITY
    }

    /// The data area from `offset` to the end of the page.
    pub fn data_at(&self, offset: u16) -> &[u8] {
        &self.bytes()[DATA_START + offset as usize..]
    }

    /// The entry referenced by slot `idx`, decoded to `len` bytes.
    pub fn entry(&self, idx: usize, len: usize) -> &[u8] {
        let start = DATA_START + self.slot(idx).offset as usize;
        &self.bytes()[start..start + len]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    #[inline]
    fn put_u16(&mut self, offset: usize, value: u16) {
        self.bytes_mut()[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn put_u32(&mut self, offset: usize, value: u32) {
        self.bytes_mut()[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_link(&mut self, offset: usize, page: Option<PageId>) {
        self.put_u32(offset, page.map_or(PageId::NIL_PAGE_NO, |p| p.page_no));
    }

    /// Format the page as an empty slotted page.
    pub fn init(&mut self, page_type: PageType, page_id: PageId, file_id: FileId) {
        self.bytes_mut().fill(0);
        PageHeader::new(page_type, page_id, file_id).write_to(self.bytes_mut());
        self.put_link(OFFSET_PREV, None);
        self.put_link(OFFSET_NEXT, None);
        self.put_link(OFFSET_P0, None);
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.bytes_mut()[PageHeader::OFFSET_PAGE_TYPE] = page_type as u8;
    }

    pub fn set_n_slots(&mut self, n: usize) {
        self.put_u16(OFFSET_N_SLOTS, n as u16);
    }

    pub fn set_free(&mut self, free: usize) {
        self.put_u16(OFFSET_FREE, free as u16);
    }

    pub fn set_unused(&mut self, unused: usize) {
        self.put_u16(OFFSET_UNUSED, unused as u16);
    }

    pub fn set_prev_page(&mut self, page: Option<PageId>) {
        self.put_link(OFFSET_PREV, page);
    }

    pub fn set_next_page(&mut self, page: Option<PageId>) {
        self.put_link(OFFSET_NEXT, page);
    }

    pub fn set_p0(&mut self, page: Option<PageId>) {
        self.put_link(OFFSET_P0, page);
    }

    /// Advance the per-page unique counter and return the new stamp.
    pub fn next_unique(&mut self) -> u32 {
        let unique = self.unique_counter().wrapping_add(1);
        self.put_u32(OFFSET_UNIQUE, unique);
        unique
    }

    /// # Panics
    /// Panics if `idx` lies past the slot array plus one.
    pub fn set_slot(&mut self, idx: usize, slot: Slot) {
        assert!(idx <= self.n_slots(), "slot {} out of range", idx);
        let pos = Self::slot_pos(idx);
        self.put_u16(pos, slot.offset);
        self.put_u32(pos + 2, slot.unique);
    }

    /// Insert `slot` at position `pos`, shifting slots `pos..` up by one.
    pub fn insert_slot_at(&mut self, pos: usize, slot: Slot) {
        let n = self.n_slots();
        assert!(pos <= n, "slot position {} past end {}", pos, n);
        for idx in (pos..n).rev() {
            let moved = self.slot(idx);
            self.set_slot(idx + 1, moved);
        }
        self.set_slot(pos, slot);
        self.set_n_slots(n + 1);
    }

    /// Drop trailing empty slots. Returns how many were removed.
    pub fn trim_empty_slots(&mut self) -> usize {
        let mut n = self.n_slots();
        let before = n;
        while n > 0 && self.slot(n - 1).is_empty() {
            n -= 1;
        }
        self.set_n_slots(n);
        before - n
    }

    /// Remove every entry and slot, keeping header links and the unique counter.
    pub fn clear_entries(&mut self) {
        self.set_n_slots(0);
        self.set_free(0);
        self.set_unused(0);
    }

    /// Copy `entry` to the free offset and return its data-area offset.
    ///
    /// The caller must have checked [`contiguous_free`](Self::contiguous_free).
    pub fn append_entry(&mut self, entry: &[u8]) -> u16 {
        let offset = self.free();
        debug_assert!(offset + entry.len() <= DATA_CAPACITY);
        let start = DATA_START + offset;
        self.bytes_mut()[start..start + entry.len()].copy_from_slice(entry);
        self.set_free(offset + entry.len());
        offset as u16
    }

    /// Mutable data area from `offset` to the end of the page.
    pub fn data_at_mut(&mut self, offset: u16) -> &mut [u8] {
        &mut self.bytes_mut()[DATA_START + offset as usize..]
    }

    /// Slide live entries together so that all free space is contiguous.
    ///
    /// `entry_len` decodes the length of an entry from the bytes starting at
    /// its offset. Slot indices and unique stamps never change; only entry
    /// offsets, `free` and `unused` do. The new arena is built in a scratch
    /// buffer before anything on the page is overwritten.
    pub fn compact<F>(&mut self, entry_len: F)
    where
        F: Fn(&[u8]) -> usize,
    {
        let n = self.n_slots();
        let old_free = self.free();
        let mut arena = vec![0u8; DATA_CAPACITY];
        let mut moved = Vec::with_capacity(n);
        let mut cursor = 0usize;

        for idx in 0..n {
            let slot = self.slot(idx);
            if slot.is_empty() {
                continue;
            }
            let src = self.data_at(slot.offset);
            let len = entry_len(src);
            arena[cursor..cursor + len].copy_from_slice(&src[..len]);
            moved.push((idx, Slot::new(cursor as u16, slot.unique)));
            cursor += len;
        }

        let end = old_free.max(cursor);
        self.bytes_mut()[DATA_START..DATA_START + end].copy_from_slice(&arena[..end]);
        for (idx, slot) in moved {
            self.set_slot(idx, slot);
        }
        self.set_free(cursor);
        self.set_unused(0);
    }
}
