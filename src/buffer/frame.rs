//! Frame - a slot in the buffer pool.

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// Bookkeeping for one frame, updated under a single lock so that the
/// page id, pin count and dirty flag are always observed together.
#[derive(Debug, Default, Clone, Copy)]
struct FrameMeta {
    page_id: Option<PageId>,
    pin_count: u32,
    dirty: bool,
}

/// A frame holds at most one page plus its pin/dirty state.
///
/// The page bytes sit behind an `RwLock` so that guards can hand out
/// `&Page` / `&mut Page` for as long as they live.
pub struct Frame {
    page: RwLock<Page>,
    meta: Mutex<FrameMeta>,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            meta: Mutex::new(FrameMeta::default()),
        }
    }

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.meta.lock().page_id
    }

    /// Bind the frame to `page_id` with one pin and a clean state.
    pub fn load(&self, page_id: PageId) {
        *self.meta.lock() = FrameMeta {
            page_id: Some(page_id),
            pin_count: 1,
            dirty: false,
        };
    }

    /// Forget the loaded page.
    pub fn clear(&self) {
        *self.meta.lock() = FrameMeta::default();
    }

    /// Increment the pin count. Returns the new pin count.
    pub fn pin(&self) -> u32 {
        let mut meta = self.meta.lock();
        meta.pin_count += 1;
        meta.pin_count
    }

    /// Decrement the pin count, folding in `dirty`. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    pub fn unpin(&self, dirty: bool) -> u32 {
        let mut meta = self.meta.lock();
        assert!(meta.pin_count > 0, "pin count underflow");
        meta.pin_count -= 1;
        meta.dirty |= dirty;
        meta.pin_count
    }

    pub fn pin_count(&self) -> u32 {
        self.meta.lock().pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    pub fn mark_dirty(&self) {
        self.meta.lock().dirty = true;
    }

    pub fn clear_dirty(&self) {
        self.meta.lock().dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.meta.lock().dirty
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_load_and_clear() {
        let frame = Frame::new();
        assert_eq!(frame.page_id(), None);

        frame.load(PageId::new(1, 7));
        assert_eq!(frame.page_id(), Some(PageId::new(1, 7)));
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());

        frame.clear();
        assert_eq!(frame.page_id(), None);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_unpin_folds_dirty() {
        let frame = Frame::new();
        frame.load(PageId::new(1, 1));
        frame.pin();

        assert_eq!(frame.unpin(false), 1);
        assert!(!frame.is_dirty());
        assert_eq!(frame.unpin(true), 0);
        assert!(frame.is_dirty());

        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    #[should_panic(expected = "pin count underflow")]
    fn test_unpin_underflow() {
        Frame::new().unpin(false);
    }
}
