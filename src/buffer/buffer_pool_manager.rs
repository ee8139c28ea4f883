//! Buffer Pool Manager - the page store used by the heap and index managers.
//!
//! The [`BufferPoolManager`] provides:
//! - Pinned page access through RAII guards
//! - Dirty page write-back on eviction and flush
//! - Page allocation and deallocation through the volume's extent allocator

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::buffer::{ClockReplacer, Frame, PageReadGuard, PageWriteGuard, PoolStats};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::{AllocRequest, DiskManager};

/// Manages a pool of buffer frames for caching the pages of one volume.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ClockReplacer │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Pins
/// A page stays in its frame for as long as any guard for it is alive.
/// Guards unpin on drop, so a pin cannot outlive the scope that took it.
/// Taking a second guard on a page the same thread already holds for writing
/// deadlocks; callers pass the guard they hold instead.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<ClockReplacer>,
    disk_manager: Mutex<DiskManager>,
    stats: PoolStats,
    vol_no: u16,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(ClockReplacer::new(pool_size)),
            vol_no: disk_manager.vol_no(),
            disk_manager: Mutex::new(disk_manager),
            stats: PoolStats::new(),
        }
    }

    /// Volume served by this pool.
    #[inline]
    pub fn vol_no(&self) -> u16 {
        self.vol_no
    }

    // ========================================================================
    // Pin existing pages
    // ========================================================================

    /// Pin a page for reading.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for writing.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Allocate and release pages
    // ========================================================================

    /// Ask the extent allocator for one page placed according to `req`.
    pub fn allocate_page(&self, req: AllocRequest) -> Result<PageId> {
        let pages = self.disk_manager.lock().allocate_pages(req.count(1))?;
        PoolStats::bump(&self.stats.pages_allocated);
        pages
            .first()
            .copied()
            .ok_or(Error::InvalidPageId(PageId::INVALID))
    }

    /// Pin an allocated page as a zero-initialized buffer without reading it
    /// from disk. The returned guard is already dirty.
    pub fn new_page_at(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        if page_id.vol_no != self.vol_no || !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        let cached = self.page_table.read().get(&page_id).copied();
        let frame_id = match cached {
            Some(frame_id) => {
                self.pin_frame(frame_id);
                frame_id
            }
            None => {
                let frame_id = self.get_free_frame()?;
                self.install(frame_id, page_id);
                frame_id
            }
        };

        let mut guard = PageWriteGuard::new(self, frame_id, page_id, self.frames[frame_id.0].page_mut());
        guard.reset();
        Ok(guard)
    }

    /// Allocate a page placed according to `req` and pin it zero-initialized.
    ///
    /// If no frame can be pinned the page goes back to the extent allocator
    /// before the error is returned.
    pub fn new_page_with(&self, req: AllocRequest) -> Result<PageWriteGuard<'_>> {
        let page_id = self.allocate_page(req)?;
        match self.new_page_at(page_id) {
            Ok(guard) => Ok(guard),
            Err(err) => {
                self.disk_manager.lock().deallocate_page(page_id)?;
                PoolStats::bump(&self.stats.pages_deallocated);
                Err(err)
            }
        }
    }

    /// Allocate a page with default placement and pin it zero-initialized.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        self.new_page_with(AllocRequest::new(0))
    }

    /// Drop an unpinned page from the pool without writing it back and return
    /// it to the extent allocator.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        self.delete_page(page_id)?;
        self.disk_manager.lock().deallocate_page(page_id)?;
        PoolStats::bump(&self.stats.pages_deallocated);
        Ok(())
    }

    /// Remove a page from the pool (no write-back). Fails if it is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut pt = self.page_table.write();
        let Some(&frame_id) = pt.get(&page_id) else {
            return Ok(());
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id));
        }

        pt.remove(&page_id);
        drop(pt);

        frame.clear();
        self.replacer.lock().remove(frame_id);
        self.free_list.lock().push(frame_id);
        Ok(())
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Write a page back if it is cached and dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };
        self.flush_frame(frame_id, page_id)
    }

    /// Write back every dirty page and sync the volume file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = self
            .page_table
            .read()
            .iter()
            .map(|(&pid, &fid)| (pid, fid))
            .collect();

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }
        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Number of frames with a non-zero pin count.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    /// Whether the extent allocator considers `page_id` in use.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.disk_manager.lock().is_allocated(page_id)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Called by page guards on drop.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        if self.frames[frame_id.0].unpin(is_dirty) == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    fn pin_frame(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    /// Bind a free frame to `page_id` with one pin.
    fn install(&self, frame_id: FrameId, page_id: PageId) {
        self.frames[frame_id.0].load(page_id);
        self.page_table.write().insert(page_id, frame_id);
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if page_id.vol_no != self.vol_no || !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        let cached = self.page_table.read().get(&page_id).copied();
        if let Some(frame_id) = cached {
            self.pin_frame(frame_id);
            PoolStats::bump(&self.stats.cache_hits);
            return Ok(frame_id);
        }

        PoolStats::bump(&self.stats.cache_misses);
        let frame_id = self.get_free_frame()?;

        let page = match self.disk_manager.lock().read_page(page_id) {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        PoolStats::bump(&self.stats.pages_read);

        self.frames[frame_id.0]
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page.as_slice());
        self.install(frame_id, page_id);
        Ok(frame_id)
    }

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }
        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
        PoolStats::bump(&self.stats.evictions);

        let frame = &self.frames[frame_id.0];
        if let Some(pid) = frame.page_id() {
            self.flush_frame(frame_id, pid)?;
            self.page_table.write().remove(&pid);
            tracing::trace!(
                target: "slotbase::buffer",
                page = pid.page_no,
                frame = frame_id.0,
                "evicted page"
            );
        }
        frame.clear();
        Ok(frame_id)
    }

    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if frame.is_dirty() {
            let page = frame.page();
            self.disk_manager.lock().write_page(page_id, &page)?;
            drop(page);

            frame.clear_dirty();
            PoolStats::bump(&self.stats.pages_written);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db"), 1).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_new_page_ids() {
        let (bpm, _dir) = create_test_bpm(10);
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(1, 0));
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(1, 1));
    }

    #[test]
    fn test_write_then_read() {
        let (bpm, _dir) = create_test_bpm(10);
        let pid = {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[100] = 0xAB;
            guard.page_id()
        };
        assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[100], 0xAB);
    }

    #[test]
    fn test_read_guard_does_not_dirty() {
        let (bpm, _dir) = create_test_bpm(10);
        let pid = bpm.new_page().unwrap().page_id();
        bpm.flush_all_pages().unwrap();
        let written = bpm.stats().snapshot().pages_written;

        drop(bpm.fetch_page_read(pid).unwrap());
        drop(bpm.fetch_page_write(pid).unwrap());
        bpm.flush_all_pages().unwrap();

        assert_eq!(bpm.stats().snapshot().pages_written, written);
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (bpm, _dir) = create_test_bpm(1);
        let pid = {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
            guard.page_id()
        };

        // Only one frame: allocating page 1 evicts page 0.
        drop(bpm.new_page().unwrap());
        assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[0], 0x42);
        assert!(bpm.stats().snapshot().evictions >= 1);
    }

    #[test]
    fn test_no_free_frames() {
        let (bpm, _dir) = create_test_bpm(2);
        let _g1 = bpm.new_page().unwrap();
        let _g2 = bpm.new_page().unwrap();
        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_failed_pin_returns_page_to_allocator() {
        let (bpm, _dir) = create_test_bpm(1);
        let held = bpm.new_page().unwrap();
        let next = PageId::new(1, held.page_id().page_no + 1);

        assert!(matches!(
            bpm.new_page_with(AllocRequest::new(0).near(held.page_id())),
            Err(Error::NoFreeFrames)
        ));
        assert!(!bpm.is_allocated(next));
        drop(held);

        assert_eq!(bpm.new_page().unwrap().page_id(), next);
    }

    #[test]
    fn test_pin_count_tracking() {
        let (bpm, _dir) = create_test_bpm(4);
        let pid = bpm.new_page().unwrap().page_id();
        assert_eq!(bpm.pinned_frame_count(), 0);

        let g1 = bpm.fetch_page_read(pid).unwrap();
        let g2 = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(bpm.pinned_frame_count(), 1);
        assert_eq!(bpm.frames[0].pin_count(), 2);

        drop(g1);
        drop(g2);
        assert_eq!(bpm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_new_page_at_zeroes_cached_page() {
        let (bpm, _dir) = create_test_bpm(4);
        let pid = {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[10] = 0xFF;
            guard.page_id()
        };
        let guard = bpm.new_page_at(pid).unwrap();
        assert_eq!(guard.as_slice()[10], 0);
        assert!(guard.is_dirty());
    }

    #[test]
    fn test_deallocate_page() {
        let (bpm, _dir) = create_test_bpm(4);
        let pid = bpm.new_page().unwrap().page_id();
        assert!(bpm.is_allocated(pid));

        bpm.deallocate_page(pid).unwrap();
        assert!(!bpm.is_allocated(pid));
        assert_eq!(bpm.page_count(), 0);
        assert_eq!(bpm.free_frame_count(), 4);

        let again = bpm.allocate_page(AllocRequest::new(0)).unwrap();
        assert_eq!(again, pid);
    }

    #[test]
    fn test_deallocate_pinned_page_fails() {
        let (bpm, _dir) = create_test_bpm(4);
        let guard = bpm.new_page().unwrap();
        let pid = guard.page_id();
        assert!(matches!(bpm.deallocate_page(pid), Err(Error::PagePinned(_))));
    }

    #[test]
    fn test_foreign_volume_rejected() {
        let (bpm, _dir) = create_test_bpm(4);
        assert!(matches!(
            bpm.fetch_page_read(PageId::new(9, 0)),
            Err(Error::InvalidPageId(_))
        ));
    }

    #[test]
    fn test_missing_page_releases_frame() {
        let (bpm, _dir) = create_test_bpm(2);
        assert!(bpm.fetch_page_read(PageId::new(1, 99)).is_err());
        assert_eq!(bpm.free_frame_count(), 2);
    }
}
