//! Integration tests for the page store: buffer pool, guards and the extent
//! allocator working against a real volume file.

use slotbase::buffer::BufferPoolManager;
use slotbase::common::{Error, FileId, PageId};
use slotbase::storage::page::PageType;
use slotbase::storage::{AllocRequest, DiskManager};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let dm = DiskManager::create(dir.path().join("test.db"), 1).unwrap();
    (BufferPoolManager::new(pool_size, dm), dir)
}

/// Data survives several eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, _dir) = create_bpm(2);

    let mut page_ids = vec![];
    for i in 0u8..5 {
        let mut guard = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[1] = i.wrapping_mul(3);
        page_ids.push(guard.page_id());
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], i as u8);
        assert_eq!(guard.as_slice()[1], (i as u8).wrapping_mul(3));
    }
}

/// Slotted pages written in one session are read back, checksums intact,
/// in the next.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let pid = {
        let bpm = BufferPoolManager::new(4, DiskManager::create(&path, 1).unwrap());
        let mut guard = bpm.new_page().unwrap();
        let pid = guard.page_id();
        let mut sp = guard.slotted_mut();
        sp.init(PageType::Slotted, pid, FileId(7));
        sp.append_entry(b"persistent!");
        drop(guard);
        bpm.flush_all_pages().unwrap();
        pid
    };

    let bpm = BufferPoolManager::new(4, DiskManager::open(&path, 1).unwrap());
    let guard = bpm.fetch_page_read(pid).unwrap();
    let sp = guard.slotted();
    assert_eq!(sp.file_id(), FileId(7));
    assert_eq!(&sp.data_at(0)[..11], b"persistent!");
}

/// A pinned page is never chosen for eviction.
#[test]
fn test_pinned_page_not_evicted() {
    let (bpm, _dir) = create_bpm(2);

    let mut held = bpm.new_page().unwrap();
    held.as_mut_slice()[0] = 0xAA;
    let held_id = held.page_id();

    for _ in 0..4 {
        drop(bpm.new_page().unwrap());
    }
    assert_eq!(held.as_slice()[0], 0xAA);
    assert_eq!(held.page_id(), held_id);
    drop(held);

    assert_eq!(bpm.fetch_page_read(held_id).unwrap().as_slice()[0], 0xAA);
}

/// Pages allocated with a near hint stay in the hint's extent while it has room.
#[test]
fn test_near_allocation_through_pool() {
    let (bpm, _dir) = create_bpm(4);

    let pages: Vec<PageId> = (0..20).map(|_| bpm.new_page().unwrap().page_id()).collect();
    bpm.deallocate_page(pages[3]).unwrap();
    bpm.deallocate_page(pages[18]).unwrap();

    let near = bpm
        .allocate_page(AllocRequest::new(0).near(pages[17]))
        .unwrap();
    assert_eq!(near, pages[18]);

    let any = bpm.allocate_page(AllocRequest::new(0)).unwrap();
    assert_eq!(any, pages[3]);
}

/// Guards release their pins on early return.
#[test]
fn test_pins_released_on_error_path() {
    let (bpm, _dir) = create_bpm(2);

    fn touch_then_fail(bpm: &BufferPoolManager, pid: PageId) -> slotbase::Result<()> {
        let _guard = bpm.fetch_page_write(pid)?;
        bpm.fetch_page_read(PageId::new(1, 999))?;
        Ok(())
    }

    let pid = bpm.new_page().unwrap().page_id();
    assert!(matches!(touch_then_fail(&bpm, pid), Err(Error::PageNotFound(_))));
    assert_eq!(bpm.pinned_frame_count(), 0);
}

/// Concurrent readers on shared pages.
#[test]
fn test_concurrent_readers() {
    let (bpm, _dir) = create_bpm(8);
    let bpm = Arc::new(bpm);

    let pids: Vec<PageId> = (0u8..4)
        .map(|i| {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
            guard.page_id()
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bpm = Arc::clone(&bpm);
            let pids = pids.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    for (i, &pid) in pids.iter().enumerate() {
                        assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[0], i as u8);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(bpm.pinned_frame_count(), 0);
    assert!(bpm.stats().snapshot().cache_hits > 0);
}
