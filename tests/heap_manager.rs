//! Integration tests for the record heap: placement, destruction, stale
//! references and deferred deallocation.

use slotbase::buffer::BufferPoolManager;
use slotbase::common::{Error, FileId, ObjectId};
use slotbase::heap::{DeallocList, ObjectHeader, ObjectManager};
use slotbase::storage::page::DATA_CAPACITY;
use slotbase::storage::DiskManager;
use tempfile::tempdir;

const F: FileId = FileId(1);

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let dm = DiskManager::create(dir.path().join("heap.db"), 1).unwrap();
    (BufferPoolManager::new(pool_size, dm), dir)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Three small objects share a page; destroying two that are not in the
/// last slot grows `unused` and leaves `free` alone.
#[test]
fn test_small_objects_share_page_and_leave_holes() {
    init_tracing();
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    let first = om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let sizes = [40usize, 100, 120];
    assert!(sizes.iter().sum::<usize>() < DATA_CAPACITY / 10);
    let oids: Vec<ObjectId> = sizes
        .iter()
        .map(|&n| om.create_object(F, None, ObjectHeader::default(), &vec![0x5A; n]).unwrap())
        .collect();
    assert!(oids.iter().all(|oid| oid.page_id() == first));

    let (free_before, unused_before) = {
        let guard = bpm.fetch_page_read(first).unwrap();
        (guard.slotted().free(), guard.slotted().unused())
    };

    om.destroy_object(F, &oids[0], &mut dealloc).unwrap();
    om.destroy_object(F, &oids[1], &mut dealloc).unwrap();

    let guard = bpm.fetch_page_read(first).unwrap();
    let sp = guard.slotted();
    assert_eq!(sp.free(), free_before);
    assert_eq!(sp.unused(), unused_before + (8 + 40) + (8 + 100));
    drop(guard);

    assert_eq!(om.file_pages(F).unwrap(), vec![first]);
    assert!(dealloc.is_empty());
    assert_eq!(om.read_object(F, &oids[2]).unwrap().1, vec![0x5A; 120]);
}

/// Destroying the only object on a non-first page unlinks the page and
/// schedules it for deallocation exactly once.
#[test]
fn test_empty_non_first_page_is_deferred() {
    init_tracing();
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    let first = om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let big = vec![1u8; 3000];
    let a = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    let b = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    assert_eq!(a.page_id(), first);
    let second = b.page_id();
    assert_ne!(second, first);
    assert_eq!(om.file_pages(F).unwrap(), vec![first, second]);

    om.destroy_object(F, &b, &mut dealloc).unwrap();

    assert_eq!(om.file_pages(F).unwrap(), vec![first]);
    assert_eq!(om.catalog().get(F).unwrap().last_page, first);
    assert_eq!(dealloc.pages().filter(|&p| p == second).count(), 1);
    assert!(!om.catalog().get(F).unwrap().avail.contains(second));

    // Not freed until the deferred pass runs.
    assert!(bpm.is_allocated(second));
    assert_eq!(dealloc.release(&bpm).unwrap(), 1);
    assert!(!bpm.is_allocated(second));
    assert_eq!(bpm.pinned_frame_count(), 0);
}

/// When a neighbour of the emptied page cannot be pinned, the destroy fails
/// before anything changes and can be retried.
#[test]
fn test_failed_unlink_leaves_file_unchanged() {
    let (bpm, _dir) = create_bpm(4);
    let mut om = ObjectManager::new(&bpm);
    let first = om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let big = vec![4u8; 3000];
    om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    let b = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    let second = b.page_id();
    assert_ne!(second, first);
    let listed = om.catalog().get(F).unwrap().avail.contains(second);

    let held: Vec<_> = (0..3).map(|_| bpm.new_page().unwrap()).collect();
    assert!(matches!(
        om.destroy_object(F, &b, &mut dealloc),
        Err(Error::NoFreeFrames)
    ));
    drop(held);

    assert_eq!(om.read_object(F, &b).unwrap().1, big);
    assert_eq!(om.file_pages(F).unwrap(), vec![first, second]);
    assert_eq!(om.catalog().get(F).unwrap().avail.contains(second), listed);
    assert!(dealloc.is_empty());

    om.destroy_object(F, &b, &mut dealloc).unwrap();
    assert_eq!(om.file_pages(F).unwrap(), vec![first]);
    assert!(dealloc.contains(second));
    assert_eq!(bpm.pinned_frame_count(), 0);
}

/// Unlinking a page in the middle of the list keeps both neighbours linked.
#[test]
fn test_unlink_middle_page() {
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    let first = om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let big = vec![2u8; 3000];
    let oids: Vec<ObjectId> = (0..3)
        .map(|_| om.create_object(F, None, ObjectHeader::default(), &big).unwrap())
        .collect();
    let pages: Vec<_> = oids.iter().map(|o| o.page_id()).collect();
    assert_eq!(om.file_pages(F).unwrap(), pages);
    assert_eq!(pages[0], first);

    om.destroy_object(F, &oids[1], &mut dealloc).unwrap();
    assert_eq!(om.file_pages(F).unwrap(), vec![pages[0], pages[2]]);
    assert_eq!(om.catalog().get(F).unwrap().last_page, pages[2]);
    assert!(dealloc.contains(pages[1]));
}

/// Slot reuse yields a new stamp and the old id is rejected.
#[test]
fn test_stale_reference_after_slot_reuse() {
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let old = om.create_object(F, None, ObjectHeader::default(), b"old").unwrap();
    om.create_object(F, None, ObjectHeader::default(), b"keep").unwrap();
    om.destroy_object(F, &old, &mut dealloc).unwrap();
    let new = om.create_object(F, None, ObjectHeader::default(), b"new").unwrap();

    assert_eq!((new.page_id(), new.slot_no), (old.page_id(), old.slot_no));
    assert_ne!(new.unique, old.unique);
    assert!(matches!(
        om.destroy_object(F, &old, &mut dealloc),
        Err(Error::StaleReference { .. })
    ));
    assert_eq!(om.read_object(F, &new).unwrap().1, b"new");
}

/// Object ids from another file or past the slot array are rejected.
#[test]
fn test_invalid_references() {
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    om.create_file(F, 100).unwrap();
    om.create_file(FileId(2), 100).unwrap();
    let mut dealloc = DeallocList::new();

    let oid = om.create_object(F, None, ObjectHeader::default(), b"x").unwrap();
    assert!(matches!(
        om.read_object(FileId(2), &oid),
        Err(Error::InvalidObjectReference(_))
    ));

    let past_end = ObjectId { slot_no: 9, ..oid };
    assert!(matches!(
        om.destroy_object(F, &past_end, &mut dealloc),
        Err(Error::InvalidObjectReference(_))
    ));
    assert!(matches!(
        om.destroy_object(FileId(3), &oid, &mut dealloc),
        Err(Error::InvalidCatalogReference(FileId(3)))
    ));
}

/// Freed space is found again through the avail buckets.
#[test]
fn test_avail_bucket_reuse() {
    let (bpm, _dir) = create_bpm(8);
    let mut om = ObjectManager::new(&bpm);
    let first = om.create_file(F, 100).unwrap();
    let mut dealloc = DeallocList::new();

    let big = vec![3u8; 1800];
    let a = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    let b = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    let c = om.create_object(F, None, ObjectHeader::default(), &big).unwrap();
    assert_eq!((a.page_id(), b.page_id()), (first, first));
    assert_ne!(c.page_id(), first);

    // Make room on the first page again; small objects go there before
    // the tail page.
    om.destroy_object(F, &a, &mut dealloc).unwrap();
    let avail = &om.catalog().get(F).unwrap().avail;
    assert!(avail.contains(first));

    let d = om.create_object(F, None, ObjectHeader::default(), &[9u8; 64]).unwrap();
    assert_eq!(d.page_id(), first);
    assert_eq!(d.slot_no, a.slot_no);
}
