//! B+-tree handle: root tracking, root growth, lookup and ordered scan.

use crate::buffer::BufferPoolManager;
use crate::common::{FileId, ObjectId, PageId, Result};
use crate::storage::page::{PageType, Slot};
use crate::storage::{extent_of, AllocRequest};

use super::insert::{insert_key, InsertOutcome, InternalItem};
use super::key::{KeyDesc, KeyValue};
use super::node::{check_btree_page, child_for, encode_internal_entry, search_leaf, BTreePageExt};

/// A B+-tree index stored in slotted pages of one buffer pool.
///
/// Pages on the insertion path stay pinned until the insert returns, and a
/// split pins two more, so the pool must hold at least `height + 3` frames.
///
/// # Example
/// ```no_run
/// use slotbase::buffer::BufferPoolManager;
/// use slotbase::common::{FileId, ObjectId, PageId};
/// use slotbase::index::btree::{BTreeIndex, KeyDesc, KeyValue};
/// use slotbase::storage::DiskManager;
///
/// let bpm = BufferPoolManager::new(16, DiskManager::create("index.db", 1).unwrap());
/// let mut index = BTreeIndex::create(&bpm, FileId(2), KeyDesc::int()).unwrap();
/// let oid = ObjectId::new(PageId::new(1, 0), 0, 1);
/// index.insert(&KeyValue::int(42), &oid).unwrap();
/// assert_eq!(index.lookup(&KeyValue::int(42)).unwrap(), Some(oid));
/// ```
pub struct BTreeIndex<'a> {
    bpm: &'a BufferPoolManager,
    file_id: FileId,
    desc: KeyDesc,
    root: PageId,
}

impl<'a> BTreeIndex<'a> {
    /// Create an empty index whose root is a fresh leaf.
    pub fn create(bpm: &'a BufferPoolManager, file_id: FileId, desc: KeyDesc) -> Result<Self> {
        desc.validate()?;
        let mut guard = bpm.new_page_with(AllocRequest::new(0))?;
        let root = guard.page_id();
        guard.slotted_mut().init(PageType::BTreeLeaf, root, file_id);
        drop(guard);

        tracing::debug!(
            target: "slotbase::index::btree",
            file = file_id.0,
            root = root.page_no,
            "created index"
        );
        Ok(Self {
            bpm,
            file_id,
            desc,
            root,
        })
    }

    /// Attach to an existing tree rooted at `root`.
    pub fn open(bpm: &'a BufferPoolManager, file_id: FileId, desc: KeyDesc, root: PageId) -> Self {
        Self {
            bpm,
            file_id,
            desc,
            root,
        }
    }

    #[inline]
    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn key_desc(&self) -> &KeyDesc {
        &self.desc
    }

    /// Insert `key -> oid`, adding a level when the root splits.
    pub fn insert(&mut self, key: &KeyValue, oid: &ObjectId) -> Result<()> {
        match insert_key(self.bpm, self.root, &self.desc, key, oid)? {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Split(item) => self.grow(item),
        }
    }

    /// Replace the root by a new internal page over the old root and the
    /// promoted item.
    fn grow(&mut self, item: InternalItem) -> Result<()> {
        let old_root = self.root;
        let req = AllocRequest::new(extent_of(old_root.page_no)).near(old_root);
        let mut guard = self.bpm.new_page_with(req)?;
        let new_root = guard.page_id();
        let mut sp = guard.slotted_mut();
        sp.init(PageType::BTreeInternal, new_root, self.file_id);
        sp.set_p0(Some(old_root));
        let offset = sp.append_entry(&encode_internal_entry(item.child, &item.key));
        sp.insert_slot_at(0, Slot::new(offset, 0));
        self.root = new_root;

        tracing::debug!(
            target: "slotbase::index::btree",
            old_root = old_root.page_no,
            new_root = new_root.page_no,
            "root split; tree grew one level"
        );
        Ok(())
    }

    /// Object stored under `key`, if any.
    pub fn lookup(&self, key: &KeyValue) -> Result<Option<ObjectId>> {
        let leaf = self.find_leaf(key.as_bytes())?;
        let guard = self.bpm.fetch_page_read(leaf)?;
        let sp = guard.slotted();
        let found = search_leaf(&sp, &self.desc, key.as_bytes()).ok();
        Ok(found.map(|idx| sp.leaf_oid(idx)))
    }

    /// Every entry in ascending key order, following the leaf chain.
    pub fn scan(&self) -> Result<Vec<(KeyValue, ObjectId)>> {
        let mut out = Vec::new();
        let mut cursor = Some(self.leftmost_leaf()?);
        while let Some(page_id) = cursor {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let sp = guard.slotted();
            for idx in 0..sp.n_slots() {
                out.push((KeyValue::from_bytes(sp.leaf_key(idx).to_vec()), sp.leaf_oid(idx)));
            }
            cursor = sp.next_page();
        }
        Ok(out)
    }

    /// Number of levels, counting the leaf level.
    pub fn height(&self) -> Result<usize> {
        let mut height = 1;
        let mut page_id = self.root;
        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let sp = guard.slotted();
            if check_btree_page(&sp)? == PageType::BTreeLeaf {
                return Ok(height);
            }
            page_id = child_or_corrupt(sp.p0(), page_id)?;
            height += 1;
        }
    }

    fn find_leaf(&self, key: &[u8]) -> Result<PageId> {
        let mut page_id = self.root;
        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let sp = guard.slotted();
            if check_btree_page(&sp)? == PageType::BTreeLeaf {
                return Ok(page_id);
            }
            page_id = child_for(&sp, &self.desc, key)?;
        }
    }

    fn leftmost_leaf(&self) -> Result<PageId> {
        let mut page_id = self.root;
        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let sp = guard.slotted();
            if check_btree_page(&sp)? == PageType::BTreeLeaf {
                return Ok(page_id);
            }
            page_id = child_or_corrupt(sp.p0(), page_id)?;
        }
    }
}

fn child_or_corrupt(child: Option<PageId>, page_id: PageId) -> Result<PageId> {
    child.ok_or(crate::common::Error::CorruptPage {
        page_id,
        page_type: PageType::BTreeInternal as u8,
    })
}
