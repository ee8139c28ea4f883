//! Recursive key insertion.
//!
//! [`insert_key`] descends from a page to the covering leaf, holding a write
//! guard on every page along the path. When a child splits, the promoted
//! item is inserted into the parent, which may split in turn. A split of the
//! page passed to `insert_key` is reported to the caller, which is
//! responsible for growing the tree.
//!
//! Guards only dirty a page when it is actually changed, so a rejected
//! insertion leaves every page byte-identical and clean.

use crate::buffer::{BufferPoolManager, PageWriteGuard};
use crate::common::{Error, ObjectId, PageId, Result};
use crate::storage::page::{PageType, Slot, SLOT_SIZE};

use super::key::{KeyDesc, KeyValue};
use super::node::{
    check_btree_page, child_for, encode_internal_entry, encode_leaf_entry, internal_entry_len,
    leaf_entry_len, search_internal, search_leaf,
};
use super::split::{split_internal, split_leaf};

/// Key and child page promoted to the parent after a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalItem {
    pub key: Vec<u8>,
    pub child: PageId,
}

/// Key and object reference to be stored in a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafItem {
    pub key: Vec<u8>,
    pub oid: ObjectId,
}

/// Result of inserting into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry fit; the parent needs no change.
    Inserted,
    /// The page split; the parent must take the promoted item.
    Split(InternalItem),
}

/// Insert `key -> oid` into the subtree rooted at `root`.
///
/// # Errors
/// - `Error::UnsupportedKeyType` if `desc` has a part other than `Int` or
///   `VarString`; no page is touched
/// - `Error::KeyTooLarge` if the encoded key exceeds the maximum key length
/// - `Error::DuplicateKey` if the key is already present
/// - `Error::CorruptPage` if a page on the path is not a B-tree page
pub fn insert_key(
    bpm: &BufferPoolManager,
    root: PageId,
    desc: &KeyDesc,
    key: &KeyValue,
    oid: &ObjectId,
) -> Result<InsertOutcome> {
    desc.validate()?;
    key.check_len()?;

    let item = LeafItem {
        key: key.as_bytes().to_vec(),
        oid: *oid,
    };
    insert_into(bpm, root, desc, &item)
}

fn insert_into(
    bpm: &BufferPoolManager,
    page_id: PageId,
    desc: &KeyDesc,
    item: &LeafItem,
) -> Result<InsertOutcome> {
    let mut page = bpm.fetch_page_write(page_id)?;
    if check_btree_page(&page.slotted())? == PageType::BTreeLeaf {
        return insert_leaf(bpm, &mut page, desc, item);
    }

    let child = child_for(&page.slotted(), desc, &item.key)?;
    match insert_into(bpm, child, desc, item)? {
        InsertOutcome::Inserted => Ok(InsertOutcome::Inserted),
        InsertOutcome::Split(promoted) => {
            let pos = search_internal(&page.slotted(), desc, &promoted.key).map_or(0, |idx| idx + 1);
            insert_internal(bpm, &mut page, &promoted, pos)
        }
    }
}

/// Insert `item` into a leaf, splitting it when the entry does not fit.
pub fn insert_leaf(
    bpm: &BufferPoolManager,
    page: &mut PageWriteGuard<'_>,
    desc: &KeyDesc,
    item: &LeafItem,
) -> Result<InsertOutcome> {
    let pos = match search_leaf(&page.slotted(), desc, &item.key) {
        Ok(_) => return Err(Error::DuplicateKey),
        Err(pos) => pos,
    };

    let entry = encode_leaf_entry(&item.key, &item.oid);
    if page.slotted().free_space() < entry.len() + SLOT_SIZE {
        return split_leaf(bpm, page, pos, entry).map(InsertOutcome::Split);
    }

    let mut sp = page.slotted_mut();
    sp.compact(leaf_entry_len);
    let offset = sp.append_entry(&entry);
    sp.insert_slot_at(pos, Slot::new(offset, 0));
    Ok(InsertOutcome::Inserted)
}

/// Insert a promoted `item` into an internal page at slot position `pos`,
/// splitting the page when the entry does not fit.
pub fn insert_internal(
    bpm: &BufferPoolManager,
    page: &mut PageWriteGuard<'_>,
    item: &InternalItem,
    pos: usize,
) -> Result<InsertOutcome> {
    let entry = encode_internal_entry(item.child, &item.key);
    if page.slotted().free_space() < entry.len() + SLOT_SIZE {
        return split_internal(bpm, page, pos, entry).map(InsertOutcome::Split);
    }

    let mut sp = page.slotted_mut();
    sp.compact(internal_entry_len);
    let offset = sp.append_entry(&entry);
    sp.insert_slot_at(pos, Slot::new(offset, 0));
    Ok(InsertOutcome::Inserted)
}
