//! Leaf and internal page splits.
//!
//! A split gathers every entry of the full page plus the new one in key
//! order, fills the old (left) page up to half of [`DATA_CAPACITY`], and moves
//! the rest to a page allocated next to it. All fallible work (fetching the
//! sibling, allocating the new page) happens before any byte is rewritten.

use crate::buffer::{BufferPoolManager, PageWriteGuard};
use crate::common::{PageId, Result};
use crate::storage::page::{PageType, Slot, SlottedPage, DATA_CAPACITY, SLOT_SIZE};
use crate::storage::{extent_of, AllocRequest};

use super::insert::InternalItem;
use super::node::{internal_entry_child_no, internal_entry_key, leaf_entry_key, BTreePageExt};

/// Number of leading entries that stay on the left page.
///
/// The left page is filled up to half of [`DATA_CAPACITY`]; the boundary then
/// moves right until the remaining entries fit on one page. The right page
/// always keeps at least one entry.
fn split_point(entries: &[Vec<u8>]) -> usize {
    let sizes: Vec<usize> = entries.iter().map(|e| e.len() + SLOT_SIZE).collect();
    let total: usize = sizes.iter().sum();
    let last = entries.len() - 1;

    let half = DATA_CAPACITY / 2;
    let mut used = 0;
    let mut left = 0;
    for &size in &sizes[..last] {
        if left > 0 && used + size > half {
            break;
        }
        used += size;
        left += 1;
    }
    while left < last && total - used > DATA_CAPACITY {
        used += sizes[left];
        left += 1;
    }
    left.max(1)
}

/// Entries of `page` in slot order with `new_entry` placed at `pos`.
fn gather(page: &PageWriteGuard<'_>, pos: usize, new_entry: Vec<u8>) -> Vec<Vec<u8>> {
    let sp = page.slotted();
    let mut entries: Vec<Vec<u8>> = (0..sp.n_slots()).map(|i| sp.raw_entry(i).to_vec()).collect();
    entries.insert(pos, new_entry);
    entries
}

/// Append `entries` in order as slots `0..entries.len()` of an empty page.
fn fill(sp: &mut SlottedPage<&mut [u8]>, entries: &[Vec<u8>]) {
    for (idx, entry) in entries.iter().enumerate() {
        let offset = sp.append_entry(entry);
        sp.insert_slot_at(idx, Slot::new(offset, 0));
    }
}

fn allocate_sibling<'a>(bpm: &'a BufferPoolManager, of: PageId) -> Result<PageWriteGuard<'a>> {
    let req = AllocRequest::new(extent_of(of.page_no)).near(of);
    bpm.new_page_with(req)
}

/// Split a full leaf while inserting `new_entry` at slot position `pos`.
///
/// Returns the first key of the new right leaf together with its page id.
/// The leaf chain stays doubly linked.
pub(crate) fn split_leaf(
    bpm: &BufferPoolManager,
    page: &mut PageWriteGuard<'_>,
    pos: usize,
    new_entry: Vec<u8>,
) -> Result<InternalItem> {
    let entries = gather(page, pos, new_entry);
    let left_count = split_point(&entries);

    let page_id = page.page_id();
    let file_id = page.slotted().file_id();
    let old_next = page.slotted().next_page();
    let mut next = old_next.map(|p| bpm.fetch_page_write(p)).transpose()?;
    let mut right = allocate_sibling(bpm, page_id)?;
    let right_id = right.page_id();

    let mut rsp = right.slotted_mut();
    rsp.init(PageType::BTreeLeaf, right_id, file_id);
    fill(&mut rsp, &entries[left_count..]);
    rsp.set_prev_page(Some(page_id));
    rsp.set_next_page(old_next);

    let mut lsp = page.slotted_mut();
    lsp.clear_entries();
    fill(&mut lsp, &entries[..left_count]);
    lsp.set_next_page(Some(right_id));

    if let Some(next) = next.as_mut() {
        next.slotted_mut().set_prev_page(Some(right_id));
    }

    tracing::debug!(
        target: "slotbase::index::btree",
        page = page_id.page_no,
        right = right_id.page_no,
        left_entries = left_count,
        right_entries = entries.len() - left_count,
        "split leaf"
    );

    Ok(InternalItem {
        key: leaf_entry_key(&entries[left_count]).to_vec(),
        child: right_id,
    })
}

/// Split a full internal page while inserting `new_entry` at `pos`.
///
/// The separating entry moves up: its key is returned as the promoted key
/// and its child becomes `p0` of the new right page. Neither half keeps it.
pub(crate) fn split_internal(
    bpm: &BufferPoolManager,
    page: &mut PageWriteGuard<'_>,
    pos: usize,
    new_entry: Vec<u8>,
) -> Result<InternalItem> {
    let entries = gather(page, pos, new_entry);
    let sep = split_point(&entries).clamp(1, entries.len().saturating_sub(2).max(1));

    let page_id = page.page_id();
    let file_id = page.slotted().file_id();
    let mut right = allocate_sibling(bpm, page_id)?;
    let right_id = right.page_id();

    let separator = &entries[sep];
    let mut rsp = right.slotted_mut();
    rsp.init(PageType::BTreeInternal, right_id, file_id);
    rsp.set_p0(Some(PageId::new(page_id.vol_no, internal_entry_child_no(separator))));
    fill(&mut rsp, &entries[sep + 1..]);

    let mut lsp = page.slotted_mut();
    lsp.clear_entries();
    fill(&mut lsp, &entries[..sep]);

    tracing::debug!(
        target: "slotbase::index::btree",
        page = page_id.page_no,
        right = right_id.page_no,
        left_entries = sep,
        right_entries = entries.len() - sep - 1,
        "split internal"
    );

    Ok(InternalItem {
        key: internal_entry_key(separator).to_vec(),
        child: right_id,
    })
}
