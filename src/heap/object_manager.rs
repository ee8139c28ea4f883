//! Object Manager - creates, reads and destroys records in slotted heap pages.
//!
//! # Placement
//! A new object of `n` bytes needs `8 + aligned(n) + SLOT_SIZE` bytes. Without
//! a near hint, candidate pages are tried in order:
//! 1. a page from the file's avail-space buckets,
//! 2. the file's last page,
//! 3. a fresh page appended to the file.
//!
//! With a near hint the hint's own page is tried first; otherwise a fresh
//! page is allocated next to it and spliced into the page list right after
//! it. The chosen page is always compacted before the object is written.

use crate::buffer::{BufferPoolManager, PageWriteGuard};
use crate::catalog::{Catalog, DataFileEntry};
use crate::common::config::aligned_len;
use crate::common::{Error, FileId, ObjectId, PageId, Result};
use crate::storage::page::{PageType, Slot, SlottedPage, SLOT_SIZE};
use crate::storage::AllocRequest;

use super::dealloc::DeallocList;
use super::object::{
    compact_page, encode_object, object_entry_len, ObjectHeader, MAX_OBJECT_LEN,
    OBJECT_HEADER_SIZE,
};

type Neighbours<'a> = (Option<PageWriteGuard<'a>>, Option<PageWriteGuard<'a>>);

/// Record heap manager over one buffer pool.
pub struct ObjectManager<'a> {
    bpm: &'a BufferPoolManager,
    catalog: Catalog,
}

impl<'a> ObjectManager<'a> {
    pub fn new(bpm: &'a BufferPoolManager) -> Self {
        Self::with_catalog(bpm, Catalog::new())
    }

    pub fn with_catalog(bpm: &'a BufferPoolManager, catalog: Catalog) -> Self {
        Self { bpm, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// Allocate and format the first page of a new data file and register it
    /// in the catalog with extent fill factor `eff`.
    ///
    /// # Errors
    /// `Error::InvalidCatalogReference` if `file_id` is already registered.
    pub fn create_file(&mut self, file_id: FileId, eff: u8) -> Result<PageId> {
        if self.catalog.contains(file_id) {
            return Err(Error::InvalidCatalogReference(file_id));
        }

        let req = AllocRequest::new(0).fill_factor(eff);
        let mut guard = self.bpm.new_page_with(req)?;
        let page_id = guard.page_id();
        guard
            .slotted_mut()
            .init(PageType::Slotted, page_id, file_id);

        let mut entry = DataFileEntry::new(file_id, page_id, req.fill_factor);
        entry.avail.insert(page_id, guard.slotted().free_percent());
        self.catalog.register(entry);

        tracing::debug!(
            target: "slotbase::heap",
            file = file_id.0,
            first_page = page_id.page_no,
            "created data file"
        );
        Ok(page_id)
    }

    /// Store a new object in `file_id` and return its id.
    ///
    /// # Errors
    /// - `Error::InvalidCatalogReference` if the file is unknown
    /// - `Error::ObjectTooLarge` if the aligned payload exceeds a page
    /// - `Error::InvalidObjectReference` / `Error::StaleReference` if `near`
    ///   does not name a live object of this file
    pub fn create_object(
        &mut self,
        file_id: FileId,
        near: Option<&ObjectId>,
        header: ObjectHeader,
        data: &[u8],
    ) -> Result<ObjectId> {
        if aligned_len(data.len()) > MAX_OBJECT_LEN {
            return Err(Error::ObjectTooLarge {
                len: data.len(),
                max: MAX_OBJECT_LEN,
            });
        }
        let needed = OBJECT_HEADER_SIZE + aligned_len(data.len()) + SLOT_SIZE;

        let bpm = self.bpm;
        let entry = self.catalog.get_mut(file_id)?;
        let mut guard = match near {
            None => Self::select_page(bpm, entry, needed)?,
            Some(near) => Self::select_page_near(bpm, entry, near, needed)?,
        };
        let page_id = guard.page_id();
        entry.avail.remove(page_id);

        compact_page(&mut guard);
        let mut sp = guard.slotted_mut();
        let offset = sp.append_entry(&encode_object(header, data));
        let unique = sp.next_unique();
        let slot = Slot::new(offset, unique);
        let slot_no = match sp.lowest_empty_slot() {
            Some(idx) => {
                sp.set_slot(idx, slot);
                idx
            }
            None => {
                let idx = sp.n_slots();
                sp.insert_slot_at(idx, slot);
                idx
            }
        };
        entry.avail.insert(page_id, sp.free_percent());

        let oid = ObjectId::new(page_id, slot_no as u16, unique);
        tracing::debug!(target: "slotbase::heap", file = file_id.0, %oid, len = data.len(), "created object");
        Ok(oid)
    }

    /// Remove the object `oid` from `file_id`.
    ///
    /// If the page is left empty and is not the file's first page it is
    /// unlinked from the page list and pushed onto `dealloc`. Every page the
    /// unlink touches is pinned before the object is removed, so a failed
    /// call leaves the file unchanged.
    pub fn destroy_object(
        &mut self,
        file_id: FileId,
        oid: &ObjectId,
        dealloc: &mut DeallocList,
    ) -> Result<()> {
        let bpm = self.bpm;
        let entry = self.catalog.get_mut(file_id)?;
        let mut guard = Self::fetch_object_page(bpm, oid)?;
        let slot = locate(&guard.slotted(), file_id, oid)?;
        let page_id = guard.page_id();

        let empties = guard.slotted().live_slots() == 1 && page_id != entry.first_page;
        let neighbours = if empties {
            Some(Self::pin_neighbours(bpm, &guard)?)
        } else {
            None
        };

        entry.avail.remove(page_id);
        let mut sp = guard.slotted_mut();
        let len = object_entry_len(sp.data_at(slot.offset));
        sp.set_slot(oid.slot_no as usize, Slot::EMPTY);
        if slot.offset as usize + len == sp.free() {
            let free = sp.free() - len;
            sp.set_free(free);
        } else {
            let unused = sp.unused() + len;
            sp.set_unused(unused);
        }
        sp.trim_empty_slots();

        tracing::debug!(target: "slotbase::heap", file = file_id.0, %oid, "destroyed object");

        match neighbours {
            Some((prev, next)) => {
                Self::unlink_page(entry, &mut guard, prev, next);
                dealloc.push_page(file_id, page_id);
                tracing::debug!(
                    target: "slotbase::heap",
                    file = file_id.0,
                    page = page_id.page_no,
                    "page emptied; deferred deallocation"
                );
            }
            None => {
                entry.avail.insert(page_id, guard.slotted().free_percent());
            }
        }
        Ok(())
    }

    /// Read back the header and payload of `oid`.
    pub fn read_object(&self, file_id: FileId, oid: &ObjectId) -> Result<(ObjectHeader, Vec<u8>)> {
        self.catalog.get(file_id)?;
        if oid.vol_no != self.bpm.vol_no() || !oid.page_id().is_valid() {
            return Err(Error::InvalidObjectReference(*oid));
        }
        let guard = self.bpm.fetch_page_read(oid.page_id())?;
        let sp = guard.slotted();
        let slot = locate(&sp, file_id, oid)?;

        let raw = sp.data_at(slot.offset);
        let header = ObjectHeader::from_bytes(raw);
        let start = OBJECT_HEADER_SIZE;
        Ok((header, raw[start..start + header.length as usize].to_vec()))
    }

    /// Compact one page of `file_id` in place.
    pub fn compact_page(&self, file_id: FileId, page_id: PageId) -> Result<()> {
        self.catalog.get(file_id)?;
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        check_owner(&guard.slotted(), file_id)?;
        compact_page(&mut guard);
        Ok(())
    }

    /// Pages of `file_id` in page-list order.
    pub fn file_pages(&self, file_id: FileId) -> Result<Vec<PageId>> {
        let entry = self.catalog.get(file_id)?;
        let mut pages = Vec::new();
        let mut cursor = Some(entry.first_page);
        while let Some(page_id) = cursor {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let sp = guard.slotted();
            check_owner(&sp, file_id)?;
            pages.push(page_id);
            cursor = sp.next_page();
        }
        Ok(pages)
    }

    // ========================================================================
    // Placement
    // ========================================================================

    fn select_page(
        bpm: &'a BufferPoolManager,
        entry: &mut DataFileEntry,
        needed: usize,
    ) -> Result<PageWriteGuard<'a>> {
        if let Some(page_id) = entry.avail.find(needed) {
            let guard = bpm.fetch_page_write(page_id)?;
            check_owner(&guard.slotted(), entry.file_id)?;
            if guard.slotted().free_space() >= needed {
                return Ok(guard);
            }
        }

        let mut last = bpm.fetch_page_write(entry.last_page)?;
        if last.slotted().free_space() >= needed {
            return Ok(last);
        }

        let req = AllocRequest::new(entry.first_extent()).fill_factor(entry.eff);
        Self::allocate_after(bpm, entry, &mut last, req)
    }

    fn select_page_near(
        bpm: &'a BufferPoolManager,
        entry: &mut DataFileEntry,
        near: &ObjectId,
        needed: usize,
    ) -> Result<PageWriteGuard<'a>> {
        let mut hint = Self::fetch_object_page(bpm, near)?;
        locate(&hint.slotted(), entry.file_id, near)?;
        if hint.slotted().free_space() >= needed {
            return Ok(hint);
        }

        let req = AllocRequest::new(entry.first_extent())
            .near(near.page_id())
            .fill_factor(entry.eff);
        Self::allocate_after(bpm, entry, &mut hint, req)
    }

    /// Allocate and format a page, then splice it into the page list right
    /// after `prev`.
    fn allocate_after(
        bpm: &'a BufferPoolManager,
        entry: &mut DataFileEntry,
        prev: &mut PageWriteGuard<'a>,
        req: AllocRequest,
    ) -> Result<PageWriteGuard<'a>> {
        let next = prev.slotted().next_page();
        let mut next_guard = next.map(|p| bpm.fetch_page_write(p)).transpose()?;

        let mut guard = bpm.new_page_with(req)?;
        let page_id = guard.page_id();
        let mut sp = guard.slotted_mut();
        sp.init(PageType::Slotted, page_id, entry.file_id);
        sp.set_prev_page(Some(prev.page_id()));
        sp.set_next_page(next);

        prev.slotted_mut().set_next_page(Some(page_id));
        match next_guard.as_mut() {
            Some(next) => next.slotted_mut().set_prev_page(Some(page_id)),
            None => entry.last_page = page_id,
        }

        tracing::debug!(
            target: "slotbase::heap",
            file = entry.file_id.0,
            page = page_id.page_no,
            after = prev.page_id().page_no,
            "added page to file"
        );
        Ok(guard)
    }

    /// Pin the pages before and after `page` in the file's page list.
    fn pin_neighbours(
        bpm: &'a BufferPoolManager,
        page: &PageWriteGuard<'a>,
    ) -> Result<Neighbours<'a>> {
        let (prev, next) = {
            let sp = page.slotted();
            (sp.prev_page(), sp.next_page())
        };
        let prev = prev.map(|p| bpm.fetch_page_write(p)).transpose()?;
        let next = next.map(|p| bpm.fetch_page_write(p)).transpose()?;
        Ok((prev, next))
    }

    /// Remove `victim` from the file's page list; `prev` and `next` are its
    /// pinned neighbours.
    fn unlink_page(
        entry: &mut DataFileEntry,
        victim: &mut PageWriteGuard<'_>,
        mut prev: Option<PageWriteGuard<'_>>,
        mut next: Option<PageWriteGuard<'_>>,
    ) {
        let prev_id = prev.as_ref().map(|g| g.page_id());
        let next_id = next.as_ref().map(|g| g.page_id());

        match prev.as_mut() {
            Some(g) => g.slotted_mut().set_next_page(next_id),
            None => {
                if let Some(next_id) = next_id {
                    entry.first_page = next_id;
                }
            }
        }
        match next.as_mut() {
            Some(g) => g.slotted_mut().set_prev_page(prev_id),
            None => {
                if let Some(prev_id) = prev_id {
                    entry.last_page = prev_id;
                }
            }
        }

        let mut sp = victim.slotted_mut();
        sp.set_prev_page(None);
        sp.set_next_page(None);
    }

    fn fetch_object_page(bpm: &'a BufferPoolManager, oid: &ObjectId) -> Result<PageWriteGuard<'a>> {
        if oid.vol_no != bpm.vol_no() || !oid.page_id().is_valid() {
            return Err(Error::InvalidObjectReference(*oid));
        }
        bpm.fetch_page_write(oid.page_id())
    }
}

fn check_owner<B: AsRef<[u8]>>(sp: &SlottedPage<B>, file_id: FileId) -> Result<()> {
    if sp.page_type() != PageType::Slotted {
        return Err(Error::CorruptPage {
            page_id: sp.page_id(),
            page_type: sp.page_type() as u8,
        });
    }
    if sp.file_id() != file_id {
        return Err(Error::InvalidCatalogReference(file_id));
    }
    Ok(())
}

/// Resolve `oid` to its live slot on `sp`.
fn locate<B: AsRef<[u8]>>(sp: &SlottedPage<B>, file_id: FileId, oid: &ObjectId) -> Result<Slot> {
    if sp.page_type() != PageType::Slotted || sp.file_id() != file_id {
        return Err(Error::InvalidObjectReference(*oid));
    }
    let idx = oid.slot_no as usize;
    if idx >= sp.n_slots() {
        return Err(Error::InvalidObjectReference(*oid));
    }
    let slot = sp.slot(idx);
    if slot.is_empty() {
        return Err(Error::InvalidObjectReference(*oid));
    }
    if slot.unique != oid.unique {
        return Err(Error::StaleReference {
            oid: *oid,
            current: slot.unique,
        });
    }
    Ok(slot)
}
