//! Disk Manager - file I/O and extent allocation for one volume.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing checksummed pages
//! - Allocating pages extent by extent, honoring fill factors and near hints
//! - Returning pages to the free pool

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{EXTENT_SIZE, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

/// Placement request for [`DiskManager::allocate_pages`].
///
/// # Example
/// ```
/// use slotbase::storage::AllocRequest;
/// use slotbase::PageId;
///
/// let req = AllocRequest::new(0).near(PageId::new(1, 5)).fill_factor(80);
/// assert_eq!(req.count, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRequest {
    /// First extent to consider when reusing free pages.
    pub extent_hint: u32,
    /// Prefer a page in the same extent as this one.
    pub near: Option<PageId>,
    /// Percent of each extent that may be allocated (1..=100).
    pub fill_factor: u8,
    /// Number of pages wanted.
    pub count: usize,
}

impl AllocRequest {
    pub fn new(extent_hint: u32) -> Self {
        Self {
            extent_hint,
            near: None,
            fill_factor: 100,
            count: 1,
        }
    }

    pub fn near(mut self, page_id: PageId) -> Self {
        self.near = Some(page_id);
        self
    }

    pub fn near_opt(mut self, page_id: Option<PageId>) -> Self {
        self.near = page_id;
        self
    }

    pub fn fill_factor(mut self, fill_factor: u8) -> Self {
        self.fill_factor = fill_factor.clamp(1, 100);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Pages an extent may hold before it is considered full.
    fn extent_limit(&self) -> u32 {
        let limit = (EXTENT_SIZE * self.fill_factor as u32).div_ceil(100);
        limit.clamp(1, EXTENT_SIZE)
    }
}

/// Extent number containing `page_no`.
#[inline]
pub fn extent_of(page_no: u32) -> u32 {
    page_no / EXTENT_SIZE
}

/// Manages disk I/O for a single volume file.
///
/// # File Layout
/// ```text
/// ┌──────────── extent 0 ────────────┬──────────── extent 1 ──────────┐
/// │ Page 0 │ Page 1 │ ... │ Page 15  │ Page 16 │ ...                  │
/// └──────────────────────────────────┴────────────────────────────────┘
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. The allocation map is
/// kept in memory; on open, every existing page counts as allocated.
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The `BufferPoolManager` serializes
/// access to it.
pub struct DiskManager {
    file: File,
    vol_no: u16,
    /// Number of pages in the file.
    page_count: u32,
    /// Allocation state per page number.
    allocated: Vec<bool>,
}

impl DiskManager {
    /// Create a new volume file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, vol_no: u16) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            vol_no,
            page_count: 0,
            allocated: Vec::new(),
        })
    }

    /// Open an existing volume file.
    pub fn open<P: AsRef<Path>>(path: P, vol_no: u16) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            vol_no,
            page_count,
            allocated: vec![true; page_count as usize],
        })
    }

    /// Open an existing volume file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, vol_no: u16) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, vol_no)
        } else {
            Self::create(path, vol_no)
        }
    }

    #[inline]
    pub fn vol_no(&self) -> u16 {
        self.vol_no
    }

    fn check(&self, page_id: PageId) -> Result<u64> {
        if page_id.vol_no != self.vol_no || !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        if page_id.page_no >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }
        Ok(page_id.page_no as u64 * PAGE_SIZE as u64)
    }

    /// Read a page from disk, verifying the checksum of initialized pages.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist
    /// - `Error::ChecksumMismatch` if an initialized page fails verification
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        let offset = self.check(page_id)?;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        if page.header().page_type != PageType::Invalid && !page.verify_checksum() {
            return Err(Error::ChecksumMismatch(page_id));
        }
        Ok(page)
    }

    /// Write a page to disk, stamping its checksum on the way out.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let offset = self.check(page_id)?;

        let mut out = Page::new();
        out.as_mut_slice().copy_from_slice(page.as_slice());
        out.update_checksum();

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(out.as_slice())?;
        Ok(())
    }

    /// Flush file contents to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Allocate `req.count` pages following the placement rules:
    /// 1. a free page in the extent of `req.near`,
    /// 2. a free page in an extent at or after `req.extent_hint`,
    /// 3. a new page at the end of the file.
    ///
    /// An extent accepts pages only while it holds fewer than
    /// `ceil(EXTENT_SIZE * fill_factor / 100)` allocated pages.
    pub fn allocate_pages(&mut self, req: AllocRequest) -> Result<Vec<PageId>> {
        if let Some(near) = req.near {
            if near.vol_no != self.vol_no {
                return Err(Error::InvalidPageId(near));
            }
        }

        let mut pages = Vec::with_capacity(req.count);
        for _ in 0..req.count {
            let page_no = self.allocate_one(&req)?;
            pages.push(PageId::new(self.vol_no, page_no));
        }

        tracing::debug!(
            target: "slotbase::storage::alloc",
            vol = self.vol_no,
            count = pages.len(),
            first = pages.first().map(|p| p.page_no),
            near = req.near.map(|p| p.page_no),
            "allocated pages"
        );
        Ok(pages)
    }

    /// Convenience wrapper: allocate a single page with default placement.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_no = self.allocate_one(&AllocRequest::new(0))?;
        Ok(PageId::new(self.vol_no, page_no))
    }

    fn allocate_one(&mut self, req: &AllocRequest) -> Result<u32> {
        let limit = req.extent_limit();

        let mut found = req
            .near
            .and_then(|near| self.free_in_extent(extent_of(near.page_no), limit, Some(near.page_no)));

        if found.is_none() {
            let extents = self.page_count.div_ceil(EXTENT_SIZE);
            found = (req.extent_hint..extents).find_map(|ext| self.free_in_extent(ext, limit, None));
        }

        let page_no = match found {
            Some(page_no) => page_no,
            None => self.grow(limit)?,
        };
        self.allocated[page_no as usize] = true;
        Ok(page_no)
    }

    /// A free page inside extent `ext`, closest to `near` when given.
    fn free_in_extent(&self, ext: u32, limit: u32, near: Option<u32>) -> Option<u32> {
        let start = ext * EXTENT_SIZE;
        let end = (start + EXTENT_SIZE).min(self.page_count);
        if start >= end {
            return None;
        }
        let range = start as usize..end as usize;
        let used = self.allocated[range.clone()].iter().filter(|&&a| a).count() as u32;
        if used >= limit {
            return None;
        }

        let free = range.filter(|&p| !self.allocated[p]).map(|p| p as u32);
        match near {
            Some(near) => free.min_by_key(|&p| (p < near, p.abs_diff(near))),
            None => free.min(),
        }
    }

    /// Extend the file by one page, skipping to the next extent when the tail
    /// extent has reached its fill limit.
    fn grow(&mut self, limit: u32) -> Result<u32> {
        let tail_ext = extent_of(self.page_count);
        let tail_start = tail_ext * EXTENT_SIZE;
        let tail_used = self.allocated[tail_start as usize..self.page_count as usize]
            .iter()
            .filter(|&&a| a)
            .count() as u32;

        let page_no = if tail_used >= limit {
            (tail_ext + 1) * EXTENT_SIZE
        } else {
            self.page_count
        };

        let new_count = page_no + 1;
        self.file.set_len(new_count as u64 * PAGE_SIZE as u64)?;
        self.allocated.resize(new_count as usize, false);
        self.page_count = new_count;
        Ok(page_no)
    }

    /// Return a page to the free pool.
    pub fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.check(page_id)?;
        self.allocated[page_id.page_no as usize] = false;
        tracing::debug!(
            target: "slotbase::storage::alloc",
            page = page_id.page_no,
            "deallocated page"
        );
        Ok(())
    }

    /// Whether `page_id` is currently allocated.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        page_id.vol_no == self.vol_no
            && self
                .allocated
                .get(page_id.page_no as usize)
                .copied()
                .unwrap_or(false)
    }

    /// Number of pages in the file (allocated or not).
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total size of the volume file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.page_count as u64 * PAGE_SIZE as u64
    }
}
