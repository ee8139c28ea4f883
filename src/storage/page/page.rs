//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw byte arena that travels between disk and the buffer
//! pool. Typed access goes through [`SlottedPage`] views, which address the
//! arena by offset only.

use crate::common::config::PAGE_SIZE;

use super::page_header::PageHeader;
use super::slotted::SlottedPage;

/// A page of data (4KB, 4KB-aligned).
///
/// `Page` does not implement `Clone` outside tests; copying a page should be
/// an explicit `copy_from_slice`.
///
/// # Example
/// ```
/// use slotbase::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Read-only slotted view over this page.
    #[inline]
    pub fn slotted(&self) -> SlottedPage<&[u8]> {
        SlottedPage::new(&self.data[..])
    }

    /// Mutable slotted view over this page.
    #[inline]
    pub fn slotted_mut(&mut self) -> SlottedPage<&mut [u8]> {
        SlottedPage::new(&mut self.data[..])
    }

    /// Compute and store checksum in the header.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
