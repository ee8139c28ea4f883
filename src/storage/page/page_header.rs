//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing metadata:
//! - [`PageType`] discriminator
//! - CRC32 checksum for integrity
//! - LSN, reserved for a future log manager
//! - The page's own id and the id of the file that owns it

use crate::common::{FileId, PageId};

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized (zeroed) page.
    #[default]
    Invalid = 0,
    /// Slotted page of the record heap.
    Slotted = 1,
    /// B-tree internal (non-leaf) node.
    BTreeInternal = 2,
    /// B-tree leaf node.
    BTreeLeaf = 3,
    /// Page returned to the allocator.
    Free = 4,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Slotted,
            2 => PageType::BTreeInternal,
            3 => PageType::BTreeLeaf,
            4 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (23 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       8     lsn (little-endian)
/// 13      2     vol_no of this page
/// 15      4     page_no of this page
/// 19      4     file_id of the owning file
/// ```
///
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub checksum: u32,
    pub lsn: u64,
    pub page_id: PageId,
    pub file_id: FileId,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 23;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_LSN: usize = 5;
    pub const OFFSET_VOL_NO: usize = 13;
    pub const OFFSET_PAGE_NO: usize = 15;
    pub const OFFSET_FILE_ID: usize = 19;

    /// Create a header for `page_id` owned by `file_id`.
    pub fn new(page_type: PageType, page_id: PageId, file_id: FileId) -> Self {
        Self {
            page_type,
            checksum: 0,
            lsn: 0,
            page_id,
            file_id,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let u16_at = |o: usize| u16::from_le_bytes([data[o], data[o + 1]]);
        let u32_at = |o: usize| u32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8]);

        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            checksum: u32_at(Self::OFFSET_CHECKSUM),
            lsn: u64::from_le_bytes(lsn),
            page_id: PageId::new(u16_at(Self::OFFSET_VOL_NO), u32_at(Self::OFFSET_PAGE_NO)),
            file_id: FileId(u32_at(Self::OFFSET_FILE_ID)),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8].copy_from_slice(&self.lsn.to_le_bytes());
        data[Self::OFFSET_VOL_NO..Self::OFFSET_VOL_NO + 2]
            .copy_from_slice(&self.page_id.vol_no.to_le_bytes());
        data[Self::OFFSET_PAGE_NO..Self::OFFSET_PAGE_NO + 4]
            .copy_from_slice(&self.page_id.page_no.to_le_bytes());
        data[Self::OFFSET_FILE_ID..Self::OFFSET_FILE_ID + 4]
            .copy_from_slice(&self.file_id.0.to_le_bytes());
    }

    /// Compute CRC32 checksum of a page with the checksum field zeroed out.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}
