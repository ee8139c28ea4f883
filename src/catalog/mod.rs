//! Catalog - per-file metadata consulted by the heap and index managers.
//!
//! The catalog is kept in memory. Each data file has one [`DataFileEntry`]
//! holding its page-list endpoints, extent fill factor and avail-space index.

use std::collections::HashMap;

use crate::common::{Error, FileId, PageId, Result};
use crate::heap::AvailSpaceIndex;

/// Catalog record of one data file.
#[derive(Debug, Clone)]
pub struct DataFileEntry {
    pub file_id: FileId,
    /// Head of the file's page list. Never deallocated while the file exists.
    pub first_page: PageId,
    /// Tail of the file's page list.
    pub last_page: PageId,
    /// Extent fill factor in percent, passed to the allocator.
    pub eff: u8,
    /// Free-space buckets of the file's pages.
    pub avail: AvailSpaceIndex,
}

impl DataFileEntry {
    pub fn new(file_id: FileId, first_page: PageId, eff: u8) -> Self {
        Self {
            file_id,
            first_page,
            last_page: first_page,
            eff,
            avail: AvailSpaceIndex::new(),
        }
    }

    /// Extent holding the first page; allocations start there.
    pub fn first_extent(&self) -> u32 {
        crate::storage::extent_of(self.first_page.page_no)
    }
}

/// In-memory map from file id to its catalog record.
#[derive(Debug, Default)]
pub struct Catalog {
    files: HashMap<FileId, DataFileEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `entry.file_id`.
    pub fn register(&mut self, entry: DataFileEntry) {
        self.files.insert(entry.file_id, entry);
    }

    pub fn contains(&self, file_id: FileId) -> bool {
        self.files.contains_key(&file_id)
    }

    /// # Errors
    /// `Error::InvalidCatalogReference` if the file is unknown.
    pub fn get(&self, file_id: FileId) -> Result<&DataFileEntry> {
        self.files
            .get(&file_id)
            .ok_or(Error::InvalidCatalogReference(file_id))
    }

    pub fn get_mut(&mut self, file_id: FileId) -> Result<&mut DataFileEntry> {
        self.files
            .get_mut(&file_id)
            .ok_or(Error::InvalidCatalogReference(file_id))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut catalog = Catalog::new();
        catalog.register(DataFileEntry::new(FileId(3), PageId::new(1, 17), 80));

        let entry = catalog.get(FileId(3)).unwrap();
        assert_eq!(entry.first_page, PageId::new(1, 17));
        assert_eq!(entry.last_page, PageId::new(1, 17));
        assert_eq!(entry.first_extent(), 1);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_unknown_file() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.get(FileId(9)),
            Err(Error::InvalidCatalogReference(FileId(9)))
        ));
        assert!(catalog.get_mut(FileId(9)).is_err());
    }
}
