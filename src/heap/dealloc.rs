//! Deferred deallocation of emptied heap pages.

use crate::buffer::BufferPoolManager;
use crate::common::{FileId, PageId, Result};

/// A page unlinked from its file and awaiting reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeallocEntry {
    pub file_id: FileId,
    pub page_id: PageId,
}

/// Pages scheduled for reclamation once the enclosing operation completes.
///
/// Destroying an object never frees its page directly; the page id is pushed
/// here and handed back to the allocator by [`DeallocList::release`].
#[derive(Debug, Default)]
pub struct DeallocList {
    entries: Vec<DeallocEntry>,
}

impl DeallocList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, file_id: FileId, page_id: PageId) {
        self.entries.push(DeallocEntry { file_id, page_id });
    }

    pub fn entries(&self) -> &[DeallocEntry] {
        &self.entries
    }

    pub fn pages(&self) -> impl Iterator<Item = PageId> + '_ {
        self.entries.iter().map(|e| e.page_id)
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.entries.iter().any(|e| e.page_id == page_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return every listed page to the allocator. Returns how many were freed.
    ///
    /// Stops at the first failure; entries not yet released stay listed.
    pub fn release(&mut self, bpm: &BufferPoolManager) -> Result<usize> {
        let mut released = 0;
        while let Some(entry) = self.entries.first().copied() {
            bpm.deallocate_page(entry.page_id)?;
            self.entries.remove(0);
            released += 1;
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskManager;
    use tempfile::tempdir;

    #[test]
    fn test_push_and_query() {
        let mut list = DeallocList::new();
        list.push_page(FileId(1), PageId::new(1, 4));
        list.push_page(FileId(1), PageId::new(1, 9));

        assert_eq!(list.len(), 2);
        assert!(list.contains(PageId::new(1, 9)));
        assert!(!list.contains(PageId::new(1, 5)));
        assert_eq!(list.pages().collect::<Vec<_>>(), vec![PageId::new(1, 4), PageId::new(1, 9)]);
    }

    #[test]
    fn test_release_returns_pages_to_allocator() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("dealloc.db"), 1).unwrap();
        let bpm = BufferPoolManager::new(4, dm);
        let pid = bpm.new_page().unwrap().page_id();

        let mut list = DeallocList::new();
        list.push_page(FileId(1), pid);
        assert!(bpm.is_allocated(pid));

        assert_eq!(list.release(&bpm).unwrap(), 1);
        assert!(list.is_empty());
        assert!(!bpm.is_allocated(pid));
    }
}
