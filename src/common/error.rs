//! Error types for slotbase.

use thiserror::Error;

use crate::common::{FileId, ObjectId, PageId};
use crate::index::btree::KeyType;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors raised by the page store, the heap manager and the index manager.
///
/// Every operation either succeeds or fails with exactly one of these; pages
/// pinned along the way are released by their guards before the error reaches
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// The page id belongs to another volume or is the sentinel.
    #[error("invalid page id: {0}")]
    InvalidPageId(PageId),

    /// Every frame is pinned; nothing can be evicted.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// Attempted to drop a page from the pool while it is pinned.
    #[error("{0} is still pinned")]
    PagePinned(PageId),

    /// Stored CRC32 does not match the page contents.
    #[error("checksum mismatch on {0}")]
    ChecksumMismatch(PageId),

    /// Key part type outside {integer, variable-length string}.
    #[error("unsupported key type: {0:?}")]
    UnsupportedKeyType(KeyType),

    /// Leaf insertion found an exact key match.
    #[error("duplicate key")]
    DuplicateKey,

    /// Encoded key longer than the index accepts.
    #[error("key of {len} bytes exceeds maximum of {max}")]
    KeyTooLarge { len: usize, max: usize },

    /// File id is not registered in the catalog.
    #[error("invalid catalog reference: {0}")]
    InvalidCatalogReference(FileId),

    /// Object id points outside the file, past the slot array, or at an empty slot.
    #[error("invalid object reference: {0}")]
    InvalidObjectReference(ObjectId),

    /// Unique stamp of the object id no longer matches the slot.
    #[error("stale reference {oid}: slot now carries unique {current}")]
    StaleReference { oid: ObjectId, current: u32 },

    /// Aligned payload does not fit in a single page.
    #[error("object of {len} bytes exceeds single-page limit of {max}")]
    ObjectTooLarge { len: usize, max: usize },

    /// Page type flag is not what the caller expected.
    #[error("corrupt page {page_id}: unexpected page type {page_type}")]
    CorruptPage { page_id: PageId, page_type: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(1, 42));
        assert_eq!(format!("{}", err), "Page(1:42) not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "no free frames available in buffer pool");

        let err = Error::ObjectTooLarge { len: 5000, max: 4000 };
        assert!(format!("{}", err).contains("5000"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_stale_reference_display() {
        let oid = ObjectId::new(PageId::new(1, 3), 2, 5);
        let err = Error::StaleReference { oid, current: 6 };
        assert_eq!(
            format!("{}", err),
            "stale reference Oid(1:3#2@5): slot now carries unique 6"
        );
    }
}
