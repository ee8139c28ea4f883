//! Record heap - variable-length objects stored in slotted pages.
//!
//! - [`ObjectManager`] - create, read and destroy objects; page placement
//! - [`AvailSpaceIndex`] - free-space buckets per file
//! - [`DeallocList`] - pages awaiting reclamation
//! - [`ObjectHeader`] - per-object header and on-page encoding

mod avail;
mod dealloc;
mod object;
mod object_manager;

pub use avail::AvailSpaceIndex;
pub use dealloc::{DeallocEntry, DeallocList};
pub use object::{
    compact_page, object_entry_len, object_entry_size, ObjectHeader, MAX_OBJECT_LEN,
    OBJECT_HEADER_SIZE,
};
pub use object_manager::ObjectManager;
