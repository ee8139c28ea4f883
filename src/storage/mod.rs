//! Storage layer - disk I/O, extent allocation and page formats.
//!
//! - [`DiskManager`] - Low-level file I/O and the extent allocator
//! - [`AllocRequest`] - Placement hints for new pages
//! - [`page`] - Page types and layouts

mod disk_manager;
pub mod page;

pub use disk_manager::{extent_of, AllocRequest, DiskManager};
