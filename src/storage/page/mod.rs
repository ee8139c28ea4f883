//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`SlottedPage`] - Slot-array view shared by heap and B-tree pages

#[allow(clippy::module_inception)]
mod page;
mod page_header;
pub mod slotted;

pub use page::Page;
pub use page_header::{PageHeader, PageType};
pub use slotted::{Slot, SlottedPage, DATA_CAPACITY, DATA_START, EMPTY_SLOT, SLOT_SIZE};
