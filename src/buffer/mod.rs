//! Buffer pool management.
//!
//! The buffer pool is the page store that the heap and index managers run
//! against: it pins pages into a fixed set of frames and writes dirty pages
//! back on eviction or flush.
//!
//! # Components
//! - [`BufferPoolManager`] - The main page cache and allocation front end
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins
//! - [`PoolStats`] - Performance statistics
//! - [`ClockReplacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use replacer::ClockReplacer;
pub use stats::{PoolStats, StatsSnapshot};
