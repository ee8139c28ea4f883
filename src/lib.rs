//! slotbase - slotted-page record heap and B+-tree index over a pinned buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           slotbase                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────┐   ┌───────────────────────────┐  │
//! │  │   Index Manager (index/)  │   │  Record Heap (heap/)      │  │
//! │  │  insert_key, leaf/internal│   │  create/destroy objects,  │  │
//! │  │  splits, root growth      │   │  avail buckets, dealloc   │  │
//! │  └───────────────────────────┘   └───────────────────────────┘  │
//! │                 │                 ↓            │                │
//! │                 │      Catalog (catalog/)      │                │
//! │                 ↓                              ↓                │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Slotted pages (storage/page/slotted)               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)                              │   │
//! │  │   BufferPoolManager + Frame + Clock replacer + Stats     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Storage (storage/)                                 │   │
//! │  │     DiskManager (extent allocator) + Page + PageHeader   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, ObjectId, Error, config)
//! - [`storage`] - Disk I/O, extent allocation and page formats
//! - [`buffer`] - Buffer pool management
//! - [`catalog`] - Per-file metadata
//! - [`heap`] - Variable-length records in slotted pages
//! - [`index`] - B+-tree index
//!
//! # Quick Start
//! ```no_run
//! use slotbase::buffer::BufferPoolManager;
//! use slotbase::common::FileId;
//! use slotbase::heap::{ObjectHeader, ObjectManager};
//! use slotbase::storage::DiskManager;
//!
//! let dm = DiskManager::create("my_database.db", 1).unwrap();
//! let bpm = BufferPoolManager::new(64, dm);
//! let mut om = ObjectManager::new(&bpm);
//!
//! om.create_file(FileId(1), 100).unwrap();
//! let oid = om
//!     .create_object(FileId(1), None, ObjectHeader::default(), b"hello")
//!     .unwrap();
//! let (_, data) = om.read_object(FileId(1), &oid).unwrap();
//! assert_eq!(data, b"hello");
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod heap;
pub mod index;
pub mod storage;

pub use common::config::PAGE_SIZE;
pub use common::{Error, FileId, FrameId, ObjectId, PageId, Result};

pub use buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard, PoolStats, StatsSnapshot};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{AllocRequest, DiskManager};
