//! Index structures.
//!
//! - [`btree`] - B+-tree with unique keys

pub mod btree;
