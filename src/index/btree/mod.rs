//! B+-tree index over slotted pages.
//!
//! - [`insert_key`], [`insert_leaf`], [`insert_internal`] - recursive
//!   insertion with leaf and internal splits
//! - [`BTreeIndex`] - root tracking, root growth, lookup and ordered scan
//! - [`KeyDesc`] / [`KeyValue`] - composite keys and their comparator
//!
//! Keys are unique within an index; inserting an existing key fails with
//! `Error::DuplicateKey`.

mod insert;
mod key;
mod node;
mod split;
mod tree;

pub use insert::{insert_internal, insert_key, insert_leaf, InsertOutcome, InternalItem, LeafItem};
pub use key::{KeyDesc, KeyField, KeyPart, KeyType, KeyValue};
pub use node::{
    internal_entry_size, leaf_entry_len, leaf_entry_size, search_internal, search_leaf, BTreePageExt,
};
pub use tree::BTreeIndex;
