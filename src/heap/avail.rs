//! Avail-space index: per-file buckets of pages keyed by free-space percentage.
//!
//! Bucket `i` holds pages whose free space is at least
//! `AVAIL_THRESHOLDS[i]` percent of [`DATA_CAPACITY`] but below the next
//! threshold; the last bucket is open-ended. Pages under the lowest
//! threshold are not indexed.

use std::collections::{BTreeSet, HashMap};

use crate::common::config::AVAIL_THRESHOLDS;
use crate::common::PageId;
use crate::storage::page::DATA_CAPACITY;

const BUCKETS: usize = AVAIL_THRESHOLDS.len();

/// Free-space buckets of one data file.
#[derive(Debug, Clone, Default)]
pub struct AvailSpaceIndex {
    buckets: [BTreeSet<PageId>; BUCKETS],
    member: HashMap<PageId, usize>,
}

impl AvailSpaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket a page with `free_percent` free space belongs to, if any.
    pub fn bucket_of(free_percent: usize) -> Option<usize> {
        AVAIL_THRESHOLDS.iter().rposition(|&t| free_percent >= t)
    }

    /// Free bytes every page in bucket `idx` is guaranteed to have.
    pub fn guaranteed_space(idx: usize) -> usize {
        AVAIL_THRESHOLDS[idx] * DATA_CAPACITY / 100
    }

    /// Place `page_id` in the bucket matching `free_percent`, moving it if it
    /// is already indexed. Returns the bucket chosen.
    pub fn insert(&mut self, page_id: PageId, free_percent: usize) -> Option<usize> {
        self.remove(page_id);
        let idx = Self::bucket_of(free_percent)?;
        self.buckets[idx].insert(page_id);
        self.member.insert(page_id, idx);
        tracing::trace!(
            target: "slotbase::heap::avail",
            page = page_id.page_no,
            free_percent,
            bucket = AVAIL_THRESHOLDS[idx],
            "page indexed"
        );
        Some(idx)
    }

    /// Drop `page_id` from whichever bucket holds it.
    pub fn remove(&mut self, page_id: PageId) -> Option<usize> {
        let idx = self.member.remove(&page_id)?;
        self.buckets[idx].remove(&page_id);
        Some(idx)
    }

    /// First page, scanning buckets from the fullest upward, whose bucket
    /// guarantees at least `needed` free bytes.
    pub fn find(&self, needed: usize) -> Option<PageId> {
        (0..BUCKETS)
            .filter(|&idx| Self::guaranteed_space(idx) >= needed)
            .find_map(|idx| self.buckets[idx].first().copied())
    }

    pub fn bucket(&self, page_id: PageId) -> Option<usize> {
        self.member.get(&page_id).copied()
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.member.contains_key(&page_id)
    }

    /// Pages currently in bucket `idx`, in page order.
    pub fn pages_in(&self, idx: usize) -> impl Iterator<Item = PageId> + '_ {
        self.buckets[idx].iter().copied()
    }

    pub fn len(&self) -> usize {
        self.member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member.is_empty()
    }
}
