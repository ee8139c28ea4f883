//! CLOCK replacement policy.
//!
//! Frames sit on a circular array with a reference bit each. The hand sweeps
//! forward, clearing reference bits, and evicts the first evictable frame whose
//! bit is already clear.

use crate::common::FrameId;

#[derive(Debug, Default, Clone, Copy)]
struct ClockEntry {
    tracked: bool,
    referenced: bool,
    evictable: bool,
}

pub struct ClockReplacer {
    entries: Vec<ClockEntry>,
    hand: usize,
    evictable: usize,
}

impl ClockReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![ClockEntry::default(); capacity],
            hand: 0,
            evictable: 0,
        }
    }

    /// Record that a frame was accessed (sets its reference bit).
    pub fn record_access(&mut self, frame_id: FrameId) {
        let entry = &mut self.entries[frame_id.0];
        entry.tracked = true;
        entry.referenced = true;
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let entry = &mut self.entries[frame_id.0];
        if !entry.tracked || entry.evictable == evictable {
            return;
        }
        entry.evictable = evictable;
        if evictable {
            self.evictable += 1;
        } else {
            self.evictable -= 1;
        }
    }

    /// Select a victim frame, or `None` if every tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        if self.evictable == 0 {
            return None;
        }
        // Two sweeps always suffice: the first clears every reference bit.
        for _ in 0..2 * self.entries.len() {
            let idx = self.hand;
            self.hand = (self.hand + 1) % self.entries.len();

            let entry = &mut self.entries[idx];
            if !entry.tracked || !entry.evictable {
                continue;
            }
            if entry.referenced {
                entry.referenced = false;
                continue;
            }
            *entry = ClockEntry::default();
            self.evictable -= 1;
            return Some(FrameId::new(idx));
        }
        None
    }

    /// Stop tracking a frame (its page was dropped from the pool).
    pub fn remove(&mut self, frame_id: FrameId) {
        let entry = &mut self.entries[frame_id.0];
        if entry.tracked && entry.evictable {
            self.evictable -= 1;
        }
        *entry = ClockEntry::default();
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable
    }
}
