//! Bounded per-launch history of recent buys.
//!
//! A [`RecentBuys`] holds at most `capacity` events in arrival order. Pushing
//! beyond capacity evicts from the front, so the window always reflects the
//! last `capacity` purchases for the launch.

use std::collections::VecDeque;

use diamond_core::types::BuyEvent;

#[derive(Debug, Clone)]
pub struct RecentBuys {
    capacity: usize,
    buys: VecDeque<BuyEvent>,
}

impl RecentBuys {
    /// # Panics
    /// If `capacity` is zero. Configuration validation rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "recent-buy window needs a non-zero capacity");
        Self {
            capacity,
            buys: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `event`, evicting the oldest entries beyond capacity.
    ///
    /// Returns `false` without changing the window when an event with the
    /// same signature is already present.
    pub fn push(&mut self, event: BuyEvent) -> bool {
        if self.contains(&event.signature) {
            return false;
        }
        self.buys.push_back(event);
        while self.buys.len() > self.capacity {
            self.buys.pop_front();
        }
        true
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.buys.iter().any(|b| b.signature == signature)
    }

    /// Owned copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<BuyEvent> {
        self.buys.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuyEvent> {
        self.buys.iter()
    }

    pub fn len(&self) -> usize {
        self.buys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
