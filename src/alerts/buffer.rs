//! Bounded alert retention.
//!
//! Newest alerts sit at the front. Once the buffer holds `capacity` entries the
//! oldest one is evicted on every insert.

use std::collections::VecDeque;

use crate::models::Alert;

pub const ALERT_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct AlertBuffer {
    entries: VecDeque<Alert>,
    capacity: usize,
}

impl Default for AlertBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBuffer {
    pub fn new() -> Self {
        Self::with_capacity(ALERT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            // One spare slot so the transient `capacity + 1` state never reallocates.
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend `alert`, returning the evicted oldest entry on overflow.
    pub fn insert(&mut self, alert: Alert) -> Option<Alert> {
        self.entries.push_front(alert);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Remove the alert with `id`. Returns false when nothing matched.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.entries.iter().position(|alert| alert.id == id) {
            Some(index) => self.entries.remove(index).is_some(),
            None => false,
        }
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Alert> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
