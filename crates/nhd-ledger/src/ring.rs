use std::collections::VecDeque;

use nhd_schemas::{ClosedTradeRecord, LogEntry};

/// Newest-first list with a hard cap; the oldest items fall off the end.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedLedger<T> {
    cap: usize,
    items: Vec<T>,
}

pub type HistoryLedger = BoundedLedger<ClosedTradeRecord>;
pub type TelemetryLog = BoundedLedger<LogEntry>;

impl<T> BoundedLedger<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            items: Vec::new(),
        }
    }

    /// Seed from persisted items (already newest first).
    pub fn with_items(cap: usize, items: Vec<T>) -> Self {
        let mut l = Self::new(cap);
        l.replace_all(items);
        l
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newest first.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn prepend(&mut self, item: T) -> usize {
        self.prepend_batch(vec![item])
    }

    /// Put `batch` in front (keeping its order) and truncate to the cap.
    /// Returns how many old items were evicted.
    pub fn prepend_batch(&mut self, mut batch: Vec<T>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        batch.append(&mut self.items);
        let evicted = batch.len().saturating_sub(self.cap);
        batch.truncate(self.cap);
        self.items = batch;
        evicted
    }

    /// Wholesale replacement (startup sync, reload).
    pub fn replace_all(&mut self, mut items: Vec<T>) {
        items.truncate(self.cap);
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Oldest-first ring of equity samples.
#[derive(Debug, Clone, PartialEq)]
pub struct EquitySeries {
    cap: usize,
    samples: VecDeque<f64>,
}

impl EquitySeries {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            samples: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}
