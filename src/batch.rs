//! Bounded accumulation of derived items between inference dispatches.

use crate::features::BatchItem;

/// Insertion-ordered buffer with a fixed flush threshold. The engine drains
/// it exactly when [`is_full`](Self::is_full) first reports true, and once
/// more at shutdown for the final partial batch. There is no time-based
/// flush: a quiet stream holds its partial batch.
#[derive(Debug)]
pub struct BatchAccumulator {
    items: Vec<BatchItem>,
    batch_size: usize,
}

impl BatchAccumulator {
    /// `batch_size` is the dispatch threshold; config validation keeps it
    /// at 1 or above.
    pub fn with_capacity(batch_size: usize) -> Self {
        Self {
            items: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    pub fn add(&mut self, item: BatchItem) {
        self.items.push(item);
    }

    /// True once the flush threshold is reached.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.batch_size
    }

    /// Hand back everything accumulated, in insertion order, and reset to
    /// empty in one step.
    pub fn drain(&mut self) -> Vec<BatchItem> {
        std::mem::replace(&mut self.items, Vec::with_capacity(self.batch_size))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
