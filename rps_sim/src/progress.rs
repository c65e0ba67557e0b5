use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// The items-issued counter, owned by the dispatcher.
///
/// There is exactly one writer: this type is not `Clone`. Readers are handed
/// out through [`ProgressCounter::reader`].
#[derive(Debug, Default)]
pub struct ProgressCounter {
    issued: Arc<AtomicU64>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> ProgressReader {
        ProgressReader {
            issued: Arc::clone(&self.issued),
        }
    }

    /// Record `items` more issued items and return the new total.
    pub fn advance(&self, items: u64) -> u64 {
        self.issued.fetch_add(items, Ordering::SeqCst) + items
    }

    pub fn get(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

/// Read-only view of a [`ProgressCounter`].
#[derive(Clone, Debug)]
pub struct ProgressReader {
    issued: Arc<AtomicU64>,
}

impl ProgressReader {
    pub fn get(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}
