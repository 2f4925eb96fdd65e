use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out portfolio ids.
///
/// Allocation happens outside the rollback scope of any transaction: an id
/// taken by a transaction that later aborts is gone for good, so ids are
/// unique but not gap-free.
pub trait IdAllocator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Process-wide counter producing decimal ids.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Continues after the largest id already stored, if any.
    pub fn after(max_existing: Option<u64>) -> Self {
        Self::starting_at(max_existing.map_or(1, |max| max + 1))
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for AtomicIdAllocator {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}
