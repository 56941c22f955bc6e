//! Resize statistics

/// Counts of capacity changes over a stack's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeStats {
    /// Number of successful expansions
    pub expansions: u64,
    /// Number of successful shrinks
    pub shrinks: u64,
    /// Largest capacity ever allocated
    pub peak_capacity: usize,
}

impl ResizeStats {
    pub(crate) fn starting_at(capacity: usize) -> Self {
        Self {
            peak_capacity: capacity,
            ..Self::default()
        }
    }

    pub(crate) fn record_expansion(&mut self, capacity: usize) {
        self.expansions += 1;
        self.peak_capacity = self.peak_capacity.max(capacity);
    }

    pub(crate) fn record_shrink(&mut self) {
        self.shrinks += 1;
    }

    /// Total number of reallocations
    #[must_use]
    pub fn reallocations(&self) -> u64 {
        self.expansions + self.shrinks
    }
}
