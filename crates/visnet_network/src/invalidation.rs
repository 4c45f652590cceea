//! Invalidation severity lattice and the pending-invalidation queue.
//!
//! Every processor carries an [`InvalidationLevel`] describing how much work
//! it must redo. Levels only escalate between successful runs: invalidating
//! at a level at or below the current one is a no-op, and only a successful
//! `process()` resets a processor to [`InvalidationLevel::Valid`].

use core::fmt;

use hashbrown::HashMap;

use crate::processor::ProcessorId;

/// Severity of the work a processor has to redo.
///
/// The levels form a small ascending lattice:
///
/// - [`Valid`](InvalidationLevel::Valid) - nothing to do
/// - [`InvalidOutput`](InvalidationLevel::InvalidOutput) - inputs or
///   properties changed, outputs must be recomputed
/// - [`InvalidResources`](InvalidationLevel::InvalidResources) - internal
///   resources must be rebuilt before outputs can be recomputed
///
/// A processor's validity is the maximum severity received since its last
/// successful `process()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum InvalidationLevel {
    /// The processor's outputs are up to date.
    #[default]
    Valid,
    /// Outputs are stale and must be recomputed.
    InvalidOutput,
    /// Internal resources must be rebuilt, then outputs recomputed.
    InvalidResources,
}

impl fmt::Display for InvalidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationLevel::Valid => write!(f, "valid"),
            InvalidationLevel::InvalidOutput => write!(f, "invalid-output"),
            InvalidationLevel::InvalidResources => write!(f, "invalid-resources"),
        }
    }
}

/// Pending invalidations recorded by the network, drained by the evaluator.
///
/// Instead of reentrant observer callbacks, every invalidation is recorded
/// here as a (processor, level) entry with max-merge semantics. The evaluator
/// drains the queue at the start of each pass; the queue is a trigger, not a
/// worklist - the pass itself walks the full topological order.
#[derive(Debug, Default)]
pub struct PendingInvalidations {
    entries: HashMap<ProcessorId, InvalidationLevel>,
}

impl PendingInvalidations {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an invalidation, keeping the maximum level per processor.
    pub fn record(&mut self, processor: ProcessorId, level: InvalidationLevel) {
        let entry = self.entries.entry(processor).or_insert(level);
        if level > *entry {
            *entry = level;
        }
    }

    /// Removes any entry for the given processor.
    pub fn remove(&mut self, processor: ProcessorId) {
        self.entries.remove(&processor);
    }

    /// Returns true if the processor has a pending entry.
    #[must_use]
    pub fn contains(&self, processor: ProcessorId) -> bool {
        self.entries.contains_key(&processor)
    }

    /// Returns true if no invalidations are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drains all entries, sorted by processor handle for determinism.
    pub fn drain(&mut self) -> Vec<(ProcessorId, InvalidationLevel)> {
        let mut drained: Vec<_> = self.entries.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(InvalidationLevel::Valid < InvalidationLevel::InvalidOutput);
        assert!(InvalidationLevel::InvalidOutput < InvalidationLevel::InvalidResources);
    }

    #[test]
    fn level_display() {
        assert_eq!(format!("{}", InvalidationLevel::InvalidOutput), "invalid-output");
    }

    #[test]
    fn record_keeps_maximum() {
        let mut pending = PendingInvalidations::new();
        let id = ProcessorId::new(0);

        pending.record(id, InvalidationLevel::InvalidResources);
        pending.record(id, InvalidationLevel::InvalidOutput);

        let drained = pending.drain();
        assert_eq!(drained, vec![(id, InvalidationLevel::InvalidResources)]);
        assert!(pending.is_empty());
    }

    #[test]
    fn drain_is_sorted_by_handle() {
        let mut pending = PendingInvalidations::new();
        pending.record(ProcessorId::new(2), InvalidationLevel::InvalidOutput);
        pending.record(ProcessorId::new(0), InvalidationLevel::InvalidOutput);
        pending.record(ProcessorId::new(1), InvalidationLevel::InvalidOutput);

        let handles: Vec<_> = pending.drain().into_iter().map(|(id, _)| id.index()).collect();
        assert_eq!(handles, vec![0, 1, 2]);
    }

    #[test]
    fn remove_clears_entry() {
        let mut pending = PendingInvalidations::new();
        let id = ProcessorId::new(7);
        pending.record(id, InvalidationLevel::InvalidOutput);
        pending.remove(id);
        assert!(!pending.contains(id));
    }
}
