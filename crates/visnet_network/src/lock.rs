//! RAII network lock for batching invalidations.
//!
//! Every invalidation on an unlocked network raises an evaluation request.
//! Wrapping a series of mutations in a [`NetworkLock`] suppresses that:
//! invalidations accumulate in the pending queue while the lock is held, and
//! releasing the outermost lock raises a single request for the whole batch.

use core::ops::{Deref, DerefMut};

use crate::network::ProcessorNetwork;

/// An RAII scope during which evaluation requests are suppressed.
///
/// Obtained from [`ProcessorNetwork::lock`]. Locks nest: the evaluation
/// request fires when the outermost lock drops, and only if invalidations
/// actually accumulated. The guard derefs to the network, so batched
/// mutations read exactly like unbatched ones.
#[must_use = "the lock batches invalidations only while it is held"]
pub struct NetworkLock<'a> {
    network: &'a mut ProcessorNetwork,
}

impl<'a> NetworkLock<'a> {
    pub(crate) fn new(network: &'a mut ProcessorNetwork) -> Self {
        network.begin_lock();
        Self { network }
    }
}

impl Deref for NetworkLock<'_> {
    type Target = ProcessorNetwork;

    fn deref(&self) -> &ProcessorNetwork {
        self.network
    }
}

impl DerefMut for NetworkLock<'_> {
    fn deref_mut(&mut self) -> &mut ProcessorNetwork {
        self.network
    }
}

impl Drop for NetworkLock<'_> {
    fn drop(&mut self) {
        self.network.end_lock();
    }
}
