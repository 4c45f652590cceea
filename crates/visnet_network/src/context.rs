//! Process context handed to processor behaviors.
//!
//! The context is a self-contained view of one processor's world at the
//! moment it executes: a snapshot of inport data, staged outport writes,
//! and a copy of its properties. Behaviors never borrow the network, which
//! keeps `process()` free of aliasing and reentrancy hazards; structural
//! edits requested mid-process are queued with [`ProcessContext::defer`]
//! and applied by the network after the behavior returns.

use tracing::warn;

use crate::error::StructuralError;
use crate::network::ProcessorNetwork;
use crate::port::PortValue;
use crate::property::{Property, PropertyValue};

/// A queued structural edit requested from inside `process()`.
///
/// Applied by the network right after the requesting processor returns;
/// applying one bumps the topology version, which makes the evaluator abort
/// the remainder of the current pass and schedule a fresh one.
pub type NetworkEdit = Box<dyn FnOnce(&mut ProcessorNetwork) -> Result<(), StructuralError> + Send>;

/// Whether a staged output slot was written during execution.
#[derive(Debug, Clone)]
pub(crate) enum Staged {
    /// The behavior did not touch this outport.
    Unchanged,
    /// The behavior produced new data.
    Set(PortValue),
    /// The behavior cleared the outport.
    Cleared,
}

#[derive(Debug, Clone)]
struct OutputSlot {
    identifier: String,
    staged: Staged,
}

/// One processor's inputs, staged outputs, and properties during execution.
pub struct ProcessContext {
    identifier: String,
    /// Per-inport data snapshot, in connection order.
    inputs: Vec<(String, Vec<PortValue>)>,
    outputs: Vec<OutputSlot>,
    properties: Vec<Property>,
    deferred: Vec<NetworkEdit>,
}

impl ProcessContext {
    pub(crate) fn new(
        identifier: String,
        inputs: Vec<(String, Vec<PortValue>)>,
        outports: Vec<String>,
        properties: Vec<Property>,
    ) -> Self {
        Self {
            identifier,
            inputs,
            outputs: outports
                .into_iter()
                .map(|identifier| OutputSlot {
                    identifier,
                    staged: Staged::Unchanged,
                })
                .collect(),
            properties,
            deferred: Vec::new(),
        }
    }

    /// Returns the identifier of the executing processor.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the first value available on an inport.
    #[must_use]
    pub fn input(&self, port: &str) -> Option<&PortValue> {
        self.inputs(port).first()
    }

    /// Returns all values available on an inport, in connection order.
    ///
    /// Returns an empty slice for unconnected or unknown ports.
    #[must_use]
    pub fn inputs(&self, port: &str) -> &[PortValue] {
        self.inputs
            .iter()
            .find(|(identifier, _)| identifier == port)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// Returns the first value on an inport, downcast to `T`.
    #[must_use]
    pub fn read<T: 'static>(&self, port: &str) -> Option<&T> {
        self.input(port).and_then(|value| value.downcast_ref::<T>())
    }

    /// Stages new data on an outport.
    pub fn set_output<T: Send + Sync + 'static>(&mut self, port: &str, value: T) {
        self.set_output_value(port, PortValue::new(value));
    }

    /// Stages an already-wrapped value on an outport.
    pub fn set_output_value(&mut self, port: &str, value: PortValue) {
        match self.slot_mut(port) {
            Some(slot) => slot.staged = Staged::Set(value),
            None => warn!(processor = %self.identifier, port, "write to unknown outport ignored"),
        }
    }

    /// Stages a clear of an outport, leaving downstream consumers without data.
    pub fn clear_output(&mut self, port: &str) {
        match self.slot_mut(port) {
            Some(slot) => slot.staged = Staged::Cleared,
            None => warn!(processor = %self.identifier, port, "clear of unknown outport ignored"),
        }
    }

    /// Stages a clear of every outport.
    pub fn clear_outputs(&mut self) {
        for slot in &mut self.outputs {
            slot.staged = Staged::Cleared;
        }
    }

    /// Returns the current value of one of the processor's own properties.
    #[must_use]
    pub fn property(&self, identifier: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.identifier == identifier)
            .map(|p| &p.value)
    }

    /// Queues a structural edit to run after this processor returns.
    ///
    /// This is the only way a behavior may mutate the network. Edits are
    /// applied in queue order; a failing edit is logged and skipped.
    pub fn defer<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut ProcessorNetwork) -> Result<(), StructuralError> + Send + 'static,
    {
        self.deferred.push(Box::new(edit));
    }

    fn slot_mut(&mut self, port: &str) -> Option<&mut OutputSlot> {
        self.outputs.iter_mut().find(|slot| slot.identifier == port)
    }

    /// Consumes the context into staged writes and deferred edits.
    pub(crate) fn into_effects(self) -> (Vec<(String, Staged)>, Vec<NetworkEdit>) {
        (
            self.outputs
                .into_iter()
                .map(|slot| (slot.identifier, slot.staged))
                .collect(),
            self.deferred,
        )
    }
}
