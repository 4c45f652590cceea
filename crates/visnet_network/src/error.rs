//! Structural and processing error types.
//!
//! The taxonomy separates three channels:
//!
//! - [`StructuralError`] - raised synchronously from network mutation calls;
//!   the mutation does not take effect and the network is left unchanged.
//! - [`ProcessError`] - a failure inside a processor's `process()`; caught
//!   per-processor by the evaluator, reported, and retried on a later pass.
//! - Consistency (topology version mismatch mid-pass) is not an error type
//!   at all: the evaluator handles it internally by restarting the pass.
//!
//! "Not ready" is a query, never an error.

use core::fmt;
use std::error::Error;

use thiserror::Error;

use crate::port::{InportRef, OutportRef, PortDirection};
use crate::processor::ProcessorId;
use crate::property::PropertyRef;

/// Error raised by a network mutation that was rejected.
///
/// Mutations have strong exception safety: when one of these is returned,
/// the network is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    /// Connecting these ports would make the processor graph cyclic.
    #[error("connecting {outport} to {inport} would create a cycle")]
    CyclicDependency {
        /// The producing endpoint of the rejected connection.
        outport: OutportRef,
        /// The consuming endpoint of the rejected connection.
        inport: InportRef,
    },

    /// The ports carry different data types.
    #[error("cannot connect {outport} ({found}) to {inport} ({expected}): incompatible data types")]
    IncompatibleType {
        /// The producing endpoint of the rejected connection.
        outport: OutportRef,
        /// The consuming endpoint of the rejected connection.
        inport: InportRef,
        /// Type accepted by the inport.
        expected: &'static str,
        /// Type produced by the outport.
        found: &'static str,
    },

    /// The inport already holds its maximum number of connections.
    #[error("{inport} accepts at most {max} connection(s)")]
    ArityExceeded {
        /// The consuming endpoint of the rejected connection.
        inport: InportRef,
        /// The inport's connection limit.
        max: usize,
    },

    /// A processor with this identifier already exists in the network.
    #[error("a processor with identifier '{0}' already exists in the network")]
    DuplicateIdentifier(String),

    /// A processor spec declares two ports or properties with the same identifier.
    #[error("processor '{identifier}' declares '{member}' more than once")]
    DuplicateMember {
        /// Identifier of the processor being added.
        identifier: String,
        /// The duplicated port or property identifier.
        member: String,
    },

    /// These ports are already connected.
    #[error("{outport} is already connected to {inport}")]
    DuplicateConnection {
        /// The producing endpoint.
        outport: OutportRef,
        /// The consuming endpoint.
        inport: InportRef,
    },

    /// These ports are not connected.
    #[error("{outport} is not connected to {inport}")]
    UnknownConnection {
        /// The producing endpoint.
        outport: OutportRef,
        /// The consuming endpoint.
        inport: InportRef,
    },

    /// These properties are already linked in this direction.
    #[error("{source_property} is already linked to {destination}")]
    DuplicateLink {
        /// The source property.
        source_property: PropertyRef,
        /// The destination property.
        destination: PropertyRef,
    },

    /// These properties are not linked in this direction.
    #[error("{source_property} is not linked to {destination}")]
    UnknownLink {
        /// The source property.
        source_property: PropertyRef,
        /// The destination property.
        destination: PropertyRef,
    },

    /// A property cannot be linked to itself.
    #[error("cannot link {0} to itself")]
    SelfLink(PropertyRef),

    /// No processor with this handle exists in the network.
    #[error("no processor {0} in the network")]
    UnknownProcessor(ProcessorId),

    /// The processor has no port with this identifier and direction.
    #[error("processor {processor} has no {direction} '{port}'")]
    UnknownPort {
        /// The processor that was addressed.
        processor: ProcessorId,
        /// The missing port identifier.
        port: String,
        /// Whether an inport or an outport was looked up.
        direction: PortDirection,
    },

    /// The processor has no property with this identifier.
    #[error("processor {processor} has no property '{property}'")]
    UnknownProperty {
        /// The processor that was addressed.
        processor: ProcessorId,
        /// The missing property identifier.
        property: String,
    },
}

/// A failure raised from a processor's `process()` (or resource
/// initialization).
///
/// The evaluator catches these per-processor: the failure is reported with
/// the processor identifier, the processor stays invalid for retry, and the
/// rest of the pass continues.
#[derive(Debug, Error)]
pub struct ProcessError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProcessError {
    /// Creates a process error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a process error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for ProcessError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProcessError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_error_display() {
        let error = StructuralError::ArityExceeded {
            inport: InportRef::new(ProcessorId::new(2), "volume"),
            max: 1,
        };
        assert_eq!(
            format!("{error}"),
            "processor_2.volume accepts at most 1 connection(s)"
        );
    }

    #[test]
    fn process_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.raw");
        let error = ProcessError::with_source("could not load volume", io);
        assert_eq!(error.message(), "could not load volume");
        assert!(error.source().is_some());
    }
}
