//! Network data model and mutation API for visnet (Layer 1).
//!
//! `visnet_network` provides the core abstractions for describing a dataflow
//! network of processors: typed ports, data connections, property links, and
//! the monotone invalidation state machine that tracks which processors must
//! re-execute.
//!
//! # Core Concepts
//!
//! - [`ProcessorNetwork`] - Exclusive owner of processors, connections, and links
//! - [`Processor`] - Behavior trait with a `process()` entry point
//! - [`InportSpec`] / [`OutportSpec`] - Typed data slots on a processor
//! - [`Connection`] / [`Link`] - Data edges between ports, value edges between properties
//! - [`InvalidationLevel`] - `Valid < InvalidOutput < InvalidResources` severity lattice
//! - [`NetworkLock`] - RAII scope that batches invalidations into one evaluation request
//! - [`ProcessorFactory`] - String-keyed registry used when restoring saved networks
//!
//! # Example
//!
//! ```ignore
//! use visnet_network::prelude::*;
//!
//! let mut network = ProcessorNetwork::new();
//! let source = network.add_processor("source", source_spec())?;
//! let sink = network.add_processor("sink", sink_spec())?;
//! network.add_connection(
//!     OutportRef::new(source, "out"),
//!     InportRef::new(sink, "in"),
//! )?;
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 1 of the visnet architecture:
//!
//! - **Layer 1** (`visnet_network`): network data model and mutation API (this crate)
//! - **Layer 2** (`visnet_eval`): evaluation scheduling over the network

/// Process context handed to processor behaviors.
pub mod context;

/// Data connections and property links.
pub mod connection;

/// Structural and processing error types.
pub mod error;

/// String-keyed processor constructor registry.
pub mod factory;

/// Invalidation severity lattice and pending queue.
pub mod invalidation;

/// RAII network lock for batching invalidations.
pub mod lock;

/// The processor network: ownership, mutation, and execution of single processors.
pub mod network;

/// Typed data slots on processors.
pub mod port;

/// Processor behavior trait, specs, and metadata.
pub mod processor;

/// Property values and per-property invalidation.
pub mod property;

/// Serde document model for saving and restoring networks.
pub mod snapshot;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::connection::{Connection, Link};
    pub use crate::context::ProcessContext;
    pub use crate::error::{ProcessError, StructuralError};
    pub use crate::factory::{FactoryError, ProcessorFactory};
    pub use crate::invalidation::InvalidationLevel;
    pub use crate::lock::NetworkLock;
    pub use crate::network::{Execution, ProcessorNetwork};
    pub use crate::port::{
        DataType, InportRef, InportSpec, OutportRef, OutportSpec, PortDirection, PortValue,
    };
    pub use crate::processor::{
        CodeState, Processor, ProcessorId, ProcessorInfo, ProcessorSpec,
    };
    pub use crate::property::{Property, PropertyRef, PropertyValue};
    pub use crate::snapshot::{NetworkSnapshot, RestoreReport};
}

// Re-export key types at crate root for convenience
pub use error::{ProcessError, StructuralError};
pub use invalidation::InvalidationLevel;
pub use lock::NetworkLock;
pub use network::{Execution, ProcessorNetwork};
pub use processor::{Processor, ProcessorId};
