//! Evaluation scheduling for visnet processor networks (Layer 2).
//!
//! `visnet_eval` decides *which* processors to run and in what order;
//! running a single processor is `visnet_network`'s job. The split keeps the
//! scheduler free of port and property mechanics: it only reads validity,
//! readiness, and the topology, and calls
//! [`ProcessorNetwork::execute`](visnet_network::ProcessorNetwork::execute).
//!
//! # Core Concepts
//!
//! - [`NetworkEvaluator`] - Drives a network to a settled state, pass by pass
//! - [`EvaluationReport`] - What ran, what failed, what is still blocked
//! - [`BackgroundPool`] - Worker threads for computations that should not
//!   stall evaluation, with completions applied back to the network
//!
//! # Example
//!
//! ```ignore
//! use visnet_eval::prelude::*;
//!
//! let evaluator = NetworkEvaluator::new();
//! if network.take_evaluation_request() {
//!     let report = evaluator.evaluate(&mut network);
//!     for failure in &report.failures {
//!         eprintln!("{failure}");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of the visnet architecture:
//!
//! - **Layer 1** (`visnet_network`): network data model and mutation API
//! - **Layer 2** (`visnet_eval`): evaluation scheduling over the network (this crate)

/// Worker threads for off-schedule computations.
pub mod background;

/// The pass-based network evaluator.
pub mod evaluator;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::background::{BackgroundPool, DrainOutcome};
    pub use crate::evaluator::{EvaluationReport, NetworkEvaluator, ProcessorFailure};
}

// Re-export key types at crate root for convenience
pub use background::{BackgroundPool, DrainOutcome};
pub use evaluator::{EvaluationReport, NetworkEvaluator, ProcessorFailure};
