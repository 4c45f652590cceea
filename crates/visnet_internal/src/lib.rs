//! # Visnet Internal Library
//!
//! Re-exports the core visnet crates for convenience.

/// Layer 1: Network data model and mutation API.
pub use visnet_network;

/// Layer 2: Evaluation scheduling over the network.
pub use visnet_eval;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use visnet_eval::prelude::*;
    pub use visnet_network::prelude::*;
}
