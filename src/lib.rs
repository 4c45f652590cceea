//! A processor-network evaluation engine for interactive visualization pipelines.
//!

pub use visnet_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use visnet_internal::prelude::*;
}
