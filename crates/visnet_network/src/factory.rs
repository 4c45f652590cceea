//! String-keyed processor constructor registry.
//!
//! Saved networks record processors by class identifier; restoring one needs
//! a way to build a fresh [`ProcessorSpec`] from that string. Applications
//! register a constructor per class and hand the factory to
//! [`ProcessorNetwork::restore`](crate::network::ProcessorNetwork::restore).

use hashbrown::HashMap;
use thiserror::Error;

use crate::processor::ProcessorSpec;

/// Error raised when the factory cannot build a processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No constructor is registered for this class identifier.
    #[error("no processor class '{0}' is registered")]
    UnknownClass(String),
}

type Constructor = Box<dyn Fn() -> ProcessorSpec + Send + Sync>;

/// Registry of processor constructors, keyed by class identifier.
#[derive(Default)]
pub struct ProcessorFactory {
    constructors: HashMap<String, Constructor>,
}

impl ProcessorFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for a class identifier, replacing any
    /// previous registration for the same class.
    pub fn register<F>(&mut self, class_identifier: impl Into<String>, constructor: F)
    where
        F: Fn() -> ProcessorSpec + Send + Sync + 'static,
    {
        self.constructors
            .insert(class_identifier.into(), Box::new(constructor));
    }

    /// Builds a fresh spec for the given class.
    ///
    /// # Errors
    ///
    /// [`FactoryError::UnknownClass`] if no constructor is registered.
    pub fn create(&self, class_identifier: &str) -> Result<ProcessorSpec, FactoryError> {
        self.constructors
            .get(class_identifier)
            .map(|constructor| constructor())
            .ok_or_else(|| FactoryError::UnknownClass(class_identifier.to_string()))
    }

    /// Returns true if a constructor is registered for this class.
    #[must_use]
    pub fn contains(&self, class_identifier: &str) -> bool {
        self.constructors.contains_key(class_identifier)
    }

    /// Returns the registered class identifiers, sorted.
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }
}

impl core::fmt::Debug for ProcessorFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessorFactory")
            .field("classes", &self.classes())
            .finish()
    }
}
