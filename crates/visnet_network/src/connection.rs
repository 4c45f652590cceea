//! Data connections and property links.
//!
//! A [`Connection`] is a directed data edge from one outport to one inport;
//! a [`Link`] is a directed value edge from one property to another. Both
//! address their endpoints as (handle, identifier) pairs and are owned
//! exclusively by the [`ProcessorNetwork`](crate::network::ProcessorNetwork).

use core::fmt;

use crate::port::{InportRef, OutportRef};
use crate::property::PropertyRef;

/// A directed data edge binding exactly one outport to one inport slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// The producing endpoint.
    pub outport: OutportRef,
    /// The consuming endpoint.
    pub inport: InportRef,
}

impl Connection {
    /// Creates a connection between the given endpoints.
    #[must_use]
    pub fn new(outport: OutportRef, inport: InportRef) -> Self {
        Self { outport, inport }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.outport, self.inport)
    }
}

/// A directed value edge from a source property to a destination property.
///
/// Bidirectional linking is expressed as two links, one in each direction;
/// propagation uses a visited set, so link cycles are harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// The property the value is read from.
    pub source: PropertyRef,
    /// The property the value is written to.
    pub destination: PropertyRef,
}

impl Link {
    /// Creates a link between the given properties.
    #[must_use]
    pub fn new(source: PropertyRef, destination: PropertyRef) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessorId;

    #[test]
    fn connection_display() {
        let connection = Connection::new(
            OutportRef::new(ProcessorId::new(0), "image"),
            InportRef::new(ProcessorId::new(1), "image"),
        );
        assert_eq!(format!("{connection}"), "processor_0.image -> processor_1.image");
    }

    #[test]
    fn link_display() {
        let link = Link::new(
            PropertyRef::new(ProcessorId::new(0), "camera"),
            PropertyRef::new(ProcessorId::new(1), "camera"),
        );
        assert_eq!(format!("{link}"), "processor_0.camera -> processor_1.camera");
    }
}
