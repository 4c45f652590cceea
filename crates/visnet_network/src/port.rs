//! Typed data slots on processors.
//!
//! Ports are declared on a processor as [`InportSpec`] (consumer) and
//! [`OutportSpec`] (producer) entries. Port data is a type-tagged shared
//! value ([`PortValue`]); connection compatibility is [`DataType`] equality.
//!
//! Connections never hold pointers into a processor: they address ports as
//! (processor handle, port identifier) pairs via [`OutportRef`] and
//! [`InportRef`], so removing a processor safely invalidates lookups.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use crate::invalidation::InvalidationLevel;
use crate::processor::ProcessorId;

/// The default port group name.
pub const DEFAULT_PORT_GROUP: &str = "default";

/// Direction of a port, used in error reporting and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// A consuming port.
    In,
    /// A producing port.
    Out,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::In => write!(f, "inport"),
            PortDirection::Out => write!(f, "outport"),
        }
    }
}

/// Runtime type tag for port data.
///
/// Two ports are assignment-compatible when their data types are equal.
/// The type name is carried alongside the [`TypeId`] for error messages.
#[derive(Debug, Clone, Copy)]
pub struct DataType {
    type_id: TypeId,
    name: &'static str,
}

impl DataType {
    /// Returns the data type tag for `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DataType {}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A shared, type-tagged value flowing through a connection.
///
/// Values are reference counted; cloning a `PortValue` never copies the
/// underlying data. Producers create values with [`PortValue::new`] and
/// consumers read them back with [`PortValue::downcast_ref`].
#[derive(Clone)]
pub struct PortValue {
    data_type: DataType,
    value: Arc<dyn Any + Send + Sync>,
}

impl PortValue {
    /// Wraps a value for transport through a port.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            data_type: DataType::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Returns the data type tag of the carried value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns a reference to the carried value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortValue")
            .field("data_type", &self.data_type.name())
            .finish_non_exhaustive()
    }
}

/// Declaration of a consuming port on a processor.
///
/// Single inports accept exactly one connection; multi-inports accept any
/// number. A non-optional inport must be connected (and hold data on every
/// connection) before the owning processor is considered ready.
#[derive(Debug, Clone)]
pub struct InportSpec {
    /// Port identifier, unique among the processor's ports.
    pub identifier: String,
    /// Data type accepted by this port.
    pub data_type: DataType,
    /// Whether the processor is ready without this port being connected.
    pub optional: bool,
    /// Maximum accepted connections; `None` means unbounded (multi-inport).
    pub max_connections: Option<usize>,
    /// Invalidation level applied to the owner when upstream data changes.
    pub on_change: InvalidationLevel,
    /// Port group this port belongs to. Metadata only, like
    /// [`CodeState`](crate::processor::CodeState): readiness is computed
    /// from the optional flag and connection data alone.
    pub group: String,
}

impl InportSpec {
    /// Declares a single inport carrying values of type `T`.
    #[must_use]
    pub fn new<T: Any>(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            data_type: DataType::of::<T>(),
            optional: false,
            max_connections: Some(1),
            on_change: InvalidationLevel::InvalidOutput,
            group: DEFAULT_PORT_GROUP.to_string(),
        }
    }

    /// Marks the port as optional: the owner may be ready while unconnected.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Allows an unbounded number of connections (multi-inport).
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.max_connections = None;
        self
    }

    /// Sets an explicit connection limit.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the invalidation level triggered by upstream data changes.
    #[must_use]
    pub fn with_on_change(mut self, level: InvalidationLevel) -> Self {
        self.on_change = level;
        self
    }

    /// Assigns the port to a named group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Declaration of a producing port on a processor.
#[derive(Debug, Clone)]
pub struct OutportSpec {
    /// Port identifier, unique among the processor's ports.
    pub identifier: String,
    /// Data type produced by this port.
    pub data_type: DataType,
    /// Port group this port belongs to. Metadata only; see
    /// [`InportSpec::group`].
    pub group: String,
}

impl OutportSpec {
    /// Declares an outport carrying values of type `T`.
    #[must_use]
    pub fn new<T: Any>(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            data_type: DataType::of::<T>(),
            group: DEFAULT_PORT_GROUP.to_string(),
        }
    }

    /// Assigns the port to a named group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Address of an outport: (processor handle, port identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutportRef {
    /// Handle of the owning processor.
    pub processor: ProcessorId,
    /// Identifier of the port on that processor.
    pub port: String,
}

impl OutportRef {
    /// Creates an outport reference.
    #[must_use]
    pub fn new(processor: ProcessorId, port: impl Into<String>) -> Self {
        Self {
            processor,
            port: port.into(),
        }
    }
}

impl fmt::Display for OutportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.port)
    }
}

/// Address of an inport: (processor handle, port identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InportRef {
    /// Handle of the owning processor.
    pub processor: ProcessorId,
    /// Identifier of the port on that processor.
    pub port: String,
}

impl InportRef {
    /// Creates an inport reference.
    #[must_use]
    pub fn new(processor: ProcessorId, port: impl Into<String>) -> Self {
        Self {
            processor,
            port: port.into(),
        }
    }
}

impl fmt::Display for InportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_equality_is_by_type() {
        assert_eq!(DataType::of::<i32>(), DataType::of::<i32>());
        assert_ne!(DataType::of::<i32>(), DataType::of::<f64>());
    }

    #[test]
    fn port_value_roundtrip() {
        let value = PortValue::new(vec![1u8, 2, 3]);
        assert_eq!(value.data_type(), DataType::of::<Vec<u8>>());
        assert_eq!(value.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
        assert!(value.downcast_ref::<String>().is_none());
    }

    #[test]
    fn port_value_clone_shares_data() {
        let value = PortValue::new(String::from("volume"));
        let clone = value.clone();
        assert!(core::ptr::eq(
            value.downcast_ref::<String>().unwrap(),
            clone.downcast_ref::<String>().unwrap()
        ));
    }

    #[test]
    fn inport_spec_defaults() {
        let spec = InportSpec::new::<i32>("in");
        assert_eq!(spec.max_connections, Some(1));
        assert!(!spec.optional);
        assert_eq!(spec.on_change, InvalidationLevel::InvalidOutput);
        assert_eq!(spec.group, DEFAULT_PORT_GROUP);
    }

    #[test]
    fn inport_spec_builders() {
        let spec = InportSpec::new::<i32>("in")
            .optional()
            .multi()
            .with_on_change(InvalidationLevel::InvalidResources)
            .with_group("lighting");
        assert!(spec.optional);
        assert_eq!(spec.max_connections, None);
        assert_eq!(spec.on_change, InvalidationLevel::InvalidResources);
        assert_eq!(spec.group, "lighting");
    }

    #[test]
    fn port_ref_display() {
        let outport = OutportRef::new(ProcessorId::new(3), "image");
        assert_eq!(format!("{outport}"), "processor_3.image");
    }
}
