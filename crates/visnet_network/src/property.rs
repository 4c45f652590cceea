//! Property values and per-property invalidation.
//!
//! Properties are named parameters owned by a processor. Setting a property
//! through [`ProcessorNetwork::set_property`](crate::network::ProcessorNetwork::set_property)
//! invalidates the owner at the property's `on_change` level and propagates
//! the value along any [`Link`](crate::connection::Link)s.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::invalidation::InvalidationLevel;
use crate::processor::ProcessorId;

/// A property value.
///
/// Kept deliberately small: the network core only needs values it can
/// compare, link, and serialize. Domain-specific payloads travel through
/// ports, not properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A text value.
    String(String),
}

impl PropertyValue {
    /// Returns the boolean value, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float value, if this is a `Float`.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

/// A named parameter on a processor.
#[derive(Debug, Clone)]
pub struct Property {
    /// Identifier, unique among the processor's properties.
    pub identifier: String,
    /// Current value.
    pub value: PropertyValue,
    /// Invalidation level applied to the owner when the value changes.
    pub on_change: InvalidationLevel,
}

impl Property {
    /// Creates a property that invalidates the owner's output on change.
    #[must_use]
    pub fn new(identifier: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            identifier: identifier.into(),
            value: value.into(),
            on_change: InvalidationLevel::InvalidOutput,
        }
    }

    /// Sets the invalidation level applied to the owner on change.
    #[must_use]
    pub fn with_on_change(mut self, level: InvalidationLevel) -> Self {
        self.on_change = level;
        self
    }
}

/// Address of a property: (processor handle, property identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    /// Handle of the owning processor.
    pub processor: ProcessorId,
    /// Identifier of the property on that processor.
    pub property: String,
}

impl PropertyRef {
    /// Creates a property reference.
    #[must_use]
    pub fn new(processor: ProcessorId, property: impl Into<String>) -> Self {
        Self {
            processor,
            property: property.into(),
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::Int(4).as_int(), Some(4));
        assert_eq!(PropertyValue::Float(0.5).as_float(), Some(0.5));
        assert_eq!(PropertyValue::String("iso".into()).as_str(), Some("iso"));
        assert_eq!(PropertyValue::Bool(true).as_int(), None);
    }

    #[test]
    fn value_serde_roundtrip() {
        let value = PropertyValue::Float(1.25);
        let json = serde_json::to_string(&value).unwrap();
        let back: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn property_defaults_to_invalid_output() {
        let property = Property::new("iso_value", 0.5);
        assert_eq!(property.on_change, InvalidationLevel::InvalidOutput);
    }

    #[test]
    fn property_ref_display() {
        let reference = PropertyRef::new(ProcessorId::new(1), "iso_value");
        assert_eq!(format!("{reference}"), "processor_1.iso_value");
    }
}
