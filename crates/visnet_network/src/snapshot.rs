//! Serde document model for saving and restoring networks.
//!
//! A [`NetworkSnapshot`] captures the structure of a network - processors by
//! class identifier, property values, connections, and links - addressed by
//! processor identifier rather than by handle, so a snapshot stays valid
//! across sessions. Port data is deliberately not captured: a restored
//! network starts fully invalid and recomputes everything on its first
//! evaluation.
//!
//! Restoring is best-effort: every item that fails (unknown class, rejected
//! connection) is recorded in the [`RestoreReport`] and the rest of the
//! document is still applied.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::StructuralError;
use crate::factory::{FactoryError, ProcessorFactory};
use crate::network::ProcessorNetwork;
use crate::port::{InportRef, OutportRef};
use crate::processor::ProcessorId;
use crate::property::{PropertyRef, PropertyValue};

/// A saved network document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Processors in creation order.
    pub processors: Vec<ProcessorSnapshot>,
    /// Data connections, addressed by processor identifier.
    pub connections: Vec<ConnectionSnapshot>,
    /// Property links, addressed by processor identifier.
    pub links: Vec<LinkSnapshot>,
}

/// One processor in a saved network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    /// Network-unique identifier.
    pub identifier: String,
    /// Factory class used to rebuild the processor.
    pub class_identifier: String,
    /// Saved property values.
    pub properties: Vec<PropertySnapshot>,
}

/// One saved property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    /// Property identifier on the owning processor.
    pub identifier: String,
    /// Saved value.
    pub value: PropertyValue,
}

/// One saved data connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// Identifier of the producing processor.
    pub from: String,
    /// Outport identifier on the producer.
    pub outport: String,
    /// Identifier of the consuming processor.
    pub to: String,
    /// Inport identifier on the consumer.
    pub inport: String,
}

/// One saved property link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    /// Identifier of the source processor.
    pub from: String,
    /// Property identifier on the source.
    pub source: String,
    /// Identifier of the destination processor.
    pub to: String,
    /// Property identifier on the destination.
    pub destination: String,
}

/// A restore failure scoped to a single snapshot item.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The factory could not build a processor.
    #[error("processor '{identifier}': {error}")]
    Factory {
        /// Identifier of the processor that could not be rebuilt.
        identifier: String,
        /// The underlying factory error.
        error: FactoryError,
    },

    /// The network rejected an item while rebuilding.
    #[error("{item}: {error}")]
    Structural {
        /// Human-readable description of the rejected item.
        item: String,
        /// The underlying structural error.
        error: StructuralError,
    },

    /// An edge references a processor that was itself skipped.
    #[error("{item}: references missing processor '{processor}'")]
    MissingEndpoint {
        /// Human-readable description of the skipped item.
        item: String,
        /// Identifier of the missing processor.
        processor: String,
    },
}

/// Outcome of restoring a snapshot: what was rebuilt and what failed.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Handles of the processors that were rebuilt, in snapshot order.
    pub added: Vec<ProcessorId>,
    /// Items that could not be restored.
    pub errors: Vec<RestoreError>,
}

impl RestoreReport {
    /// Returns true if every item in the snapshot was restored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ProcessorNetwork {
    /// Captures the network's structure as a serializable document.
    ///
    /// Port data and validity are not captured; a restored network starts
    /// fully invalid.
    #[must_use]
    pub fn snapshot(&self) -> NetworkSnapshot {
        let processors = self
            .processor_ids()
            .filter_map(|id| self.state(id))
            .map(|state| ProcessorSnapshot {
                identifier: state.identifier.clone(),
                class_identifier: state.info.class_identifier.clone(),
                properties: state
                    .properties
                    .iter()
                    .map(|p| PropertySnapshot {
                        identifier: p.identifier.clone(),
                        value: p.value.clone(),
                    })
                    .collect(),
            })
            .collect();

        let name_of = |id: ProcessorId| self.identifier(id).unwrap_or_default().to_string();
        let connections = self
            .connections()
            .iter()
            .map(|c| ConnectionSnapshot {
                from: name_of(c.outport.processor),
                outport: c.outport.port.clone(),
                to: name_of(c.inport.processor),
                inport: c.inport.port.clone(),
            })
            .collect();
        let links = self
            .links()
            .iter()
            .map(|l| LinkSnapshot {
                from: name_of(l.source.processor),
                source: l.source.property.clone(),
                to: name_of(l.destination.processor),
                destination: l.destination.property.clone(),
            })
            .collect();

        NetworkSnapshot {
            processors,
            connections,
            links,
        }
    }

    /// Replaces the network's contents with the snapshot, building
    /// processors through the factory.
    ///
    /// Runs under an internal lock, so the whole restore raises a single
    /// evaluation request. Failed items are collected in the report; the
    /// rest of the snapshot is still applied.
    pub fn restore(
        &mut self,
        snapshot: &NetworkSnapshot,
        factory: &ProcessorFactory,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        let mut lock = self.lock();

        let existing: Vec<ProcessorId> = lock.processor_ids().collect();
        for id in existing {
            if let Err(error) = lock.remove_processor(id) {
                warn!(%error, "stale handle while clearing network for restore");
            }
        }

        let mut handles: HashMap<&str, ProcessorId> = HashMap::new();
        for processor in &snapshot.processors {
            let spec = match factory.create(&processor.class_identifier) {
                Ok(spec) => spec,
                Err(error) => {
                    report.errors.push(RestoreError::Factory {
                        identifier: processor.identifier.clone(),
                        error,
                    });
                    continue;
                }
            };
            let id = match lock.add_processor(processor.identifier.clone(), spec) {
                Ok(id) => id,
                Err(error) => {
                    report.errors.push(RestoreError::Structural {
                        item: format!("processor '{}'", processor.identifier),
                        error,
                    });
                    continue;
                }
            };
            handles.insert(processor.identifier.as_str(), id);
            report.added.push(id);

            for property in &processor.properties {
                let reference = PropertyRef::new(id, property.identifier.clone());
                if let Err(error) = lock.set_property(&reference, property.value.clone()) {
                    report.errors.push(RestoreError::Structural {
                        item: format!(
                            "property '{}.{}'",
                            processor.identifier, property.identifier
                        ),
                        error,
                    });
                }
            }
        }

        for connection in &snapshot.connections {
            let item = || {
                format!(
                    "connection {}.{} -> {}.{}",
                    connection.from, connection.outport, connection.to, connection.inport
                )
            };
            let (Some(&from), Some(&to)) = (
                handles.get(connection.from.as_str()),
                handles.get(connection.to.as_str()),
            ) else {
                let processor = if handles.contains_key(connection.from.as_str()) {
                    connection.to.clone()
                } else {
                    connection.from.clone()
                };
                report.errors.push(RestoreError::MissingEndpoint {
                    item: item(),
                    processor,
                });
                continue;
            };
            if let Err(error) = lock.add_connection(
                OutportRef::new(from, connection.outport.clone()),
                InportRef::new(to, connection.inport.clone()),
            ) {
                report.errors.push(RestoreError::Structural {
                    item: item(),
                    error,
                });
            }
        }

        for link in &snapshot.links {
            let item = || {
                format!(
                    "link {}.{} -> {}.{}",
                    link.from, link.source, link.to, link.destination
                )
            };
            let (Some(&from), Some(&to)) = (
                handles.get(link.from.as_str()),
                handles.get(link.to.as_str()),
            ) else {
                let processor = if handles.contains_key(link.from.as_str()) {
                    link.to.clone()
                } else {
                    link.from.clone()
                };
                report.errors.push(RestoreError::MissingEndpoint {
                    item: item(),
                    processor,
                });
                continue;
            };
            if let Err(error) = lock.add_link(
                PropertyRef::new(from, link.source.clone()),
                PropertyRef::new(to, link.destination.clone()),
            ) {
                report.errors.push(RestoreError::Structural {
                    item: item(),
                    error,
                });
            }
        }

        drop(lock);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProcessContext;
    use crate::error::ProcessError;
    use crate::invalidation::InvalidationLevel;
    use crate::port::{InportSpec, OutportSpec};
    use crate::processor::{Processor, ProcessorInfo, ProcessorSpec};
    use crate::property::Property;

    struct Noop;

    impl Processor for Noop {
        fn process(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn source_spec() -> ProcessorSpec {
        ProcessorSpec::new(ProcessorInfo::new("org.visnet.Source", "Source"), Noop)
            .with_outport(OutportSpec::new::<i32>("out"))
            .with_property(Property::new("value", 1i64))
    }

    fn sink_spec() -> ProcessorSpec {
        ProcessorSpec::new(ProcessorInfo::new("org.visnet.Sink", "Sink"), Noop)
            .with_inport(InportSpec::new::<i32>("in"))
            .with_property(Property::new("label", "unnamed"))
    }

    fn factory() -> ProcessorFactory {
        let mut factory = ProcessorFactory::new();
        factory.register("org.visnet.Source", source_spec);
        factory.register("org.visnet.Sink", sink_spec);
        factory
    }

    fn sample_network() -> ProcessorNetwork {
        let mut network = ProcessorNetwork::new();
        let source = network.add_processor("source", source_spec()).unwrap();
        let sink = network.add_processor("sink", sink_spec()).unwrap();
        network
            .add_connection(OutportRef::new(source, "out"), InportRef::new(sink, "in"))
            .unwrap();
        network
            .set_property(&PropertyRef::new(source, "value"), 42i64)
            .unwrap();
        network
    }

    #[test]
    fn snapshot_captures_structure() {
        let snapshot = sample_network().snapshot();
        assert_eq!(snapshot.processors.len(), 2);
        assert_eq!(snapshot.connections.len(), 1);
        assert_eq!(snapshot.processors[0].identifier, "source");
        assert_eq!(
            snapshot.processors[0].properties[0].value,
            PropertyValue::Int(42)
        );
    }

    #[test]
    fn snapshot_survives_json_roundtrip() {
        let snapshot = sample_network().snapshot();
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: NetworkSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn restore_rebuilds_the_network() {
        let snapshot = sample_network().snapshot();

        let mut network = ProcessorNetwork::new();
        let report = network.restore(&snapshot, &factory());
        assert!(report.is_complete(), "errors: {:?}", report.errors);
        assert_eq!(report.added.len(), 2);

        let source = network.processor_by_identifier("source").unwrap();
        assert_eq!(
            network
                .property_value(&PropertyRef::new(source, "value"))
                .and_then(PropertyValue::as_int),
            Some(42)
        );
        assert_eq!(network.connections().len(), 1);
        assert_eq!(
            network.validity(source),
            Some(InvalidationLevel::InvalidResources)
        );
        assert!(network.evaluation_requested());
    }

    #[test]
    fn restore_replaces_existing_contents() {
        let snapshot = sample_network().snapshot();
        let mut network = ProcessorNetwork::new();
        network.add_processor("leftover", source_spec()).unwrap();

        let report = network.restore(&snapshot, &factory());
        assert!(report.is_complete());
        assert!(network.processor_by_identifier("leftover").is_none());
        assert_eq!(network.processor_count(), 2);
    }

    #[test]
    fn restore_collects_errors_and_continues() {
        let mut snapshot = sample_network().snapshot();
        snapshot.processors[0].class_identifier = "org.visnet.Gone".to_string();

        let mut network = ProcessorNetwork::new();
        let report = network.restore(&snapshot, &factory());

        // the source is skipped, the sink still restores, the connection
        // dangles and is reported
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.errors.len(), 2);
        assert!(network.processor_by_identifier("sink").is_some());
        assert!(network.connections().is_empty());
        assert!(matches!(report.errors[0], RestoreError::Factory { .. }));
        assert!(matches!(
            report.errors[1],
            RestoreError::MissingEndpoint { .. }
        ));
    }
}
