//! The processor network: exclusive owner of processors, connections, and
//! links.
//!
//! All mutation goes through `&mut self` methods that validate first and
//! mutate only on success, so a returned [`StructuralError`] always leaves
//! the network unchanged. Processors are stored in an arena keyed by
//! [`ProcessorId`]; handles are allocated monotonically and never reused.
//!
//! The network also executes single processors ([`ProcessorNetwork::execute`]).
//! Deciding *which* processors to run, and in what order, is the scheduler's
//! job in `visnet_eval`; the network only knows how to run one.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::connection::{Connection, Link};
use crate::context::{NetworkEdit, ProcessContext, Staged};
use crate::error::{ProcessError, StructuralError};
use crate::invalidation::{InvalidationLevel, PendingInvalidations};
use crate::lock::NetworkLock;
use crate::port::{InportRef, OutportRef, PortDirection, PortValue};
use crate::processor::{
    OutportState, Processor, ProcessorId, ProcessorInfo, ProcessorSpec, ProcessorState,
};
use crate::property::{PropertyRef, PropertyValue};

/// Outcome of executing a single processor.
#[derive(Debug)]
#[must_use]
pub enum Execution {
    /// `process()` returned successfully; the processor is now valid.
    Completed,
    /// The processor was not ready; `if_not_ready` ran instead and the
    /// processor stays invalid.
    NotReady,
    /// `process()` (or resource initialization) failed; the processor stays
    /// invalid and its staged output writes were discarded.
    Failed(ProcessError),
}

/// A dataflow network of processors.
///
/// Owns every processor, connection, and link. Mutations validate before
/// they mutate, keep the graph acyclic, and record invalidations in a
/// pending queue that the evaluator drains.
#[derive(Debug, Default)]
pub struct ProcessorNetwork {
    processors: HashMap<ProcessorId, ProcessorState>,
    /// Creation order of live processors; the deterministic tie-break for
    /// scheduling.
    order: Vec<ProcessorId>,
    connections: Vec<Connection>,
    links: Vec<Link>,
    next_id: usize,
    /// Bumped on every change to the set of processors or connections.
    version: u64,
    /// Nesting depth of [`NetworkLock`]s currently held.
    locked: u32,
    pending: PendingInvalidations,
    evaluation_requested: bool,
}

impl ProcessorNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── processors ──────────────────────────────────────────────────────

    /// Adds a processor under the given identifier.
    ///
    /// The new processor starts at [`InvalidationLevel::InvalidResources`],
    /// so its resources are initialized before its first `process()`.
    ///
    /// # Errors
    ///
    /// [`StructuralError::DuplicateIdentifier`] if the identifier is taken,
    /// [`StructuralError::DuplicateMember`] if the spec declares two ports or
    /// two properties with the same identifier.
    pub fn add_processor(
        &mut self,
        identifier: impl Into<String>,
        spec: ProcessorSpec,
    ) -> Result<ProcessorId, StructuralError> {
        let identifier = identifier.into();
        if self.processor_by_identifier(&identifier).is_some() {
            return Err(StructuralError::DuplicateIdentifier(identifier));
        }

        let mut ports = HashSet::new();
        for port in spec
            .inports
            .iter()
            .map(|p| &p.identifier)
            .chain(spec.outports.iter().map(|p| &p.identifier))
        {
            if !ports.insert(port.as_str()) {
                return Err(StructuralError::DuplicateMember {
                    identifier,
                    member: port.clone(),
                });
            }
        }
        drop(ports);
        let mut properties = HashSet::new();
        for property in spec.properties.iter().map(|p| &p.identifier) {
            if !properties.insert(property.as_str()) {
                return Err(StructuralError::DuplicateMember {
                    identifier,
                    member: property.clone(),
                });
            }
        }
        drop(properties);

        let id = ProcessorId(self.next_id);
        self.next_id += 1;
        debug!(processor = %id, identifier, class = spec.info.class_identifier, "adding processor");

        self.processors.insert(
            id,
            ProcessorState {
                identifier,
                info: spec.info,
                inports: spec.inports,
                outports: spec
                    .outports
                    .into_iter()
                    .map(|spec| OutportState { spec, data: None })
                    .collect(),
                properties: spec.properties,
                validity: InvalidationLevel::Valid,
                behavior: Some(spec.behavior),
            },
        );
        self.order.push(id);
        self.version += 1;
        self.invalidate_unchecked(id, InvalidationLevel::InvalidResources);
        Ok(id)
    }

    /// Removes a processor together with every connection and link touching
    /// it. Consumers of its outports are invalidated.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] if the handle is stale.
    pub fn remove_processor(&mut self, processor: ProcessorId) -> Result<(), StructuralError> {
        if !self.processors.contains_key(&processor) {
            return Err(StructuralError::UnknownProcessor(processor));
        }
        debug!(processor = %processor, "removing processor");

        let consumers: Vec<(ProcessorId, InvalidationLevel)> = self
            .connections
            .iter()
            .filter(|c| c.outport.processor == processor)
            .filter_map(|c| {
                self.processors
                    .get(&c.inport.processor)
                    .and_then(|s| s.inport(&c.inport.port))
                    .map(|spec| (c.inport.processor, spec.on_change))
            })
            .collect();

        self.connections
            .retain(|c| c.outport.processor != processor && c.inport.processor != processor);
        self.links
            .retain(|l| l.source.processor != processor && l.destination.processor != processor);
        self.processors.remove(&processor);
        self.order.retain(|id| *id != processor);
        self.pending.remove(processor);
        self.version += 1;

        for (consumer, level) in consumers {
            self.invalidate_unchecked(consumer, level);
        }
        if self.locked == 0 && !self.pending.is_empty() {
            self.evaluation_requested = true;
        }
        Ok(())
    }

    /// Returns an identifier not used by any processor, derived from `base`
    /// by appending a counter (`"source"`, `"source 2"`, `"source 3"`, ...).
    #[must_use]
    pub fn unique_identifier(&self, base: &str) -> String {
        if self.processor_by_identifier(base).is_none() {
            return base.to_string();
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base} {n}");
            if self.processor_by_identifier(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    // ─── connections ─────────────────────────────────────────────────────

    /// Connects an outport to an inport.
    ///
    /// Validation runs in a fixed order: both processors exist, both ports
    /// exist, the connection is not a duplicate, the data types match, the
    /// inport has a free slot, and the edge keeps the graph acyclic. On
    /// success the consumer is invalidated at the inport's `on_change` level.
    ///
    /// # Errors
    ///
    /// The corresponding [`StructuralError`] for the first check that fails.
    pub fn add_connection(
        &mut self,
        outport: OutportRef,
        inport: InportRef,
    ) -> Result<(), StructuralError> {
        let producer = self
            .processors
            .get(&outport.processor)
            .ok_or(StructuralError::UnknownProcessor(outport.processor))?;
        let consumer = self
            .processors
            .get(&inport.processor)
            .ok_or(StructuralError::UnknownProcessor(inport.processor))?;
        let out_state = producer
            .outport(&outport.port)
            .ok_or_else(|| StructuralError::UnknownPort {
                processor: outport.processor,
                port: outport.port.clone(),
                direction: PortDirection::Out,
            })?;
        let in_spec = consumer
            .inport(&inport.port)
            .ok_or_else(|| StructuralError::UnknownPort {
                processor: inport.processor,
                port: inport.port.clone(),
                direction: PortDirection::In,
            })?;

        if self
            .connections
            .iter()
            .any(|c| c.outport == outport && c.inport == inport)
        {
            return Err(StructuralError::DuplicateConnection { outport, inport });
        }
        if out_state.spec.data_type != in_spec.data_type {
            return Err(StructuralError::IncompatibleType {
                expected: in_spec.data_type.name(),
                found: out_state.spec.data_type.name(),
                outport,
                inport,
            });
        }
        if let Some(max) = in_spec.max_connections {
            let current = self.connections.iter().filter(|c| c.inport == inport).count();
            if current >= max {
                return Err(StructuralError::ArityExceeded { inport, max });
            }
        }
        if outport.processor == inport.processor
            || self.reaches(inport.processor, outport.processor)
        {
            return Err(StructuralError::CyclicDependency { outport, inport });
        }

        let consumer_id = inport.processor;
        let on_change = in_spec.on_change;
        debug!(connection = %Connection::new(outport.clone(), inport.clone()), "adding connection");
        self.connections.push(Connection::new(outport, inport));
        self.version += 1;
        self.invalidate_unchecked(consumer_id, on_change);
        Ok(())
    }

    /// Removes the connection between the given ports and invalidates the
    /// consumer, which has lost an input.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownConnection`] if the ports are not connected.
    pub fn remove_connection(
        &mut self,
        outport: OutportRef,
        inport: InportRef,
    ) -> Result<(), StructuralError> {
        let Some(position) = self
            .connections
            .iter()
            .position(|c| c.outport == outport && c.inport == inport)
        else {
            return Err(StructuralError::UnknownConnection { outport, inport });
        };
        self.connections.remove(position);
        self.version += 1;

        let on_change = self
            .processors
            .get(&inport.processor)
            .and_then(|s| s.inport(&inport.port))
            .map_or(InvalidationLevel::InvalidOutput, |spec| spec.on_change);
        self.invalidate_unchecked(inport.processor, on_change);
        Ok(())
    }

    /// Returns true if the given ports are connected.
    #[must_use]
    pub fn is_connected(&self, outport: &OutportRef, inport: &InportRef) -> bool {
        self.connections
            .iter()
            .any(|c| c.outport == *outport && c.inport == *inport)
    }

    /// Returns all connections, in creation order.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    // ─── links ───────────────────────────────────────────────────────────

    /// Links a source property to a destination property.
    ///
    /// The source's current value is propagated to the destination
    /// immediately, then on every subsequent change. Bidirectional linking
    /// is two calls, one per direction.
    ///
    /// # Errors
    ///
    /// [`StructuralError::SelfLink`], [`StructuralError::UnknownProcessor`],
    /// [`StructuralError::UnknownProperty`], or
    /// [`StructuralError::DuplicateLink`].
    pub fn add_link(
        &mut self,
        source: PropertyRef,
        destination: PropertyRef,
    ) -> Result<(), StructuralError> {
        if source == destination {
            return Err(StructuralError::SelfLink(source));
        }
        let value = self
            .processors
            .get(&source.processor)
            .ok_or(StructuralError::UnknownProcessor(source.processor))?
            .property(&source.property)
            .ok_or_else(|| StructuralError::UnknownProperty {
                processor: source.processor,
                property: source.property.clone(),
            })?
            .value
            .clone();
        self.processors
            .get(&destination.processor)
            .ok_or(StructuralError::UnknownProcessor(destination.processor))?
            .property(&destination.property)
            .ok_or_else(|| StructuralError::UnknownProperty {
                processor: destination.processor,
                property: destination.property.clone(),
            })?;
        if self
            .links
            .iter()
            .any(|l| l.source == source && l.destination == destination)
        {
            return Err(StructuralError::DuplicateLink {
                source_property: source,
                destination,
            });
        }

        self.links
            .push(Link::new(source.clone(), destination.clone()));
        let mut visited = HashSet::new();
        visited.insert(source);
        self.propagate_property(destination, value, &mut visited);
        Ok(())
    }

    /// Removes the link between the given properties.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownLink`] if no such link exists.
    pub fn remove_link(
        &mut self,
        source: PropertyRef,
        destination: PropertyRef,
    ) -> Result<(), StructuralError> {
        let Some(position) = self
            .links
            .iter()
            .position(|l| l.source == source && l.destination == destination)
        else {
            return Err(StructuralError::UnknownLink {
                source_property: source,
                destination,
            });
        };
        self.links.remove(position);
        Ok(())
    }

    /// Returns true if `source` is linked to `destination` in that direction.
    #[must_use]
    pub fn is_linked(&self, source: &PropertyRef, destination: &PropertyRef) -> bool {
        self.links
            .iter()
            .any(|l| l.source == *source && l.destination == *destination)
    }

    /// Returns true if the two properties are linked in both directions.
    #[must_use]
    pub fn is_linked_bidirectional(&self, a: &PropertyRef, b: &PropertyRef) -> bool {
        self.is_linked(a, b) && self.is_linked(b, a)
    }

    /// Returns all links, in creation order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    // ─── properties ──────────────────────────────────────────────────────

    /// Sets a property value, invalidating the owner at the property's
    /// `on_change` level and propagating the value along links.
    ///
    /// Setting a property to its current value is a no-op and stops
    /// propagation, so bidirectional links settle instead of ping-ponging.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] or
    /// [`StructuralError::UnknownProperty`].
    pub fn set_property(
        &mut self,
        reference: &PropertyRef,
        value: impl Into<PropertyValue>,
    ) -> Result<(), StructuralError> {
        let state = self
            .processors
            .get(&reference.processor)
            .ok_or(StructuralError::UnknownProcessor(reference.processor))?;
        if state.property(&reference.property).is_none() {
            return Err(StructuralError::UnknownProperty {
                processor: reference.processor,
                property: reference.property.clone(),
            });
        }
        let mut visited = HashSet::new();
        self.propagate_property(reference.clone(), value.into(), &mut visited);
        Ok(())
    }

    /// Returns the current value of a property, if it exists.
    #[must_use]
    pub fn property_value(&self, reference: &PropertyRef) -> Option<&PropertyValue> {
        self.processors
            .get(&reference.processor)
            .and_then(|s| s.property(&reference.property))
            .map(|p| &p.value)
    }

    /// Writes `value` into `start` and floods it along outgoing links.
    /// `visited` bounds the walk so link cycles terminate; an unchanged
    /// value stops propagation early.
    fn propagate_property(
        &mut self,
        start: PropertyRef,
        value: PropertyValue,
        visited: &mut HashSet<PropertyRef>,
    ) {
        let mut queue = vec![(start, value)];
        while let Some((target, value)) = queue.pop() {
            if !visited.insert(target.clone()) {
                continue;
            }
            let changed = match self
                .processors
                .get_mut(&target.processor)
                .and_then(|s| s.property_mut(&target.property))
            {
                Some(property) if property.value != value => {
                    property.value = value.clone();
                    true
                }
                _ => false,
            };
            if !changed {
                continue;
            }
            if let Some(level) = self
                .processors
                .get(&target.processor)
                .and_then(|s| s.property(&target.property))
                .map(|p| p.on_change)
            {
                self.invalidate_unchecked(target.processor, level);
            }
            for link in &self.links {
                if link.source == target && !visited.contains(&link.destination) {
                    queue.push((link.destination.clone(), value.clone()));
                }
            }
        }
    }

    // ─── invalidation ────────────────────────────────────────────────────

    /// Invalidates a processor, escalating its validity to at least `level`
    /// and marking everything downstream of it as having stale outputs.
    ///
    /// Levels never de-escalate here; only a successful `process()` resets a
    /// processor to valid. When the network is unlocked this also raises the
    /// evaluation request flag.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] if the handle is stale.
    pub fn invalidate(
        &mut self,
        processor: ProcessorId,
        level: InvalidationLevel,
    ) -> Result<(), StructuralError> {
        if !self.processors.contains_key(&processor) {
            return Err(StructuralError::UnknownProcessor(processor));
        }
        self.invalidate_unchecked(processor, level);
        Ok(())
    }

    fn invalidate_unchecked(&mut self, processor: ProcessorId, level: InvalidationLevel) {
        if level == InvalidationLevel::Valid {
            return;
        }
        let mut best: HashMap<ProcessorId, InvalidationLevel> = HashMap::new();
        let mut stack = vec![(processor, level)];
        while let Some((id, level)) = stack.pop() {
            match best.get(&id) {
                Some(seen) if *seen >= level => continue,
                _ => {
                    best.insert(id, level);
                }
            }
            if let Some(state) = self.processors.get_mut(&id) {
                if level > state.validity {
                    state.validity = level;
                }
                if state.validity > InvalidationLevel::Valid {
                    self.pending.record(id, state.validity);
                }
            } else {
                continue;
            }
            let successors: Vec<(ProcessorId, InvalidationLevel)> = self
                .connections
                .iter()
                .filter(|c| c.outport.processor == id)
                .filter_map(|c| {
                    self.processors
                        .get(&c.inport.processor)
                        .and_then(|s| s.inport(&c.inport.port))
                        .map(|spec| (c.inport.processor, spec.on_change))
                })
                .filter(|(_, level)| *level > InvalidationLevel::Valid)
                .collect();
            stack.extend(successors);
        }
        if self.locked == 0 && !self.pending.is_empty() {
            self.evaluation_requested = true;
        }
    }

    /// Returns a processor's current validity.
    #[must_use]
    pub fn validity(&self, processor: ProcessorId) -> Option<InvalidationLevel> {
        self.processors.get(&processor).map(|s| s.validity)
    }

    // ─── readiness and execution ─────────────────────────────────────────

    /// Returns true if every non-optional inport is connected and every
    /// connection into a non-optional inport carries data.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] if the handle is stale.
    pub fn is_ready(&self, processor: ProcessorId) -> Result<bool, StructuralError> {
        let state = self
            .processors
            .get(&processor)
            .ok_or(StructuralError::UnknownProcessor(processor))?;
        for inport in &state.inports {
            if inport.optional {
                continue;
            }
            let mut connected = 0usize;
            for connection in &self.connections {
                if connection.inport.processor != processor
                    || connection.inport.port != inport.identifier
                {
                    continue;
                }
                connected += 1;
                let has_data = self
                    .processors
                    .get(&connection.outport.processor)
                    .and_then(|s| s.outport(&connection.outport.port))
                    .is_some_and(|o| o.data.is_some());
                if !has_data {
                    return Ok(false);
                }
            }
            if connected == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Executes a single processor.
    ///
    /// Inputs are snapshotted, the behavior runs against an owned
    /// [`ProcessContext`], and only on success are the staged output writes
    /// applied (invalidating consumers) and the processor marked valid. A
    /// processor invalidated at [`InvalidationLevel::InvalidResources`] gets
    /// `initialize_resources` first. Deferred network edits queued by the
    /// behavior are applied after it returns.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] if the handle is stale. A
    /// failure inside the behavior is *not* an `Err`; it is reported as
    /// [`Execution::Failed`].
    pub fn execute(&mut self, processor: ProcessorId) -> Result<Execution, StructuralError> {
        let ready = self.is_ready(processor)?;
        let state = self
            .processors
            .get(&processor)
            .ok_or(StructuralError::UnknownProcessor(processor))?;

        let mut inputs: Vec<(String, Vec<PortValue>)> = Vec::with_capacity(state.inports.len());
        for inport in &state.inports {
            let mut values = Vec::new();
            for connection in &self.connections {
                if connection.inport.processor != processor
                    || connection.inport.port != inport.identifier
                {
                    continue;
                }
                if let Some(data) = self
                    .processors
                    .get(&connection.outport.processor)
                    .and_then(|s| s.outport(&connection.outport.port))
                    .and_then(|o| o.data.as_ref())
                {
                    values.push(data.clone());
                }
            }
            inputs.push((inport.identifier.clone(), values));
        }
        let outports = state
            .outports
            .iter()
            .map(|o| o.spec.identifier.clone())
            .collect();
        let properties = state.properties.clone();
        let identifier = state.identifier.clone();
        let validity = state.validity;

        let mut ctx = ProcessContext::new(identifier, inputs, outports, properties);
        let Some(mut behavior) = self
            .processors
            .get_mut(&processor)
            .and_then(|s| s.behavior.take())
        else {
            warn!(processor = %processor, "behavior unavailable for execution");
            return Ok(Execution::Failed(ProcessError::new(
                "processor behavior unavailable",
            )));
        };

        if !ready {
            behavior.if_not_ready(&mut ctx);
            self.restore_behavior(processor, behavior);
            let (writes, edits) = ctx.into_effects();
            self.apply_writes(processor, writes);
            self.apply_edits(edits);
            return Ok(Execution::NotReady);
        }

        if validity == InvalidationLevel::InvalidResources
            && let Err(error) = behavior.initialize_resources(&mut ctx)
        {
            self.restore_behavior(processor, behavior);
            return Ok(Execution::Failed(error));
        }

        match behavior.process(&mut ctx) {
            Ok(()) => {
                self.restore_behavior(processor, behavior);
                if let Some(state) = self.processors.get_mut(&processor) {
                    state.validity = InvalidationLevel::Valid;
                }
                self.pending.remove(processor);
                let (writes, edits) = ctx.into_effects();
                self.apply_writes(processor, writes);
                self.apply_edits(edits);
                Ok(Execution::Completed)
            }
            Err(error) => {
                self.restore_behavior(processor, behavior);
                Ok(Execution::Failed(error))
            }
        }
    }

    fn restore_behavior(&mut self, processor: ProcessorId, behavior: Box<dyn Processor>) {
        if let Some(state) = self.processors.get_mut(&processor) {
            state.behavior = Some(behavior);
        }
    }

    /// Applies staged outport writes, invalidating consumers of each changed
    /// port at their inport's `on_change` level. Clearing an already-empty
    /// port is a no-op so repeated not-ready runs settle.
    fn apply_writes(&mut self, processor: ProcessorId, writes: Vec<(String, Staged)>) {
        for (port, staged) in writes {
            let data = match staged {
                Staged::Unchanged => continue,
                Staged::Set(value) => Some(value),
                Staged::Cleared => None,
            };
            match self
                .processors
                .get_mut(&processor)
                .and_then(|s| s.outport_mut(&port))
            {
                Some(outport) => {
                    if data.is_none() && outport.data.is_none() {
                        continue;
                    }
                    outport.data = data;
                }
                None => continue,
            }
            let consumers: Vec<(ProcessorId, InvalidationLevel)> = self
                .connections
                .iter()
                .filter(|c| c.outport.processor == processor && c.outport.port == port)
                .filter_map(|c| {
                    self.processors
                        .get(&c.inport.processor)
                        .and_then(|s| s.inport(&c.inport.port))
                        .map(|spec| (c.inport.processor, spec.on_change))
                })
                .collect();
            for (consumer, level) in consumers {
                self.invalidate_unchecked(consumer, level);
            }
        }
    }

    fn apply_edits(&mut self, edits: Vec<NetworkEdit>) {
        for edit in edits {
            if let Err(error) = edit(self) {
                warn!(%error, "deferred network edit rejected");
            }
        }
    }

    /// Writes data into an outport from outside `process()`, invalidating
    /// the consumers. This is how results computed off-schedule (on a worker
    /// thread, say) enter the network; the producing processor's validity is
    /// left alone.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownProcessor`] or [`StructuralError::UnknownPort`].
    pub fn set_outport_data(
        &mut self,
        outport: &OutportRef,
        value: PortValue,
    ) -> Result<(), StructuralError> {
        let state = self
            .processors
            .get(&outport.processor)
            .ok_or(StructuralError::UnknownProcessor(outport.processor))?;
        if state.outport(&outport.port).is_none() {
            return Err(StructuralError::UnknownPort {
                processor: outport.processor,
                port: outport.port.clone(),
                direction: PortDirection::Out,
            });
        }
        self.apply_writes(outport.processor, vec![(outport.port.clone(), Staged::Set(value))]);
        if self.locked == 0 && !self.pending.is_empty() {
            self.evaluation_requested = true;
        }
        Ok(())
    }

    /// Returns the current data on an outport, if any.
    #[must_use]
    pub fn outport_data(&self, outport: &OutportRef) -> Option<&PortValue> {
        self.processors
            .get(&outport.processor)
            .and_then(|s| s.outport(&outport.port))
            .and_then(|o| o.data.as_ref())
    }

    // ─── locking and evaluation requests ─────────────────────────────────

    /// Takes a lock on the network, suppressing evaluation requests until
    /// the last nested lock is released.
    pub fn lock(&mut self) -> NetworkLock<'_> {
        NetworkLock::new(self)
    }

    pub(crate) fn begin_lock(&mut self) {
        self.locked += 1;
    }

    pub(crate) fn end_lock(&mut self) {
        self.locked = self.locked.saturating_sub(1);
        if self.locked == 0 && !self.pending.is_empty() {
            self.evaluation_requested = true;
        }
    }

    /// Returns true if at least one [`NetworkLock`] is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked > 0
    }

    /// Returns true if an evaluation has been requested since the last
    /// [`take_evaluation_request`](Self::take_evaluation_request).
    #[must_use]
    pub fn evaluation_requested(&self) -> bool {
        self.evaluation_requested
    }

    /// Clears and returns the evaluation request flag.
    pub fn take_evaluation_request(&mut self) -> bool {
        core::mem::take(&mut self.evaluation_requested)
    }

    /// Drains the pending invalidation queue, sorted by handle.
    pub fn take_pending(&mut self) -> Vec<(ProcessorId, InvalidationLevel)> {
        self.pending.drain()
    }

    /// Returns true if any invalidations are pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    // ─── queries ─────────────────────────────────────────────────────────

    /// Returns the topology version, bumped on every processor or
    /// connection change. The evaluator compares versions to detect
    /// mid-pass restructuring.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the handle refers to a live processor.
    #[must_use]
    pub fn contains(&self, processor: ProcessorId) -> bool {
        self.processors.contains_key(&processor)
    }

    /// Returns the number of live processors.
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Returns true if the network holds no processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Iterates processor handles in creation order.
    pub fn processor_ids(&self) -> impl Iterator<Item = ProcessorId> + '_ {
        self.order.iter().copied()
    }

    /// Returns a processor's identifier.
    #[must_use]
    pub fn identifier(&self, processor: ProcessorId) -> Option<&str> {
        self.processors
            .get(&processor)
            .map(|s| s.identifier.as_str())
    }

    /// Looks a processor up by identifier.
    #[must_use]
    pub fn processor_by_identifier(&self, identifier: &str) -> Option<ProcessorId> {
        self.order
            .iter()
            .copied()
            .find(|id| {
                self.processors
                    .get(id)
                    .is_some_and(|s| s.identifier == identifier)
            })
    }

    /// Returns a processor's metadata.
    #[must_use]
    pub fn info(&self, processor: ProcessorId) -> Option<&ProcessorInfo> {
        self.processors.get(&processor).map(|s| &s.info)
    }

    /// Returns the direct upstream producers of a processor, deduplicated,
    /// in connection order.
    #[must_use]
    pub fn upstream(&self, processor: ProcessorId) -> Vec<ProcessorId> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|c| c.inport.processor == processor)
            .map(|c| c.outport.processor)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Returns the direct downstream consumers of a processor, deduplicated,
    /// in connection order.
    #[must_use]
    pub fn downstream(&self, processor: ProcessorId) -> Vec<ProcessorId> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|c| c.outport.processor == processor)
            .map(|c| c.inport.processor)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// True if `to` is reachable from `from` along data connections.
    fn reaches(&self, from: ProcessorId, to: ProcessorId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| c.outport.processor == id)
                    .map(|c| c.inport.processor),
            );
        }
        false
    }

    pub(crate) fn state(&self, processor: ProcessorId) -> Option<&ProcessorState> {
        self.processors.get(&processor)
    }
}
