//! Processor behavior trait, specs, and metadata.
//!
//! A processor is a node in the network: a set of declared ports and
//! properties plus a boxed [`Processor`] behavior. The scheduler never sees
//! concrete processor types; behaviors are trait objects created directly or
//! through the [`ProcessorFactory`](crate::factory::ProcessorFactory).

use core::fmt;

use crate::context::ProcessContext;
use crate::error::ProcessError;
use crate::invalidation::InvalidationLevel;
use crate::port::{InportSpec, OutportSpec, PortValue};
use crate::property::Property;

/// Unique handle for a processor in a network.
///
/// Handles are allocated monotonically and never reused, so a handle held
/// across a removal can be detected as stale instead of dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessorId(pub(crate) usize);

impl ProcessorId {
    /// Creates a processor ID from a raw index.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processor_{}", self.0)
    }
}

/// Development maturity of a processor class. Metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeState {
    /// Under development.
    #[default]
    Experimental,
    /// Considered production quality.
    Stable,
    /// Known not to work.
    Broken,
}

/// Static metadata describing a processor class.
///
/// Carried for tooling and diagnostics; nothing in the scheduler depends on
/// it beyond the class identifier, which keys the factory.
#[derive(Debug, Clone)]
pub struct ProcessorInfo {
    /// Factory key for this processor class.
    pub class_identifier: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-form classification tags.
    pub tags: Vec<String>,
    /// Development maturity.
    pub code_state: CodeState,
}

impl ProcessorInfo {
    /// Creates processor metadata.
    #[must_use]
    pub fn new(class_identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            class_identifier: class_identifier.into(),
            display_name: display_name.into(),
            tags: Vec::new(),
            code_state: CodeState::default(),
        }
    }

    /// Sets the classification tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the code state.
    #[must_use]
    pub fn with_code_state(mut self, code_state: CodeState) -> Self {
        self.code_state = code_state;
        self
    }
}

/// Behavior of a processor.
///
/// Implementations must only read inputs and write outputs through the
/// given [`ProcessContext`]; they never touch other processors' ports.
/// Network mutations from inside `process()` go through
/// [`ProcessContext::defer`].
pub trait Processor: Send {
    /// Performs the processor's work against ready inputs.
    ///
    /// Called by the evaluator when the processor is ready and not valid.
    /// On success the processor becomes valid and consumers of written
    /// outports are invalidated. On error the processor stays invalid and
    /// staged output writes are discarded.
    ///
    /// # Errors
    ///
    /// Any [`ProcessError`]; the evaluator isolates it to this processor.
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError>;

    /// Called instead of [`process`](Processor::process) when the processor
    /// is not ready.
    ///
    /// The default clears all outputs so downstream processors observe a
    /// well-defined "no data" state instead of stale data.
    fn if_not_ready(&mut self, ctx: &mut ProcessContext) {
        ctx.clear_outputs();
    }

    /// Rebuilds internal resources.
    ///
    /// Called before [`process`](Processor::process) whenever the processor
    /// was invalidated at [`InvalidationLevel::InvalidResources`]. Errors are
    /// treated exactly like `process()` failures.
    fn initialize_resources(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        Ok(())
    }
}

/// Complete declaration of a processor: metadata, ports, properties, and
/// behavior. Consumed by
/// [`ProcessorNetwork::add_processor`](crate::network::ProcessorNetwork::add_processor).
pub struct ProcessorSpec {
    pub(crate) info: ProcessorInfo,
    pub(crate) inports: Vec<InportSpec>,
    pub(crate) outports: Vec<OutportSpec>,
    pub(crate) properties: Vec<Property>,
    pub(crate) behavior: Box<dyn Processor>,
}

impl ProcessorSpec {
    /// Creates a spec with the given metadata and behavior.
    #[must_use]
    pub fn new(info: ProcessorInfo, behavior: impl Processor + 'static) -> Self {
        Self {
            info,
            inports: Vec::new(),
            outports: Vec::new(),
            properties: Vec::new(),
            behavior: Box::new(behavior),
        }
    }

    /// Declares an inport.
    #[must_use]
    pub fn with_inport(mut self, inport: InportSpec) -> Self {
        self.inports.push(inport);
        self
    }

    /// Declares an outport.
    #[must_use]
    pub fn with_outport(mut self, outport: OutportSpec) -> Self {
        self.outports.push(outport);
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Returns the spec's metadata.
    #[must_use]
    pub fn info(&self) -> &ProcessorInfo {
        &self.info
    }
}

impl fmt::Debug for ProcessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorSpec")
            .field("class_identifier", &self.info.class_identifier)
            .field("inports", &self.inports.len())
            .field("outports", &self.outports.len())
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

/// Runtime state of an outport: its declaration plus current data.
#[derive(Debug)]
pub(crate) struct OutportState {
    pub(crate) spec: OutportSpec,
    pub(crate) data: Option<PortValue>,
}

/// Runtime state of a processor inside the network arena.
pub(crate) struct ProcessorState {
    pub(crate) identifier: String,
    pub(crate) info: ProcessorInfo,
    pub(crate) inports: Vec<InportSpec>,
    pub(crate) outports: Vec<OutportState>,
    pub(crate) properties: Vec<Property>,
    pub(crate) validity: InvalidationLevel,
    /// `None` only while the behavior is checked out for execution.
    pub(crate) behavior: Option<Box<dyn Processor>>,
}

impl ProcessorState {
    pub(crate) fn inport(&self, identifier: &str) -> Option<&InportSpec> {
        self.inports.iter().find(|p| p.identifier == identifier)
    }

    pub(crate) fn outport(&self, identifier: &str) -> Option<&OutportState> {
        self.outports.iter().find(|p| p.spec.identifier == identifier)
    }

    pub(crate) fn outport_mut(&mut self, identifier: &str) -> Option<&mut OutportState> {
        self.outports
            .iter_mut()
            .find(|p| p.spec.identifier == identifier)
    }

    pub(crate) fn property(&self, identifier: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.identifier == identifier)
    }

    pub(crate) fn property_mut(&mut self, identifier: &str) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.identifier == identifier)
    }
}

impl fmt::Debug for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorState")
            .field("identifier", &self.identifier)
            .field("class_identifier", &self.info.class_identifier)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}
