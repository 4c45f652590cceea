//! Shared test utilities for `visnet_network` integration tests.
//!
//! Provides small processor behaviors and spec builders used across the
//! test binaries. Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities — not all items used in every test binary"
)]

use std::sync::Arc;

use parking_lot::Mutex;
use visnet_network::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST PROCESSORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Produces a fixed integer on `out`.
pub struct Constant {
    pub value: i32,
}

impl Processor for Constant {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        ctx.set_output("out", self.value);
        Ok(())
    }
}

/// Reads `in`, adds one, writes `out`.
pub struct PlusOne;

impl Processor for PlusOne {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        let input = *ctx.read::<i32>("in").ok_or("missing input")?;
        ctx.set_output("out", input + 1);
        Ok(())
    }
}

/// Sums every value on the multi-inport `in` into `out`.
pub struct Sum;

impl Processor for Sum {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        let total: i32 = ctx
            .inputs("in")
            .iter()
            .filter_map(|v| v.downcast_ref::<i32>())
            .sum();
        ctx.set_output("out", total);
        Ok(())
    }
}

/// Appends every value it sees on `in` to a shared log.
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<i32>>>,
}

impl Processor for Recorder {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        let input = *ctx.read::<i32>("in").ok_or("missing input")?;
        self.seen.lock().push(input);
        Ok(())
    }
}

/// Fails every `process()` call.
pub struct AlwaysFails;

impl Processor for AlwaysFails {
    fn process(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        Err(ProcessError::new("intentional failure"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPEC BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn constant_spec(value: i32) -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.Constant", "Constant"),
        Constant { value },
    )
    .with_outport(OutportSpec::new::<i32>("out"))
    .with_property(Property::new("value", i64::from(value)))
}

pub fn plus_one_spec() -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.PlusOne", "Plus One"),
        PlusOne,
    )
    .with_inport(InportSpec::new::<i32>("in"))
    .with_outport(OutportSpec::new::<i32>("out"))
}

pub fn sum_spec() -> ProcessorSpec {
    ProcessorSpec::new(ProcessorInfo::new("org.visnet.test.Sum", "Sum"), Sum)
        .with_inport(InportSpec::new::<i32>("in").multi())
        .with_outport(OutportSpec::new::<i32>("out"))
}

pub fn recorder_spec(seen: Arc<Mutex<Vec<i32>>>) -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.Recorder", "Recorder"),
        Recorder { seen },
    )
    .with_inport(InportSpec::new::<i32>("in"))
}

pub fn failing_spec() -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.AlwaysFails", "Always Fails"),
        AlwaysFails,
    )
    .with_inport(InportSpec::new::<i32>("in").optional())
    .with_outport(OutportSpec::new::<i32>("out"))
}

/// Connects `from.out` to `to.in`, panicking on rejection.
pub fn connect(network: &mut ProcessorNetwork, from: ProcessorId, to: ProcessorId) {
    network
        .add_connection(OutportRef::new(from, "out"), InportRef::new(to, "in"))
        .unwrap();
}
