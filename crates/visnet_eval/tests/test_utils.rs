//! Shared test utilities for `visnet_eval` integration tests.
//!
//! Processor behaviors with observable side effects (run counters, shared
//! logs), so tests can assert *what* the evaluator executed, not just that
//! the network ended up valid. Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities — not all items used in every test binary"
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use visnet_network::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST PROCESSORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Emits its `value` property on `out` and counts its runs.
pub struct Source {
    pub runs: Arc<AtomicUsize>,
}

impl Processor for Source {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let value = ctx
            .property("value")
            .and_then(PropertyValue::as_int)
            .ok_or("missing 'value' property")?;
        let value = i32::try_from(value).map_err(|_| ProcessError::new("value out of range"))?;
        ctx.set_output("out", value);
        Ok(())
    }
}

/// Doubles `in` onto `out` and counts its runs.
pub struct Doubler {
    pub runs: Arc<AtomicUsize>,
}

impl Processor for Doubler {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let input = *ctx.read::<i32>("in").ok_or("missing input")?;
        ctx.set_output("out", input * 2);
        Ok(())
    }
}

/// Appends everything it sees on `in` to a shared log.
pub struct Sink {
    pub seen: Arc<Mutex<Vec<i32>>>,
}

impl Processor for Sink {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        let input = *ctx.read::<i32>("in").ok_or("missing input")?;
        self.seen.lock().push(input);
        Ok(())
    }
}

/// Sums whatever is on the optional multi-inport `in`, plus one, onto `out`.
pub struct Relay;

impl Processor for Relay {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        let total: i32 = ctx
            .inputs("in")
            .iter()
            .filter_map(|v| v.downcast_ref::<i32>())
            .sum();
        ctx.set_output("out", total + 1);
        Ok(())
    }
}

/// Fails every run, counting the attempts.
pub struct Failing {
    pub attempts: Arc<AtomicUsize>,
}

impl Processor for Failing {
    fn process(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ProcessError::new("intentional failure"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPEC BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn source_spec(value: i64, runs: Arc<AtomicUsize>) -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.Source", "Source"),
        Source { runs },
    )
    .with_outport(OutportSpec::new::<i32>("out"))
    .with_property(Property::new("value", value))
}

pub fn doubler_spec(runs: Arc<AtomicUsize>) -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.Doubler", "Doubler"),
        Doubler { runs },
    )
    .with_inport(InportSpec::new::<i32>("in"))
    .with_outport(OutportSpec::new::<i32>("out"))
}

pub fn sink_spec(seen: Arc<Mutex<Vec<i32>>>) -> ProcessorSpec {
    ProcessorSpec::new(ProcessorInfo::new("org.visnet.test.Sink", "Sink"), Sink { seen })
        .with_inport(InportSpec::new::<i32>("in"))
}

pub fn relay_spec() -> ProcessorSpec {
    ProcessorSpec::new(ProcessorInfo::new("org.visnet.test.Relay", "Relay"), Relay)
        .with_inport(InportSpec::new::<i32>("in").multi().optional())
        .with_outport(OutportSpec::new::<i32>("out"))
}

pub fn failing_spec(attempts: Arc<AtomicUsize>) -> ProcessorSpec {
    ProcessorSpec::new(
        ProcessorInfo::new("org.visnet.test.Failing", "Failing"),
        Failing { attempts },
    )
    .with_inport(InportSpec::new::<i32>("in"))
    .with_outport(OutportSpec::new::<i32>("out"))
}

/// Connects `from.out` to `to.in`, panicking on rejection.
pub fn connect(network: &mut ProcessorNetwork, from: ProcessorId, to: ProcessorId) {
    network
        .add_connection(OutportRef::new(from, "out"), InportRef::new(to, "in"))
        .unwrap();
}

/// Shared run counter.
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Shared value log.
pub fn log() -> Arc<Mutex<Vec<i32>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Routes `tracing` output into the captured test writer. Safe to call from
/// every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
