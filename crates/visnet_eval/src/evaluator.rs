//! The pass-based network evaluator.
//!
//! Evaluation is organized in passes. A pass walks the whole network in
//! topological order (ties broken by creation order, so evaluation is
//! deterministic) and executes every invalid processor it meets. Because
//! producers precede consumers in that order, one pass normally settles the
//! network; the pass loop is a bounded safety net, not the usual path.
//!
//! Two things interrupt a pass:
//!
//! - a processor failure, which is isolated: the failure is recorded, the
//!   processor stays invalid, and the pass continues past it;
//! - a topology change (a deferred edit adding or removing processors or
//!   connections mid-pass), detected by a version mismatch, which aborts the
//!   pass and starts a fresh one against the new topology.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use visnet_network::error::ProcessError;
use visnet_network::network::Execution;
use visnet_network::{InvalidationLevel, ProcessorId, ProcessorNetwork};

/// Default bound on evaluation passes per [`NetworkEvaluator::evaluate`].
pub const DEFAULT_MAX_PASSES: usize = 100;

/// Default bound on mid-pass topology restarts per evaluation.
pub const DEFAULT_MAX_RESTARTS: usize = 16;

/// One processor failure observed during evaluation.
#[derive(Debug)]
pub struct ProcessorFailure {
    /// Handle of the failed processor.
    pub processor: ProcessorId,
    /// Its network identifier at the time of failure.
    pub identifier: String,
    /// The error it raised.
    pub error: ProcessError,
}

impl core::fmt::Display for ProcessorFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "processor '{}' failed: {}", self.identifier, self.error)
    }
}

/// What one call to [`NetworkEvaluator::evaluate`] did.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    /// Number of passes run, including aborted ones.
    pub passes: usize,
    /// Number of passes aborted by mid-pass topology changes.
    pub restarts: usize,
    /// Processors that completed, in execution order across passes.
    pub executed: Vec<ProcessorId>,
    /// Processors left invalid because their inputs are missing.
    pub not_ready: Vec<ProcessorId>,
    /// Processors that failed; they stay invalid until the next evaluation.
    pub failures: Vec<ProcessorFailure>,
}

impl EvaluationReport {
    /// Returns true if no processor failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a [`ProcessorNetwork`] to a settled state.
///
/// The evaluator is stateless between calls; per-evaluation bookkeeping
/// lives in the [`EvaluationReport`]. Bounds on passes and restarts keep a
/// misbehaving network (one whose processors keep restructuring it) from
/// evaluating forever.
#[derive(Debug, Clone)]
pub struct NetworkEvaluator {
    max_passes: usize,
    max_restarts: usize,
}

impl Default for NetworkEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkEvaluator {
    /// Creates an evaluator with default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }

    /// Sets the bound on evaluation passes.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Sets the bound on mid-pass topology restarts.
    #[must_use]
    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Evaluates the network until it settles or a bound is hit.
    ///
    /// Consumes any pending evaluation request and pending invalidations.
    /// Each invalid, ready processor is executed at most once per pass, in
    /// topological order. Failures are isolated per processor: a failed
    /// processor is skipped for the rest of this evaluation, and everything
    /// not downstream-starved by it still runs.
    ///
    /// Evaluating a locked network is a no-op; the request stays queued and
    /// fires when the lock is released.
    pub fn evaluate(&self, network: &mut ProcessorNetwork) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        if network.is_locked() {
            debug!("evaluation skipped: network is locked");
            return report;
        }
        network.take_evaluation_request();
        network.take_pending();

        let mut failed: HashSet<ProcessorId> = HashSet::new();

        'eval: while report.passes < self.max_passes {
            report.passes += 1;
            let order = topological_order(network);
            let version = network.version();

            for id in order {
                if failed.contains(&id)
                    || !network.contains(id)
                    || network.validity(id) == Some(InvalidationLevel::Valid)
                {
                    continue;
                }
                match network.execute(id) {
                    Ok(Execution::Completed) => report.executed.push(id),
                    Ok(Execution::NotReady) => {}
                    Ok(Execution::Failed(error)) => {
                        let identifier =
                            network.identifier(id).unwrap_or_default().to_string();
                        warn!(processor = %id, identifier, %error, "processor failed during evaluation");
                        failed.insert(id);
                        report.failures.push(ProcessorFailure {
                            processor: id,
                            identifier,
                            error,
                        });
                    }
                    Err(error) => {
                        // removed by a deferred edit earlier in this pass
                        debug!(processor = %id, %error, "processor vanished mid-pass");
                    }
                }
                if network.version() != version {
                    if report.restarts >= self.max_restarts {
                        warn!(
                            restarts = report.restarts,
                            "evaluation stopped: network keeps restructuring itself"
                        );
                        break 'eval;
                    }
                    report.restarts += 1;
                    debug!(pass = report.passes, "topology changed mid-pass, restarting");
                    continue 'eval;
                }
            }

            if !needs_another_pass(network, &failed) {
                break;
            }
        }

        // invalidations raised by this evaluation's own output writes were
        // all handled within it
        network.take_evaluation_request();
        network.take_pending();

        report.not_ready = network
            .processor_ids()
            .filter(|id| {
                !failed.contains(id)
                    && network
                        .validity(*id)
                        .is_some_and(|v| v > InvalidationLevel::Valid)
                    && !network.is_ready(*id).unwrap_or(false)
            })
            .collect();
        report
    }
}

fn needs_another_pass(network: &ProcessorNetwork, failed: &HashSet<ProcessorId>) -> bool {
    network.processor_ids().any(|id| {
        !failed.contains(&id)
            && network
                .validity(id)
                .is_some_and(|v| v > InvalidationLevel::Valid)
            && network.is_ready(id).unwrap_or(false)
    })
}

/// Kahn's algorithm over the connection graph. Repeated creation-order
/// sweeps instead of a ready-queue, so the emitted order is deterministic
/// for a given network.
fn topological_order(network: &ProcessorNetwork) -> Vec<ProcessorId> {
    let ids: Vec<ProcessorId> = network.processor_ids().collect();
    let mut indegree: HashMap<ProcessorId, usize> = ids
        .iter()
        .map(|id| (*id, network.upstream(*id).len()))
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    let mut emitted: HashSet<ProcessorId> = HashSet::new();
    while order.len() < ids.len() {
        let mut progressed = false;
        for id in &ids {
            if emitted.contains(id) || indegree.get(id).copied().unwrap_or(0) > 0 {
                continue;
            }
            emitted.insert(*id);
            order.push(*id);
            progressed = true;
            for successor in network.downstream(*id) {
                if let Some(count) = indegree.get_mut(&successor) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        // the network keeps its graph acyclic; this guards a broken invariant
        if !progressed {
            warn!("cycle detected in processor graph, truncating evaluation order");
            break;
        }
    }
    order
}
