//! Worker threads for off-schedule computations.
//!
//! A processor whose work is too slow for the evaluation loop can submit it
//! here from `process()` (captured by value, since jobs run on another
//! thread) and return immediately with its outport empty. When the job
//! finishes, [`BackgroundPool::drain_completions`] writes the result into
//! the outport, which invalidates the consumers and raises a fresh
//! evaluation request; the driving loop then evaluates again and downstream
//! processors pick the data up.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, warn};

use visnet_network::error::ProcessError;
use visnet_network::port::{OutportRef, PortValue};
use visnet_network::{ProcessorId, ProcessorNetwork};

type Task = Box<dyn FnOnce() -> Result<PortValue, ProcessError> + Send>;

struct Job {
    outport: OutportRef,
    task: Task,
}

struct Completion {
    outport: OutportRef,
    result: Result<PortValue, ProcessError>,
}

/// What one call to [`BackgroundPool::drain_completions`] applied.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    /// Number of results written into outports.
    pub applied: usize,
    /// Jobs that failed; their outports were left untouched.
    pub failures: Vec<(ProcessorId, ProcessError)>,
}

/// A fixed set of worker threads computing outport values off-schedule.
///
/// Jobs are queued with [`submit`](BackgroundPool::submit) and their results
/// collected with [`drain_completions`](BackgroundPool::drain_completions);
/// the pool never touches the network from a worker thread. Dropping the
/// pool discards queued jobs and joins the workers.
pub struct BackgroundPool {
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    workers: Vec<JoinHandle<()>>,
}

impl BackgroundPool {
    /// Spawns a pool with the given number of worker threads (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let (jobs, job_rx) = unbounded::<Job>();
        let (completion_tx, completions) = unbounded();

        let workers = (0..workers.max(1))
            .filter_map(|index| {
                let job_rx = job_rx.clone();
                let completion_tx = completion_tx.clone();
                thread::Builder::new()
                    .name(format!("visnet-worker-{index}"))
                    .spawn(move || {
                        for job in job_rx {
                            let result = (job.task)();
                            if completion_tx
                                .send(Completion {
                                    outport: job.outport,
                                    result,
                                })
                                .is_err()
                            {
                                // pool dropped while the job was running
                                return;
                            }
                        }
                    })
                    .map_err(|error| warn!(%error, "failed to spawn background worker"))
                    .ok()
            })
            .collect();

        Self {
            jobs: Some(jobs),
            completions,
            workers,
        }
    }

    /// Queues a computation whose result lands on the given outport.
    pub fn submit<F>(&self, outport: OutportRef, task: F)
    where
        F: FnOnce() -> Result<PortValue, ProcessError> + Send + 'static,
    {
        debug!(outport = %outport, "submitting background job");
        if let Some(jobs) = &self.jobs
            && jobs
                .send(Job {
                    outport,
                    task: Box::new(task),
                })
                .is_err()
        {
            warn!("background job dropped: no workers are running");
        }
    }

    /// Returns true if at least one finished job is waiting to be applied.
    #[must_use]
    pub fn has_completions(&self) -> bool {
        !self.completions.is_empty()
    }

    /// Applies every finished job to the network.
    ///
    /// Successful results are written into their outports, invalidating
    /// consumers and raising an evaluation request. Failures are reported in
    /// the outcome; a result whose outport no longer exists is dropped with
    /// a log line. Never blocks on jobs still running.
    pub fn drain_completions(&self, network: &mut ProcessorNetwork) -> DrainOutcome {
        let mut outcome = DrainOutcome::default();
        while let Ok(completion) = self.completions.try_recv() {
            match completion.result {
                Ok(value) => {
                    match network.set_outport_data(&completion.outport, value) {
                        Ok(()) => outcome.applied += 1,
                        Err(error) => {
                            debug!(%error, "dropping background result for removed outport");
                        }
                    }
                }
                Err(error) => {
                    warn!(outport = %completion.outport, %error, "background job failed");
                    outcome.failures.push((completion.outport.processor, error));
                }
            }
        }
        outcome
    }

    /// Blocks until one finished job is available and applies it, together
    /// with any others already finished.
    ///
    /// Returns `None` if no workers are left to produce one.
    pub fn wait_and_drain(&self, network: &mut ProcessorNetwork) -> Option<DrainOutcome> {
        let completion = self.completions.recv().ok()?;
        let mut outcome = DrainOutcome::default();
        match completion.result {
            Ok(value) => match network.set_outport_data(&completion.outport, value) {
                Ok(()) => outcome.applied += 1,
                Err(error) => {
                    debug!(%error, "dropping background result for removed outport");
                }
            },
            Err(error) => {
                warn!(outport = %completion.outport, %error, "background job failed");
                outcome.failures.push((completion.outport.processor, error));
            }
        }
        let rest = self.drain_completions(network);
        outcome.applied += rest.applied;
        outcome.failures.extend(rest.failures);
        Some(outcome)
    }
}

impl Drop for BackgroundPool {
    fn drop(&mut self) {
        // closing the job channel lets idle workers exit
        self.jobs = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("background worker panicked");
            }
        }
    }
}

impl core::fmt::Debug for BackgroundPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackgroundPool")
            .field("workers", &self.workers.len())
            .field("pending_completions", &self.completions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use visnet_network::port::OutportSpec;
    use visnet_network::processor::{Processor, ProcessorInfo, ProcessorSpec};

    use super::*;

    struct Idle;

    impl Processor for Idle {
        fn process(
            &mut self,
            _ctx: &mut visnet_network::context::ProcessContext,
        ) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn outport_spec() -> ProcessorSpec {
        ProcessorSpec::new(ProcessorInfo::new("org.visnet.Idle", "Idle"), Idle)
            .with_outport(OutportSpec::new::<i32>("out"))
    }

    #[test]
    fn completed_job_lands_on_the_outport() {
        let mut network = ProcessorNetwork::new();
        let id = network.add_processor("slow", outport_spec()).unwrap();
        let outport = OutportRef::new(id, "out");

        let pool = BackgroundPool::new(1);
        pool.submit(outport.clone(), || Ok(PortValue::new(9i32)));

        let outcome = pool.wait_and_drain(&mut network).unwrap();
        assert_eq!(outcome.applied, 1);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            network
                .outport_data(&outport)
                .and_then(|v| v.downcast_ref::<i32>()),
            Some(&9)
        );
        assert!(network.evaluation_requested());
    }

    #[test]
    fn failed_job_is_reported_not_applied() {
        let mut network = ProcessorNetwork::new();
        let id = network.add_processor("slow", outport_spec()).unwrap();
        let outport = OutportRef::new(id, "out");

        let pool = BackgroundPool::new(1);
        pool.submit(outport.clone(), || Err(ProcessError::new("disk on fire")));

        let outcome = pool.wait_and_drain(&mut network).unwrap();
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert!(network.outport_data(&outport).is_none());
    }

    #[test]
    fn result_for_removed_processor_is_dropped() {
        let mut network = ProcessorNetwork::new();
        let id = network.add_processor("slow", outport_spec()).unwrap();
        let outport = OutportRef::new(id, "out");

        let pool = BackgroundPool::new(1);
        pool.submit(outport, || Ok(PortValue::new(9i32)));
        network.remove_processor(id).unwrap();

        let outcome = pool.wait_and_drain(&mut network).unwrap();
        assert_eq!(outcome.applied, 0);
        assert!(outcome.failures.is_empty());
    }
}
