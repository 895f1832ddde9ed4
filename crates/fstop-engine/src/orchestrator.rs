//! The pipeline orchestrator: request correlation and the worker pool.
//!
//! The control side never blocks on a worker. [`Engine::submit`] validates
//! parameters, assigns a monotonically increasing correlation id, records
//! the id as the asset's latest, and enqueues the job; results come back
//! asynchronously through [`Engine::poll`] or [`Engine::recv_timeout`].
//!
//! Correctness under rapid input rests on id comparison, not completion
//! order: a response is delivered only if its id is still the latest issued
//! for its asset. Anything else is discarded on arrival, so stale renders
//! can never reach the UI layer regardless of how workers interleave.
//!
//! Requests are routed to workers by asset-identity hash, which keeps one
//! asset's requests FIFO on a single worker while different assets proceed
//! in parallel.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::message::{AssetId, EditOp, EditPhase, RequestId, Response};
use crate::worker::{self, Job, WorkerContext, WorkerEvent};

/// Which backend executes the adjustment chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeBackend {
    /// Pure-CPU reference path.
    #[default]
    Cpu,
    /// GPU compute path; backend errors are surfaced, not silently retried.
    Gpu,
}

/// Engine construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Bounded depth of each worker's job queue.
    pub queue_depth: usize,
    /// Compute backend for the adjustment stages.
    pub backend: ComputeBackend,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(2),
            queue_depth: 32,
            backend: ComputeBackend::default(),
        }
    }
}

/// The edit engine: a worker pool plus the correlation state that decides
/// which in-flight response is authoritative per asset.
pub struct Engine {
    senders: Vec<mpsc::SyncSender<Job>>,
    events: mpsc::Receiver<WorkerEvent>,
    /// Latest issued id per asset, shared with workers for advisory
    /// cancellation. Updated atomically with enqueueing under its lock.
    latest: Arc<Mutex<HashMap<AssetId, RequestId>>>,
    phases: HashMap<RequestId, EditPhase>,
    next_id: RequestId,
    discarded: u64,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the worker pool.
    pub fn new(config: EngineConfig) -> Self {
        let worker_count = config.workers.max(1);
        let queue_depth = config.queue_depth.max(1);

        let (event_tx, event_rx) = mpsc::channel();
        let latest = Arc::new(Mutex::new(HashMap::new()));

        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (job_tx, job_rx) = mpsc::sync_channel(queue_depth);
            let ctx = WorkerContext {
                index,
                events: event_tx.clone(),
                latest: latest.clone(),
                backend: config.backend,
            };
            handles.push(std::thread::spawn(move || worker::run(ctx, job_rx)));
            senders.push(job_tx);
        }

        Self {
            senders,
            events: event_rx,
            latest,
            phases: HashMap::new(),
            next_id: 1,
            discarded: 0,
            handles,
        }
    }

    /// Submit an edit request for an asset.
    ///
    /// Validation happens here, synchronously: an invalid crop rectangle or
    /// filter name never reaches a worker. On success the returned id is the
    /// asset's new latest; any older in-flight request is superseded.
    pub fn submit(&mut self, asset: AssetId, op: EditOp) -> Result<RequestId, EngineError> {
        op.validate()?;

        let id = self.next_id;
        let worker = worker_for(&asset, self.senders.len());
        let stage = op.stage_name();
        let job = Job {
            id,
            asset: asset.clone(),
            op,
        };

        // Enqueue and update the latest map under one lock so workers can
        // never observe the new job with a stale latest id.
        let previous = {
            let mut latest = self
                .latest
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match self.senders[worker].try_send(job) {
                Ok(()) => latest.insert(asset.clone(), id),
                Err(mpsc::TrySendError::Full(_)) => {
                    return Err(EngineError::QueueFull { asset })
                }
                Err(mpsc::TrySendError::Disconnected(_)) => return Err(EngineError::Shutdown),
            }
        };

        if let Some(previous) = previous {
            debug!(asset = %asset, superseded = previous, id, "request supersedes older request");
            if let Some(phase) = self.phases.get_mut(&previous) {
                *phase = EditPhase::Superseded;
            }
        }

        self.phases.insert(id, EditPhase::Queued);
        self.next_id += 1;
        debug!(asset = %asset, id, stage, worker, "request submitted");
        Ok(id)
    }

    /// Drain all pending worker events without blocking, returning every
    /// authoritative response that arrived.
    pub fn poll(&mut self) -> Vec<Response> {
        let mut delivered = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let Some(response) = self.process_event(event) {
                delivered.push(response);
            }
        }
        delivered
    }

    /// Block until one authoritative response arrives or the timeout lapses.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Response> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(response) = self.process_event(event) {
                        return Some(response);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    /// Current lifecycle phase of a request, if it is still tracked.
    ///
    /// Discarded requests are forgotten once their stale response arrives.
    pub fn phase(&self, id: RequestId) -> Option<EditPhase> {
        self.phases.get(&id).copied()
    }

    /// Number of responses dropped because they were superseded.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Size of the worker pool.
    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    fn process_event(&mut self, event: WorkerEvent) -> Option<Response> {
        match event {
            WorkerEvent::Phase { id, phase } => {
                if let Some(entry) = self.phases.get_mut(&id) {
                    // Superseded is terminal; progress reports from a
                    // still-running superseded job must not resurrect it
                    if *entry != EditPhase::Superseded {
                        *entry = phase;
                    }
                }
                None
            }
            WorkerEvent::Done(response) => {
                let authoritative = {
                    let mut latest = self
                        .latest
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if latest.get(&response.asset) == Some(&response.id) {
                        latest.remove(&response.asset);
                        true
                    } else {
                        false
                    }
                };

                if authoritative {
                    self.phases.insert(response.id, EditPhase::Delivered);
                    Some(response)
                } else {
                    debug!(
                        id = response.id,
                        asset = %response.asset,
                        "discarding stale response"
                    );
                    self.discarded += 1;
                    self.phases.remove(&response.id);
                    None
                }
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Dropping the job senders ends the worker loops
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Stable asset-to-worker routing.
fn worker_for(asset: &AssetId, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    asset.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}
