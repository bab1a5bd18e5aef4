//! Dedicated compute thread. Jobs arrive over a channel; each reply goes
//! back through its own oneshot. If the thread dies its reply senders are
//! dropped, which the caller observes as a crash.

use std::sync::mpsc;
use std::thread::JoinHandle;

use futures::channel::oneshot;

use super::backend::{ComputeBackend, ComputeJob, JobOutput, JobReply, compute_and_paint};
use crate::domain::errors::OffloadError;
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};

type Reply = oneshot::Sender<JobOutput>;

enum WorkerMessage {
    Batch(Vec<(ComputeJob, Reply)>),
    Shutdown,
}

pub struct WorkerBackend {
    sender: Option<mpsc::Sender<WorkerMessage>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerBackend").field("running", &self.sender.is_some()).finish()
    }
}

impl WorkerBackend {
    /// Start the compute thread. Fails where threads are unavailable.
    pub fn spawn(parallel_threshold: usize) -> Result<Self, OffloadError> {
        if cfg!(target_arch = "wasm32") {
            return Err(OffloadError::Unavailable("threads are not available".into()));
        }
        let (sender, receiver) = mpsc::channel::<WorkerMessage>();
        let handle = std::thread::Builder::new()
            .name("chart-compute".into())
            .spawn(move || worker_loop(receiver, parallel_threshold))
            .map_err(|e| OffloadError::Unavailable(e.to_string()))?;
        log_debug!(LogComponent::Infrastructure("Worker"), "compute thread started");
        Ok(Self { sender: Some(sender), handle: Some(handle) })
    }
}

fn worker_loop(receiver: mpsc::Receiver<WorkerMessage>, parallel_threshold: usize) {
    while let Ok(message) = receiver.recv() {
        match message {
            WorkerMessage::Batch(batch) => run_batch(batch, parallel_threshold),
            WorkerMessage::Shutdown => break,
        }
    }
}

#[cfg(feature = "parallel")]
fn run_batch(batch: Vec<(ComputeJob, Reply)>, parallel_threshold: usize) {
    use rayon::prelude::*;
    if batch.len() >= parallel_threshold.max(2) {
        batch.into_par_iter().for_each(|(job, reply)| {
            let _ = reply.send(compute_and_paint(&job));
        });
        return;
    }
    for (job, reply) in batch {
        let _ = reply.send(compute_and_paint(&job));
    }
}

#[cfg(not(feature = "parallel"))]
fn run_batch(batch: Vec<(ComputeJob, Reply)>, _parallel_threshold: usize) {
    for (job, reply) in batch {
        // receiver gone means the request was abandoned
        let _ = reply.send(compute_and_paint(&job));
    }
}

impl ComputeBackend for WorkerBackend {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn submit(&mut self, jobs: Vec<ComputeJob>) -> Result<Vec<JobReply>, OffloadError> {
        let sender = self.sender.as_ref().ok_or(OffloadError::Crashed)?;
        let mut replies = Vec::with_capacity(jobs.len());
        let mut batch = Vec::with_capacity(jobs.len());
        for job in jobs {
            let (tx, rx) = oneshot::channel();
            batch.push((job, tx));
            replies.push(rx);
        }
        sender.send(WorkerMessage::Batch(batch)).map_err(|_| OffloadError::Crashed)?;
        Ok(replies)
    }

    fn shutdown(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(WorkerMessage::Shutdown);
        }
        // a busy thread finishes its batch on its own; never block the caller
        if let Some(handle) = self.handle.take()
            && handle.is_finished()
            && handle.join().is_err()
        {
            log_warn!(LogComponent::Infrastructure("Worker"), "compute thread had panicked");
        }
    }
}

impl Drop for WorkerBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}
