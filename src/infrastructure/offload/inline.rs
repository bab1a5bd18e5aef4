use futures::channel::oneshot;

use super::backend::{ComputeBackend, ComputeJob, JobOutput, JobReply, compute_and_paint};
use crate::domain::errors::OffloadError;

/// Same-thread execution. Cannot fail short of a panic.
#[derive(Debug, Default)]
pub struct InlineBackend {
    computed: usize,
}

impl InlineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, jobs: &[ComputeJob]) -> Vec<JobOutput> {
        self.computed += jobs.len();
        jobs.iter().map(compute_and_paint).collect()
    }

    pub fn computed(&self) -> usize {
        self.computed
    }
}

impl ComputeBackend for InlineBackend {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn submit(&mut self, jobs: Vec<ComputeJob>) -> Result<Vec<JobReply>, OffloadError> {
        Ok(self
            .run(&jobs)
            .into_iter()
            .map(|output| {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(output);
                rx
            })
            .collect())
    }
}
