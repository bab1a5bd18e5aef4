//! Off-thread series computation with a same-thread fallback.

pub mod backend;
pub mod cache;
pub mod inline;
pub mod manager;
pub mod timer;
pub mod worker;

pub use backend::{ComputeBackend, ComputeJob, JobOutput, JobReply, PaintRequest, compute_and_paint};
pub use cache::{CacheKey, ResultCache};
pub use inline::InlineBackend;
pub use manager::{BackendFactory, OffloadConfig, OffloadManager, OffloadStats};
pub use timer::TimerService;
pub use worker::WorkerBackend;
