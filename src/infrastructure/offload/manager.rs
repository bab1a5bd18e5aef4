//! Computation offload manager: cache-first dispatch of series
//! computations to a worker thread, with restart-once then permanent
//! inline fallback.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{Either, join_all, select};

use super::backend::{ComputeBackend, ComputeJob, JobOutput, JobReply, PaintRequest};
use super::cache::{CacheKey, ResultCache};
use super::inline::InlineBackend;
use super::timer::TimerService;
use super::worker::WorkerBackend;
use crate::domain::chart::ChartOptions;
use crate::domain::errors::{ChartError, ChartResult, OffloadError};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::Candle;
use crate::domain::series::{SeriesConfig, SeriesResult};
use crate::infrastructure::rendering::DisplayList;
use crate::{log_debug, log_error, log_info, log_warn};

/// Builds a fresh worker strategy; called at startup and on restart
pub type BackendFactory = Box<dyn FnMut() -> Result<Box<dyn ComputeBackend>, OffloadError>>;
type FallbackCallback = Box<dyn FnOnce(&OffloadError)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadConfig {
    pub enabled: bool,
    pub timeout: Duration,
    pub parallel_threshold: usize,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self { enabled: true, timeout: Duration::from_millis(2_000), parallel_threshold: 4 }
    }
}

impl From<&ChartOptions> for OffloadConfig {
    fn from(options: &ChartOptions) -> Self {
        Self {
            enabled: options.offload_enabled,
            timeout: Duration::from_millis(options.offload_timeout_ms),
            parallel_threshold: options.parallel_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffloadStats {
    /// Jobs handed to the worker strategy
    pub dispatched: usize,
    pub cache_hits: usize,
    pub restarts: usize,
    pub failures: usize,
    /// Jobs computed on the calling thread
    pub inline_computations: usize,
    /// Permanent inline mode after repeated worker failure
    pub fallback_active: bool,
}

enum Strategy {
    Worker(Box<dyn ComputeBackend>),
    Inline,
}

struct ManagerState {
    strategy: Strategy,
    /// Created the first time something runs inline
    inline: Option<InlineBackend>,
    factory: Option<BackendFactory>,
    /// Shared with in-flight replies so their deadlines outlive a fallback
    timer: Option<Rc<TimerService>>,
    cache: ResultCache,
    stats: OffloadStats,
    failures: u32,
    /// Bumped whenever the strategy is replaced; failures from an older
    /// backend are not held against the current one
    generation: u64,
    fallback_reason: Option<OffloadError>,
    on_fallback: Option<FallbackCallback>,
    /// Notification waiting to run once the state is no longer borrowed
    pending_notice: Option<(FallbackCallback, OffloadError)>,
    shut_down: bool,
}

impl ManagerState {
    fn inline_mut(&mut self) -> &mut InlineBackend {
        self.inline.get_or_insert_with(|| {
            log_debug!(LogComponent::Infrastructure("Offload"), "inline backend created");
            InlineBackend::new()
        })
    }

    /// First failure restarts the worker, the second one (or a failed
    /// restart) switches to inline for good.
    fn record_failure(&mut self, error: OffloadError) {
        self.failures += 1;
        self.stats.failures += 1;
        if let Strategy::Worker(backend) = &mut self.strategy {
            backend.shutdown();
        }

        if self.failures == 1
            && let Some(factory) = self.factory.as_mut()
        {
            match factory() {
                Ok(backend) => {
                    log_warn!(
                        LogComponent::Infrastructure("Offload"),
                        "worker failed ({}), restarted",
                        error
                    );
                    self.strategy = Strategy::Worker(backend);
                    self.generation += 1;
                    self.stats.restarts += 1;
                    return;
                }
                Err(restart_error) => {
                    log_warn!(
                        LogComponent::Infrastructure("Offload"),
                        "worker restart failed: {}",
                        restart_error
                    );
                }
            }
        }
        self.enter_fallback(error);
    }

    fn enter_fallback(&mut self, error: OffloadError) {
        self.strategy = Strategy::Inline;
        self.generation += 1;
        self.factory = None;
        self.timer = None;
        if self.stats.fallback_active {
            return;
        }
        self.stats.fallback_active = true;
        log_error!(
            LogComponent::Infrastructure("Offload"),
            "worker unusable ({}), computing inline for the rest of the session",
            error
        );
        match self.on_fallback.take() {
            Some(callback) => self.pending_notice = Some((callback, error)),
            None => self.fallback_reason = Some(error),
        }
    }
}

/// Cheaply clonable handle; futures it returns own a clone and never borrow
/// the caller.
#[derive(Clone)]
pub struct OffloadManager {
    state: Rc<RefCell<ManagerState>>,
    timeout: Duration,
}

impl std::fmt::Debug for OffloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffloadManager")
            .field("strategy", &self.strategy_name())
            .field("stats", &self.stats())
            .finish()
    }
}

impl OffloadManager {
    /// Probe once for a worker thread and pick the strategy
    pub fn new(config: OffloadConfig) -> Self {
        let threshold = config.parallel_threshold;
        let factory: BackendFactory = Box::new(move || {
            WorkerBackend::spawn(threshold).map(|w| Box::new(w) as Box<dyn ComputeBackend>)
        });
        Self::with_backend_factory(config, factory)
    }

    /// Like [`OffloadManager::new`] with a custom worker strategy
    pub fn with_backend_factory(config: OffloadConfig, mut factory: BackendFactory) -> Self {
        let mut strategy = Strategy::Inline;
        let mut timer = None;
        let mut kept_factory = None;

        if config.enabled {
            match (factory(), TimerService::spawn()) {
                (Ok(backend), Ok(service)) => {
                    log_info!(
                        LogComponent::Infrastructure("Offload"),
                        "using {} strategy",
                        backend.name()
                    );
                    strategy = Strategy::Worker(backend);
                    timer = Some(Rc::new(service));
                    kept_factory = Some(factory);
                }
                (Err(e), _) | (_, Err(e)) => {
                    log_info!(
                        LogComponent::Infrastructure("Offload"),
                        "no worker available ({}), computing inline",
                        e
                    );
                }
            }
        }

        let state = ManagerState {
            strategy,
            inline: None,
            factory: kept_factory,
            timer,
            cache: ResultCache::new(),
            stats: OffloadStats::default(),
            failures: 0,
            generation: 0,
            fallback_reason: None,
            on_fallback: None,
            pending_notice: None,
            shut_down: false,
        };
        Self { state: Rc::new(RefCell::new(state)), timeout: config.timeout }
    }

    /// Inline-only manager
    pub fn inline() -> Self {
        Self::new(OffloadConfig { enabled: false, ..OffloadConfig::default() })
    }

    pub fn strategy_name(&self) -> &'static str {
        match &self.state.borrow().strategy {
            Strategy::Worker(backend) => backend.name(),
            Strategy::Inline => "inline",
        }
    }

    pub fn stats(&self) -> OffloadStats {
        self.state.borrow().stats.clone()
    }

    pub fn cached_entries(&self) -> usize {
        self.state.borrow().cache.len()
    }

    /// One-time notification when the manager gives up on the worker. If
    /// that already happened the callback runs right away.
    pub fn on_fallback<F>(&self, callback: F)
    where
        F: FnOnce(&OffloadError) + 'static,
    {
        let pending = self.state.borrow_mut().fallback_reason.take();
        match pending {
            Some(reason) => callback(&reason),
            None => self.state.borrow_mut().on_fallback = Some(Box::new(callback)),
        }
    }

    pub fn clear_cache(&self) {
        self.state.borrow_mut().cache.clear();
    }

    /// Stored values changed in a way that shifts indices or rewrites
    /// existing points
    pub fn invalidate_for_data(&self) {
        let mut state = self.state.borrow_mut();
        if !state.cache.is_empty() {
            log_debug!(
                LogComponent::Infrastructure("Offload"),
                "dropping {} cached series",
                state.cache.len()
            );
        }
        state.cache.clear();
    }

    pub fn forget_series(&self, series_id: &str) {
        self.state.borrow_mut().cache.remove_series(series_id);
    }

    pub fn shutdown(&self) {
        let mut state = self.state.borrow_mut();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        if let Strategy::Worker(backend) = &mut state.strategy {
            backend.shutdown();
        }
        state.strategy = Strategy::Inline;
        state.generation += 1;
        state.factory = None;
        state.timer = None;
        state.on_fallback = None;
        state.cache.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }

    pub fn calculate(
        &self,
        config: &SeriesConfig,
        candles: Arc<Vec<Candle>>,
    ) -> impl Future<Output = ChartResult<Arc<SeriesResult>>> + use<> {
        let many = self.calculate_many(std::slice::from_ref(config), candles);
        async move {
            many.await
                .into_iter()
                .next()
                .unwrap_or_else(|| Err(ChartError::Data("no result produced".into())))
        }
    }

    /// Results in config order. Cache hits never reach a backend.
    pub fn calculate_many(
        &self,
        configs: &[SeriesConfig],
        candles: Arc<Vec<Candle>>,
    ) -> impl Future<Output = Vec<ChartResult<Arc<SeriesResult>>>> + use<> {
        let requests: Vec<(SeriesConfig, Option<PaintRequest>)> =
            configs.iter().map(|c| (c.clone(), None)).collect();
        let run = self.run(requests, candles);
        async move { run.await.into_iter().map(|r| r.map(|(result, _)| result)).collect() }
    }

    /// Compute a series and build its paint commands in the same job
    pub fn compute_and_paint(
        &self,
        config: &SeriesConfig,
        candles: Arc<Vec<Candle>>,
        paint: PaintRequest,
    ) -> impl Future<Output = ChartResult<(Arc<SeriesResult>, Option<DisplayList>)>> + use<> {
        let run = self.run(vec![(config.clone(), Some(paint))], candles);
        async move {
            run.await
                .into_iter()
                .next()
                .unwrap_or_else(|| Err(ChartError::Data("no result produced".into())))
        }
    }

    fn run(
        &self,
        requests: Vec<(SeriesConfig, Option<PaintRequest>)>,
        candles: Arc<Vec<Candle>>,
    ) -> impl Future<Output = Vec<ChartResult<(Arc<SeriesResult>, Option<DisplayList>)>>> + use<>
    {
        let state = Rc::clone(&self.state);
        let timeout = self.timeout;
        let data_len = candles.len();

        // resolve cache hits and config errors up front
        let mut slots: Vec<Option<ChartResult<(Arc<SeriesResult>, Option<DisplayList>)>>> =
            Vec::with_capacity(requests.len());
        let mut jobs: Vec<(usize, CacheKey, ComputeJob)> = Vec::new();
        {
            let mut guard = state.borrow_mut();
            for (index, (config, paint)) in requests.into_iter().enumerate() {
                if guard.shut_down {
                    slots.push(Some(Err(ChartError::Destroyed)));
                    continue;
                }
                let spec = match config.parse() {
                    Ok(spec) => spec,
                    Err(e) => {
                        slots.push(Some(Err(e)));
                        continue;
                    }
                };
                let key = CacheKey::new(&config, spec.kind(), data_len);
                if paint.is_none()
                    && let Some(hit) = guard.cache.get(&key)
                {
                    guard.stats.cache_hits += 1;
                    slots.push(Some(Ok((hit, None))));
                    continue;
                }
                slots.push(None);
                let job = ComputeJob {
                    series_id: config.id.clone(),
                    spec,
                    candles: Arc::clone(&candles),
                    paint,
                };
                jobs.push((index, key, job));
            }
        }

        async move {
            if !jobs.is_empty() {
                let batch: Vec<ComputeJob> = jobs.iter().map(|(_, _, job)| job.clone()).collect();
                let outputs = dispatch(&state, batch, timeout).await;
                let mut guard = state.borrow_mut();
                for ((index, key, _), output) in jobs.into_iter().zip(outputs) {
                    slots[index] = Some(match output {
                        Ok(output) => {
                            let result = Arc::new(output.result);
                            guard.cache.insert(key, Arc::clone(&result));
                            Ok((result, output.paint))
                        }
                        Err(e) => Err(ChartError::Offload(e)),
                    });
                }
            }
            slots
                .into_iter()
                .map(|slot| slot.unwrap_or_else(|| Err(ChartError::Offload(OffloadError::Crashed))))
                .collect()
        }
    }
}

/// Run a batch on the current strategy. Crashed jobs are retried after the
/// failure policy has run; timed-out jobs are rejected. Failures reported by
/// a backend that has since been replaced only retry.
async fn dispatch(
    state: &Rc<RefCell<ManagerState>>,
    batch: Vec<ComputeJob>,
    timeout: Duration,
) -> Vec<Result<JobOutput, OffloadError>> {
    let mut results: Vec<Option<Result<JobOutput, OffloadError>>> = vec![None; batch.len()];
    let mut pending: Vec<usize> = (0..batch.len()).collect();

    while !pending.is_empty() {
        let jobs: Vec<ComputeJob> = pending.iter().map(|&i| batch[i].clone()).collect();

        let (generation, submitted) = {
            let mut guard = state.borrow_mut();
            let generation = guard.generation;
            let submitted = match &mut guard.strategy {
                Strategy::Inline => None,
                Strategy::Worker(backend) => Some(backend.submit(jobs.clone())),
            };
            match submitted {
                None => {
                    guard.stats.inline_computations += jobs.len();
                    let outputs = guard.inline_mut().run(&jobs);
                    for (&i, output) in pending.iter().zip(outputs) {
                        results[i] = Some(Ok(output));
                    }
                    break;
                }
                Some(Err(e)) => {
                    guard.record_failure(e);
                    continue;
                }
                Some(Ok(replies)) => {
                    guard.stats.dispatched += jobs.len();
                    let deadlines: Vec<Option<Deadline>> = replies
                        .iter()
                        .map(|_| guard.timer.as_ref().map(|t| (t.after(timeout), Rc::clone(t))))
                        .collect();
                    (generation, replies.into_iter().zip(deadlines).collect::<Vec<_>>())
                }
            }
        };

        let outcomes = join_all(submitted.into_iter().map(|(reply, deadline)| await_reply(reply, deadline))).await;

        let mut crashed = Vec::new();
        let mut timed_out = Vec::new();
        let mut failure = None;
        for (&i, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(output) => results[i] = Some(Ok(output)),
                Err(OffloadError::Timeout) => {
                    failure.get_or_insert(OffloadError::Timeout);
                    timed_out.push(i);
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    crashed.push(i);
                }
            }
        }

        pending = match failure {
            None => Vec::new(),
            Some(e) => {
                let mut guard = state.borrow_mut();
                if guard.generation == generation {
                    for &i in &timed_out {
                        results[i] = Some(Err(OffloadError::Timeout));
                    }
                    guard.record_failure(e);
                    crashed
                } else {
                    log_debug!(
                        LogComponent::Infrastructure("Offload"),
                        "{} job(s) lost by a replaced backend ({}), retrying",
                        crashed.len() + timed_out.len(),
                        e
                    );
                    crashed.extend(timed_out);
                    crashed.sort_unstable();
                    crashed
                }
            }
        };
    }

    // callbacks may call back into the manager, so run them unborrowed
    let notice = state.borrow_mut().pending_notice.take();
    if let Some((callback, error)) = notice {
        callback(&error);
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or(Err(OffloadError::Crashed)))
        .collect()
}

/// A request's deadline and the timer that will fire it
type Deadline = (oneshot::Receiver<()>, Rc<TimerService>);

async fn await_reply(reply: JobReply, deadline: Option<Deadline>) -> Result<JobOutput, OffloadError> {
    match deadline {
        None => reply.await.map_err(|_| OffloadError::Crashed),
        Some((deadline, _timer)) => match select(reply, deadline).await {
            Either::Left((result, _)) => result.map_err(|_| OffloadError::Crashed),
            // a lost deadline counts as expired
            Either::Right(_) => Err(OffloadError::Timeout),
        },
    }
}
