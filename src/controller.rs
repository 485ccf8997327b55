use crate::aggregator::{BlockAggregator, BlockOutcome, ProcessedBlock};
use crate::cache::BlockCache;
use crate::errors::{AggregateError, RunError};
use crate::gateway::LedgerGateway;
use crate::histogram::{BinSet, HistogramSettings};
use crate::metrics::get_metrics;
use crate::range::GlobalRange;
use crate::sink::PresentationSink;
use crate::types::{BlockAggregate, BlockRow, PriceRange, RunState, RunStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Aggregation state of one run: the price range and the processed blocks.
///
/// The aggregator is the only writer of `range`; the controller's run task is
/// the only writer of `cache` and `binned_range`.
#[derive(Debug, Default)]
pub struct AggregationSession {
    pub range: GlobalRange,
    pub cache: RwLock<BlockCache>,
    /// Range the cached bins were last computed against.
    pub binned_range: RwLock<PriceRange>,
}

impl AggregationSession {
    pub fn new() -> Self {
        Self {
            range: GlobalRange::new(),
            cache: RwLock::new(BlockCache::new()),
            binned_range: RwLock::new(PriceRange::EMPTY),
        }
    }

    pub async fn reset(&self) {
        {
            let mut cache = self.cache.write().await;
            if !cache.is_empty() {
                debug!(blocks = cache.len(), "Dropping cached blocks");
            }
            cache.clear();
        }
        self.range.reset().await;
        *self.binned_range.write().await = PriceRange::EMPTY;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Default)]
struct ControllerState {
    status: RunStatus,
    request: Option<(i64, i64)>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Drives runs over descending block ranges.
#[derive(Clone)]
pub struct RunController {
    gateway: Arc<dyn LedgerGateway>,
    sink: Arc<dyn PresentationSink>,
    settings: HistogramSettings,
    session: Arc<AggregationSession>,
    state: Arc<RwLock<ControllerState>>,
    stop_requested: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RunController {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        sink: Arc<dyn PresentationSink>,
        settings: HistogramSettings,
    ) -> Self {
        Self {
            gateway,
            sink,
            settings,
            session: Arc::new(AggregationSession::new()),
            state: Arc::new(RwLock::new(ControllerState::default())),
            stop_requested: Arc::new(AtomicBool::new(false)),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts walking `range_count` blocks down from `range_start`.
    ///
    /// Does nothing while another run is in progress.
    pub async fn start(&self, range_start: i64, range_count: i64) -> Result<StartOutcome, RunError> {
        if range_count <= 0 {
            return Err(RunError::invalid_request(format!(
                "range count must be positive, got {}",
                range_count
            )));
        }

        if range_start < 0 {
            return Err(RunError::invalid_request(format!(
                "range start must not be negative, got {}",
                range_start
            )));
        }

        let (start, count) = (range_start as u64, range_count as u64);

        {
            let mut state = self.state.write().await;

            if state.status == RunStatus::Running {
                debug!("Run already in progress, ignoring start");
                return Ok(StartOutcome::AlreadyRunning);
            }

            state.status = RunStatus::Running;
            state.request = Some((range_start, range_count));
            state.started_at = Some(Utc::now());
            state.finished_at = None;
            state.last_error = None;
            self.stop_requested.store(false, Ordering::SeqCst);
        }

        info!(range_start = start, range_count = count, "Starting run");

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            controller.run(start, count).await;
        });

        *self.task.lock().await = Some(handle);

        Ok(StartOutcome::Started)
    }

    /// Like [`RunController::start`], starting at the ledger's latest block.
    pub async fn start_from_latest(&self, range_count: i64) -> Result<StartOutcome, RunError> {
        if range_count <= 0 {
            return Err(RunError::invalid_request(format!(
                "range count must be positive, got {}",
                range_count
            )));
        }

        let latest = self
            .gateway
            .get_latest_block_number()
            .await
            .map_err(RunError::LatestBlock)?;

        let latest = i64::try_from(latest)
            .map_err(|_| RunError::invalid_request(format!("block {} out of range", latest)))?;

        self.start(latest, range_count).await
    }

    /// Requests the current run to stop at the next block boundary.
    /// Returns whether a run was in progress.
    pub async fn stop(&self) -> bool {
        let state = self.state.read().await;

        if state.status != RunStatus::Running {
            return false;
        }

        info!("Stop requested");
        self.stop_requested.store(true, Ordering::SeqCst);
        true
    }

    /// Drops every cached block and the observed price range.
    pub async fn reset(&self) -> Result<(), RunError> {
        let mut state = self.state.write().await;

        if state.status == RunStatus::Running {
            return Err(RunError::ResetWhileRunning);
        }

        self.session.reset().await;
        *state = ControllerState::default();

        info!("Run state reset");
        Ok(())
    }

    /// Waits for the spawned run task, if any, to finish.
    pub async fn wait(&self) {
        let handle = self.task.lock().await.take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Run task aborted");
            }
        }
    }

    pub async fn get_state(&self) -> RunState {
        let state = self.state.read().await;
        let cached_blocks = self.session.cache.read().await.len();
        let range = self.session.range.snapshot().await;
        let status = state.status;

        RunState {
            status,
            running: status == RunStatus::Running,
            requested_range_start: state.request.map(|(start, _)| start),
            requested_range_count: state.request.map(|(_, count)| count),
            cached_blocks,
            range,
            started_at: state.started_at,
            finished_at: state.finished_at,
            last_error: state.last_error.clone(),
        }
    }

    /// Cached rows, highest block first, taken under one read lock.
    pub async fn snapshot(&self) -> Vec<BlockRow> {
        let cache = self.session.cache.read().await;
        let range = *self.session.binned_range.read().await;
        cache.rows(range)
    }

    async fn run(&self, start: u64, count: u64) {
        let started = Instant::now();
        let lowest = start.saturating_sub(count - 1);

        let aggregator = BlockAggregator::new(
            self.gateway.as_ref(),
            &self.session.range,
            self.sink.as_ref(),
            &self.stop_requested,
        );

        for block_number in (lowest..=start).rev() {
            if self.stop_requested.load(Ordering::SeqCst) {
                info!(block_number, "Run stopped");
                break;
            }

            if self.session.cache.read().await.contains(block_number) {
                debug!(block_number, "Block already cached, skipping");
                continue;
            }

            match aggregator.process_block(block_number).await {
                Ok(BlockOutcome::Processed(block)) => {
                    if self.stop_requested.load(Ordering::SeqCst) {
                        info!(block_number, "Discarding block completed after stop");
                        break;
                    }

                    self.apply(block).await;
                }
                Ok(BlockOutcome::Cancelled) => {
                    info!(block_number, "Run stopped");
                    break;
                }
                Err(e) => {
                    self.fail(e).await;
                    self.sink.on_run_summary(started.elapsed().as_millis() as u64);
                    return;
                }
            }
        }

        {
            let mut state = self.state.write().await;
            state.status = RunStatus::Idle;
            state.finished_at = Some(Utc::now());
        }

        self.sink.on_run_summary(started.elapsed().as_millis() as u64);
    }

    /// Caches a processed block and re-bins what the current range invalidated.
    async fn apply(&self, block: ProcessedBlock) {
        let ProcessedBlock {
            block_number,
            samples,
            stats,
            range_changed,
        } = block;

        let range = self.session.range.snapshot().await;
        let transactions = samples.len();

        let mut cache = self.session.cache.write().await;
        let mut binned_range = self.session.binned_range.write().await;

        cache.insert(BlockAggregate {
            block_number,
            samples,
            stats,
            bins: BinSet::empty(self.settings.num_bins),
        });

        let metrics = get_metrics();
        if let Some(metrics) = &metrics {
            metrics.record_block(transactions, range);
        }

        // A discarded block may have widened the range too, so compare against
        // what the cached bins were built with
        if range_changed || *binned_range != range {
            cache.rebin_all(range, &self.settings);
            *binned_range = range;

            if let Some(metrics) = &metrics {
                metrics.record_rebin_sweep();
            }

            let rows = cache.rows(range);
            drop(binned_range);
            drop(cache);

            debug!(block_number, blocks = rows.len(), "Range changed, re-binned cache");
            self.sink.on_range_changed(&rows);
        } else {
            let row = cache
                .rebin(block_number, range, &self.settings)
                .map(|aggregate| aggregate.to_row(range));
            drop(binned_range);
            drop(cache);

            if let Some(row) = row {
                self.sink.on_block_aggregate(&row);
            }
        }
    }

    async fn fail(&self, e: AggregateError) {
        error!(error = %e, "Run failed");
        let message = e.to_string();

        {
            let mut state = self.state.write().await;
            state.status = RunStatus::Failed;
            state.finished_at = Some(Utc::now());
            state.last_error = Some(message.clone());
        }

        self.sink.on_run_failed(&message);
    }
}
