//! Producer/consumer load pipeline
//!
//! Streams one coupon source into the shared registry using a bounded
//! `tokio::sync::mpsc` channel and a fixed pool of membership workers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  bounded mpsc  ┌──────────────┐   upsert   ┌────────────┐
//! │   Source    │───────────────▶│  Membership  │───────────▶│   Coupon   │
//! │   Reader    │   (capacity C) │  Workers (N) │  per shard │  Registry  │
//! └─────────────┘                └──────────────┘    lock    └────────────┘
//!        │                              │
//!        └──────── join barrier ────────┘
//! ```
//!
//! The reader suspends while the channel is full, workers suspend while it is
//! empty. Dropping the only sender closes the channel exactly once; workers
//! exit after it is closed and drained, and [`LoadPipeline::load_source`]
//! returns only after every task has been joined.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use couponbase::ingest::{LoadPipeline, Shutdown, SourceReader};
//! use couponbase::models::SourceId;
//! use couponbase::registry::CouponRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(CouponRegistry::new());
//! let pipeline = LoadPipeline::builder().workers(3).channel_capacity(100).build();
//!
//! let reader = SourceReader::open(SourceId::One, "couponbase1").await?;
//! let stats = pipeline.load_source(&registry, reader, Shutdown::never()).await?;
//! println!("Loaded {} lines", stats.lines_read);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ingest::error::{IngestError, IngestResult};
use crate::ingest::reader::SourceReader;
use crate::ingest::shutdown::Shutdown;
use crate::models::SourceId;
use crate::registry::CouponRegistry;

// ============================================================================
// Configuration
// ============================================================================

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of membership workers per load
    pub workers: usize,

    /// Distribution channel capacity
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            channel_capacity: 100,
        }
    }
}

// ============================================================================
// Load Statistics
// ============================================================================

/// Counters shared by the tasks of one load
#[derive(Debug, Default)]
struct LoadCounters {
    /// Codes taken off the channel and applied to the registry
    applied: AtomicU64,
}

/// Outcome of loading one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceLoadStats {
    /// Source that was loaded
    pub source: SourceId,

    /// Path or `-` for stdin
    pub locator: String,

    /// Lines streamed by the reader
    pub lines_read: u64,

    /// Upserts performed by the workers
    pub codes_applied: u64,

    /// Distinct codes in the registry attributed to this source
    pub distinct_codes: usize,

    /// Stream ended early on a read error
    pub interrupted: bool,

    /// Wall time of the load
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// What the reader task hands back at the barrier
struct ReaderOutcome {
    locator: String,
    lines_read: u64,
    interrupted: bool,
    cancelled: bool,
}

// ============================================================================
// Pipeline Implementation
// ============================================================================

/// Reader → channel → worker pool load pipeline
#[derive(Debug, Clone)]
pub struct LoadPipeline {
    config: PipelineConfig,
}

impl LoadPipeline {
    /// Create a pipeline; zero workers or zero capacity are raised to one
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: PipelineConfig {
                workers: config.workers.max(1),
                channel_capacity: config.channel_capacity.max(1),
            },
        }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stream `reader` into `registry` and wait for the barrier
    ///
    /// Returns [`IngestError::Cancelled`] if `shutdown` fires before the
    /// source is exhausted. The registry is not marked as loaded here; the
    /// caller decides when a phase counts as complete.
    pub async fn load_source(
        &self,
        registry: &Arc<CouponRegistry>,
        reader: SourceReader,
        shutdown: Shutdown,
    ) -> IngestResult<SourceLoadStats> {
        let source = reader.source();
        let started = Instant::now();
        let _timer = crate::metrics::start_load_timer(source.as_str());

        tracing::info!(
            source = %source,
            locator = %reader.locator(),
            workers = self.config.workers,
            channel_capacity = self.config.channel_capacity,
            "Starting coupon source load"
        );

        let (code_tx, code_rx) = mpsc::channel::<String>(self.config.channel_capacity);
        let counters = Arc::new(LoadCounters::default());

        let worker_handles = self.spawn_membership_workers(source, code_rx, registry, &counters);
        let reader_handle = spawn_reader(reader, code_tx, shutdown);

        // Barrier: reader first (it owns the sender), then every worker.
        // A failed reader has dropped the sender too, so the workers still finish.
        let outcome = reader_handle.await.map_err(|e| {
            tracing::error!(source = %source, error = %e, "Source reader task failed");
            IngestError::WorkerFailed {
                source_id: source,
                reason: format!("reader task: {e}"),
            }
        });

        let mut failure = None;
        for (worker_id, handle) in worker_handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(source = %source, worker_id, error = %e, "Membership worker failed");
                failure.get_or_insert(IngestError::WorkerFailed {
                    source_id: source,
                    reason: format!("worker {worker_id}: {e}"),
                });
            }
        }

        let outcome = outcome?;
        if let Some(err) = failure {
            return Err(err);
        }

        crate::metrics::record_lines_read(source.as_str(), outcome.lines_read);
        crate::metrics::set_registry_codes(registry.len());

        if outcome.cancelled {
            tracing::warn!(
                source = %source,
                lines_read = outcome.lines_read,
                "Coupon source load cancelled"
            );
            return Err(IngestError::Cancelled { source_id: source });
        }

        let stats = SourceLoadStats {
            source,
            locator: outcome.locator,
            lines_read: outcome.lines_read,
            codes_applied: counters.applied.load(Ordering::Relaxed),
            distinct_codes: registry.codes_in(source),
            interrupted: outcome.interrupted,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            source = %source,
            lines_read = stats.lines_read,
            distinct_codes = stats.distinct_codes,
            interrupted = stats.interrupted,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Coupon source load completed"
        );

        Ok(stats)
    }

    /// Spawn the membership worker tasks
    fn spawn_membership_workers(
        &self,
        source: SourceId,
        code_rx: mpsc::Receiver<String>,
        registry: &Arc<CouponRegistry>,
        counters: &Arc<LoadCounters>,
    ) -> Vec<JoinHandle<()>> {
        let code_rx = Arc::new(tokio::sync::Mutex::new(code_rx));
        let mut handles = Vec::with_capacity(self.config.workers);

        for worker_id in 0..self.config.workers {
            let code_rx = Arc::clone(&code_rx);
            let registry = Arc::clone(registry);
            let counters = Arc::clone(counters);

            let handle = tokio::spawn(async move {
                tracing::debug!(source = %source, worker_id, "Membership worker started");
                let mut applied = 0u64;

                loop {
                    let code = {
                        let mut rx = code_rx.lock().await;
                        rx.recv().await
                    };

                    let code = match code {
                        Some(c) => c,
                        None => break, // Closed and drained
                    };

                    registry.upsert(&code, source);
                    applied += 1;
                }

                counters.applied.fetch_add(applied, Ordering::Relaxed);
                tracing::debug!(source = %source, worker_id, applied, "Membership worker shutting down");
            });

            handles.push(handle);
        }

        handles
    }
}

/// Spawn the producer task; it owns the only sender and the source handle
fn spawn_reader(
    mut reader: SourceReader,
    code_tx: mpsc::Sender<String>,
    mut shutdown: Shutdown,
) -> JoinHandle<ReaderOutcome> {
    tokio::spawn(async move {
        let mut cancelled = shutdown.is_triggered();

        while !cancelled {
            let next = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    cancelled = true;
                    break;
                }
                code = reader.next_code() => code,
            };

            let Some(code) = next else {
                break;
            };

            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    cancelled = true;
                }
                sent = code_tx.send(code) => {
                    if sent.is_err() {
                        tracing::error!(source = %reader.source(), "Code channel closed before end of stream");
                        break;
                    }
                }
            }
        }

        // Close the channel exactly once, then release the source handle.
        drop(code_tx);

        ReaderOutcome {
            locator: reader.locator().to_owned(),
            lines_read: reader.lines_read(),
            interrupted: reader.interrupted(),
            cancelled,
        }
    })
}

// ============================================================================
// Pipeline Builder
// ============================================================================

/// Builder for [`LoadPipeline`]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set number of membership workers
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> LoadPipeline {
        LoadPipeline::new(self.config)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
