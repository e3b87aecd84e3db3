//! Startup orchestration of the three load phases
//!
//! Opens each configured source, runs it through the [`LoadPipeline`] and
//! marks it as loaded on the registry. Sources load one after another by
//! default; with `parallel_sources` the three loads share the registry
//! concurrently, which is safe because upserts commute.
//!
//! Any source that cannot be opened aborts the whole startup.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{IngestConfig, SourcesConfig};
use crate::ingest::error::{IngestError, IngestResult};
use crate::ingest::pipeline::{LoadPipeline, PipelineConfig, SourceLoadStats};
use crate::ingest::reader::SourceReader;
use crate::ingest::shutdown::Shutdown;
use crate::models::SourceId;
use crate::registry::CouponRegistry;

// ============================================================================
// Load Report
// ============================================================================

/// Summary of a full startup load
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Per-source results in source order
    pub sources: Vec<SourceLoadStats>,

    /// Distinct codes across all sources
    pub total_codes: usize,

    /// Codes seen in exactly one, two and three sources
    pub in_one: usize,
    pub in_two: usize,
    pub in_three: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl LoadReport {
    fn new(mut sources: Vec<SourceLoadStats>, registry: &CouponRegistry, started_at: DateTime<Utc>) -> Self {
        sources.sort_by_key(|s| s.source);
        let histogram = registry.count_histogram();
        Self {
            sources,
            total_codes: registry.len(),
            in_one: histogram[1],
            in_two: histogram[2],
            in_three: histogram[3],
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// True when any source stopped early on a read error
    pub fn is_lossy(&self) -> bool {
        self.sources.iter().any(|s| s.interrupted)
    }

    /// Stats for one source
    pub fn source(&self, source: SourceId) -> Option<&SourceLoadStats> {
        self.sources.iter().find(|s| s.source == source)
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loads all coupon sources into a registry
#[derive(Debug, Clone)]
pub struct CouponLoader {
    pipeline: LoadPipeline,
    parallel: bool,
}

impl CouponLoader {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            pipeline: LoadPipeline::new(PipelineConfig {
                workers: config.workers,
                channel_capacity: config.channel_capacity,
            }),
            parallel: config.parallel_sources,
        }
    }

    /// Use an existing pipeline
    pub fn with_pipeline(pipeline: LoadPipeline, parallel: bool) -> Self {
        Self { pipeline, parallel }
    }

    pub fn pipeline(&self) -> &LoadPipeline {
        &self.pipeline
    }

    /// Run every load phase; the registry is READY on success
    pub async fn load_all(
        &self,
        registry: &Arc<CouponRegistry>,
        sources: &SourcesConfig,
        shutdown: Shutdown,
    ) -> IngestResult<LoadReport> {
        let started_at = Utc::now();
        let locators = sources.locators();

        tracing::info!(parallel = self.parallel, shards = registry.shard_count(), "Loading coupon sources");

        let stats = if self.parallel {
            self.load_parallel(registry, locators, shutdown).await?
        } else {
            self.load_sequential(registry, locators, shutdown).await?
        };

        let report = LoadReport::new(stats, registry, started_at);
        if report.is_lossy() {
            tracing::warn!("Coupon registry under-represents at least one source because of read errors");
        }
        tracing::info!(
            total_codes = report.total_codes,
            in_two = report.in_two,
            "Coupon codes loaded"
        );

        Ok(report)
    }

    async fn load_sequential(
        &self,
        registry: &Arc<CouponRegistry>,
        locators: [(SourceId, PathBuf); 3],
        shutdown: Shutdown,
    ) -> IngestResult<Vec<SourceLoadStats>> {
        let mut stats = Vec::with_capacity(locators.len());
        for (source, path) in locators {
            let reader = SourceReader::open(source, &path).await?;
            let loaded = self.pipeline.load_source(registry, reader, shutdown.clone()).await?;
            registry.mark_loaded(source);
            stats.push(loaded);
        }
        Ok(stats)
    }

    async fn load_parallel(
        &self,
        registry: &Arc<CouponRegistry>,
        locators: [(SourceId, PathBuf); 3],
        shutdown: Shutdown,
    ) -> IngestResult<Vec<SourceLoadStats>> {
        // Open everything first so a missing source fails before any load starts.
        let mut readers = Vec::with_capacity(locators.len());
        for (source, path) in locators {
            readers.push(SourceReader::open(source, &path).await?);
        }

        let mut handles = Vec::with_capacity(readers.len());
        for reader in readers {
            let pipeline = self.pipeline.clone();
            let registry = Arc::clone(registry);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                let source = reader.source();
                let stats = pipeline.load_source(&registry, reader, shutdown).await?;
                registry.mark_loaded(source);
                Ok::<_, IngestError>(stats)
            }));
        }

        let mut stats = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (handle, source) in handles.into_iter().zip(SourceId::ALL) {
            match handle.await {
                Ok(Ok(loaded)) => stats.push(loaded),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(IngestError::WorkerFailed {
                        source_id: source,
                        reason: format!("load task: {e}"),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}
