//! Error scenario integration tests
//!
//! Tests various failure modes and error handling:
//! 1. Missing source at startup
//! 2. Read errors in the middle of a source
//! 3. Shutdown while a load is in flight
//! 4. Validator requested before the registry is ready

use couponbase::config::IngestConfig;
use couponbase::error::{CouponErrorTrait, Error, ErrorCategory};
use couponbase::ingest::{shutdown, CouponLoader, IngestError, LoadPipeline, Shutdown, SourceReader};
use couponbase::models::SourceId;
use couponbase::registry::CouponRegistry;
use couponbase::validator::{CouponRule, CouponValidator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader};

use super::fixtures::scenario_sources;

// ============================================================================
// Startup Failures
// ============================================================================

#[tokio::test]
async fn test_missing_third_source_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut sources = scenario_sources(&dir);
    sources.source3 = dir.path().join("gone");
    let registry = Arc::new(CouponRegistry::new());

    let err = CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &sources, Shutdown::never())
        .await
        .unwrap_err();

    assert_eq!(err.source_id(), SourceId::Three);
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert!(!registry.is_ready());

    // The first two phases did complete
    assert_eq!(registry.loaded_sources().len(), 2);
}

#[tokio::test]
async fn test_parallel_load_opens_everything_before_loading() {
    let dir = TempDir::new().unwrap();
    let mut sources = scenario_sources(&dir);
    sources.source1 = dir.path().join("gone");
    let registry = Arc::new(CouponRegistry::new());
    let config = IngestConfig {
        parallel_sources: true,
        ..Default::default()
    };

    let err = CouponLoader::new(&config)
        .load_all(&registry, &sources, Shutdown::never())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::SourceOpen { source_id: SourceId::One, .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_validator_before_ready_is_rejected() {
    let registry = Arc::new(CouponRegistry::new());
    registry.mark_loaded(SourceId::One);
    registry.mark_loaded(SourceId::Two);

    let err = CouponValidator::new(registry, CouponRule::default()).unwrap_err();
    assert!(matches!(err, Error::RegistryNotReady { .. }));
}

// ============================================================================
// Mid-stream Read Errors
// ============================================================================

#[tokio::test]
async fn test_read_error_keeps_lines_read_so_far() {
    let registry = Arc::new(CouponRegistry::new());
    let stream = tokio_test::io::Builder::new()
        .read(b"ABCD1234\n")
        .read(b"WXYZ7890\nQQQQ")
        .read_error(std::io::Error::new(std::io::ErrorKind::Other, "device reset"))
        .build();
    let reader = SourceReader::from_reader(SourceId::Two, "flaky", BufReader::new(stream));

    let stats = LoadPipeline::builder()
        .build()
        .load_source(&registry, reader, Shutdown::never())
        .await
        .expect("read errors are not fatal");

    assert!(stats.interrupted);
    assert_eq!(stats.lines_read, 2);
    assert_eq!(registry.source_count_of("ABCD1234"), 1);
    assert_eq!(registry.source_count_of("WXYZ7890"), 1);
    assert_eq!(registry.source_count_of("QQQQ"), 0);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_aborts_stalled_load() {
    let registry = Arc::new(CouponRegistry::new());
    let (mut writer, read_half) = tokio::io::duplex(64);
    writer.write_all(b"ABCD1234\nWXYZ7890\n").await.unwrap();

    // The writer stays open, so the source never reaches end of stream.
    let reader = SourceReader::from_reader(SourceId::One, "stalled", BufReader::new(read_half));
    let (trigger, shutdown) = shutdown::channel();

    let pipeline = LoadPipeline::builder().workers(2).channel_capacity(4).build();
    let load = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { pipeline.load_source(&registry, reader, shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    trigger.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), load)
        .await
        .expect("cancelled load must return")
        .unwrap();

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!err.is_recoverable());

    // Lines already streamed were applied before the barrier released.
    assert_eq!(registry.len(), 2);
    drop(writer);
}

#[tokio::test]
async fn test_shutdown_before_load_all_fails_first_phase() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(CouponRegistry::new());
    let (trigger, shutdown) = shutdown::channel();
    trigger.trigger();

    let err = CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &scenario_sources(&dir), shutdown)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.source_id(), SourceId::One);
    assert!(registry.loaded_sources().is_empty());
}
