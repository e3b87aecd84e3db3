//! End-to-end pipeline integration tests
//!
//! Tests the complete workflow:
//! 1. Three sources written to disk
//! 2. Sequential (or parallel) load through the worker pool
//! 3. Registry membership
//! 4. Coupon validation and order pricing

use couponbase::config::IngestConfig;
use couponbase::ingest::{CouponLoader, LoadPipeline, Shutdown, SourceReader};
use couponbase::models::SourceId;
use couponbase::orders::{DiscountPolicy, LineItem, OrderPricer};
use couponbase::registry::CouponRegistry;
use couponbase::validator::{CouponRule, CouponValidator};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::fixtures::{generated_codes, scenario_sources, write_source, write_sources};

// ============================================================================
// Complete Pipeline Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reference_scenario() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(CouponRegistry::new());

    let report = CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &scenario_sources(&dir), Shutdown::never())
        .await
        .unwrap();

    assert_eq!(report.total_codes, 3);
    assert_eq!(report.sources.len(), 3);

    let validator = CouponValidator::new(registry, CouponRule::default()).unwrap();
    assert!(validator.is_valid_coupon("ABCD1234")); // {1,2}
    assert!(validator.is_valid_coupon("WXYZ7890")); // {2,3}
    assert!(!validator.is_valid_coupon("QQQQ1111")); // {3}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seven_char_code_in_two_sources_is_invalid() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(&dir, &["SHORT77"], &["SHORT77"], &[]);
    let registry = Arc::new(CouponRegistry::new());

    CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &sources, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(registry.source_count_of("SHORT77"), 2);
    let validator = CouponValidator::new(registry, CouponRule::default()).unwrap();
    assert!(!validator.is_valid_coupon("SHORT77"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_code_in_all_three_sources_is_invalid() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(&dir, &["EVERYWHERE"], &["EVERYWHERE"], &["EVERYWHERE"]);
    let registry = Arc::new(CouponRegistry::new());

    CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &sources, Shutdown::never())
        .await
        .unwrap();

    let validator = CouponValidator::new(registry, CouponRule::default()).unwrap();
    assert!(!validator.is_valid_coupon("EVERYWHERE"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_lines_within_source_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(
        &dir,
        &["DUPE0001", "DUPE0001", "DUPE0001"],
        &["OTHER001"],
        &["OTHER001"],
    );
    let registry = Arc::new(CouponRegistry::new());

    let report = CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &sources, Shutdown::never())
        .await
        .unwrap();

    let s1 = report.source(SourceId::One).unwrap();
    assert_eq!(s1.lines_read, 3);
    assert_eq!(s1.distinct_codes, 1);
    assert_eq!(registry.source_count_of("DUPE0001"), 1);
    assert_eq!(registry.source_count_of("OTHER001"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalid_utf8_line_keeps_rest_of_source() {
    let registry = Arc::new(CouponRegistry::new());
    let data: &'static [u8] = b"AAAA1111\n\xffBADBYTE\nBBBB2222\nCCCC3333\n";
    let reader = SourceReader::from_reader(SourceId::One, "mem", data);

    let stats = LoadPipeline::builder()
        .build()
        .load_source(&registry, reader, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(stats.lines_read, 4);
    assert!(!stats.interrupted);
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.source_count_of("BBBB2222"), 1);
    assert_eq!(registry.source_count_of("CCCC3333"), 1);
}

// ============================================================================
// Backpressure Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_deadlock_under_backpressure() {
    let dir = TempDir::new().unwrap();
    let codes = generated_codes(10_000, 10_000);
    let lines: Vec<&str> = codes.iter().map(String::as_str).collect();
    let path = write_source(&dir, "big", &lines);

    let registry = Arc::new(CouponRegistry::new());
    let pipeline = LoadPipeline::builder().channel_capacity(10).workers(3).build();
    let reader = SourceReader::open(SourceId::One, &path).await.unwrap();

    let stats = tokio::time::timeout(
        Duration::from_secs(30),
        pipeline.load_source(&registry, reader, Shutdown::never()),
    )
    .await
    .expect("load should not deadlock")
    .unwrap();

    assert_eq!(stats.lines_read, 10_000);
    assert_eq!(stats.codes_applied, 10_000);
    assert_eq!(stats.distinct_codes, 10_000);
    assert_eq!(registry.codes_in(SourceId::One), 10_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backpressure_with_duplicates_counts_distinct_codes() {
    let dir = TempDir::new().unwrap();
    let codes = generated_codes(10_000, 2_500);
    let lines: Vec<&str> = codes.iter().map(String::as_str).collect();
    let path = write_source(&dir, "dupes", &lines);

    let registry = Arc::new(CouponRegistry::with_shards(1));
    let pipeline = LoadPipeline::builder().channel_capacity(10).workers(3).build();
    let reader = SourceReader::open(SourceId::Two, &path).await.unwrap();

    let stats = pipeline
        .load_source(&registry, reader, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(stats.lines_read, 10_000);
    assert_eq!(stats.distinct_codes, 2_500);
    assert_eq!(registry.len(), 2_500);
}

// ============================================================================
// Parallel Loading Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_and_sequential_loads_agree() {
    let dir = TempDir::new().unwrap();
    let s1 = generated_codes(3_000, 3_000);
    let s2: Vec<String> = (1_500..4_500).map(|i| format!("GEN{i:05}")).collect();
    let s3: Vec<String> = (2_500..3_500).map(|i| format!("GEN{i:05}")).collect();
    fn as_refs(v: &Vec<String>) -> Vec<&str> {
        v.iter().map(String::as_str).collect::<Vec<_>>()
    }
    let sources = write_sources(&dir, &as_refs(&s1), &as_refs(&s2), &as_refs(&s3));

    let sequential = Arc::new(CouponRegistry::new());
    CouponLoader::new(&IngestConfig::default())
        .load_all(&sequential, &sources, Shutdown::never())
        .await
        .unwrap();

    let parallel = Arc::new(CouponRegistry::new());
    let config = IngestConfig {
        parallel_sources: true,
        channel_capacity: 16,
        workers: 4,
        ..Default::default()
    };
    CouponLoader::new(&config)
        .load_all(&parallel, &sources, Shutdown::never())
        .await
        .unwrap();

    assert!(parallel.is_ready());
    assert_eq!(sequential.count_histogram(), parallel.count_histogram());
    for code in ["GEN00000", "GEN01600", "GEN02600", "GEN04000"] {
        assert_eq!(
            sequential.membership_of(code),
            parallel.membership_of(code),
            "membership of {code}"
        );
    }
}

// ============================================================================
// Order Pricing Tests
// ============================================================================

#[tokio::test]
async fn test_order_discount_after_load() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(CouponRegistry::new());
    CouponLoader::new(&IngestConfig::default())
        .load_all(&registry, &scenario_sources(&dir), Shutdown::never())
        .await
        .unwrap();

    let validator = CouponValidator::new(registry, CouponRule::default()).unwrap();
    let pricer = OrderPricer::new(validator, DiscountPolicy::default());
    let items = [LineItem::new("1", Decimal::new(2000, 2), 3)];

    let discounted = pricer.quote(&items, Some("WXYZ7890")).unwrap();
    assert_eq!(discounted.subtotal, Decimal::new(60, 0));
    assert_eq!(discounted.discount, Decimal::new(6, 0));
    assert_eq!(discounted.total, Decimal::new(54, 0));

    let full_price = pricer.quote(&items, Some("QQQQ1111")).unwrap();
    assert_eq!(full_price.total, Decimal::new(60, 0));
}
