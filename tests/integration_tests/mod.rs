//! Integration tests module
//!
//! End-to-end tests of the coupon ingestion system:
//! - Complete source → channel → workers → registry → validator flow
//! - Backpressure and parallel loading
//! - Error handling and cancellation

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
