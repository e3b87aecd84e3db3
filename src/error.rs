//! Unified error handling for the couponbase crate
//!
//! This module consolidates the domain-specific errors into a single `Error`
//! enum while keeping the domain errors usable on their own.
//!
//! # Architecture
//!
//! - [`CouponErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

use crate::models::SourceSet;

pub use crate::ingest::error::IngestError;
pub use crate::orders::OrderError;

/// Common trait for all couponbase error types
pub trait CouponErrorTrait: std::error::Error {
    /// Check if the failed operation may succeed when retried
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Source or file I/O
    Storage,
    /// Shutdown requested while work was in flight
    Cancelled,
    /// Task panics and lifecycle violations
    Concurrency,
    /// Rejected order input
    Order,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Cancelled => "cancelled",
            Self::Concurrency => "concurrency",
            Self::Order => "order",
        }
    }
}

/// Unified error type for the couponbase crate
#[derive(Error, Debug)]
pub enum Error {
    /// Ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Order pricing errors
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Registry queried before every source finished loading
    #[error("Coupon registry is not ready (loaded sources: {loaded})")]
    RegistryNotReady { loaded: SourceSet },
}

impl CouponErrorTrait for IngestError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::SourceOpen { .. } => false,
            Self::Cancelled { .. } => false,
            Self::WorkerFailed { .. } => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceOpen { .. } => ErrorCategory::Storage,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::WorkerFailed { .. } => ErrorCategory::Concurrency,
        }
    }
}

impl CouponErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Ingest(e) => e.is_recoverable(),
            Self::Order(_) => false,
            Self::RegistryNotReady { .. } => true, // Retry after loading
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Ingest(e) => e.category(),
            Self::Order(_) => ErrorCategory::Order,
            Self::RegistryNotReady { .. } => ErrorCategory::Concurrency,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
