//! couponbase - concurrent coupon code ingestion
//!
//! Streams three coupon-code sources into a shared registry that remembers,
//! per code, which sources contained it, then answers discount-eligibility
//! queries against the frozen registry.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`ingest`] - Source readers, the bounded load pipeline and startup loader
//! - [`registry`] - Sharded code → membership map with its lifecycle state
//! - [`validator`] - Coupon rule evaluated over a READY registry
//! - [`orders`] - Order pricing with the coupon discount
//! - [`models`] - Source identifiers and membership sets
//! - [`metrics`] - Prometheus counters for loads and validations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use couponbase::config::Config;
//! use couponbase::ingest::{CouponLoader, Shutdown};
//! use couponbase::registry::CouponRegistry;
//! use couponbase::validator::{CouponRule, CouponValidator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let registry = Arc::new(CouponRegistry::with_shards(config.ingest.shards));
//!
//!     CouponLoader::new(&config.ingest)
//!         .load_all(&registry, &config.sources, Shutdown::never())
//!         .await?;
//!
//!     let validator = CouponValidator::new(registry, CouponRule::from(&config.validator))?;
//!     println!("{}", validator.is_valid_coupon("ABCD1234"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod orders;
pub mod registry;
pub mod validator;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{CouponErrorTrait, Error, ErrorCategory, Result};
    pub use crate::ingest::{CouponLoader, LoadReport, Shutdown, ShutdownTrigger};
    pub use crate::models::{SourceId, SourceSet};
    pub use crate::orders::{DiscountPolicy, LineItem, OrderPricer, OrderQuote};
    pub use crate::registry::{CouponRegistry, RegistryState};
    pub use crate::validator::{CouponRule, CouponValidator, CouponVerdict};
}

// Direct re-exports for convenience
pub use models::{SourceId, SourceSet};
pub use registry::CouponRegistry;
pub use validator::CouponValidator;
