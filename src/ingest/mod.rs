//! Coupon source ingestion
//!
//! Streams each coupon source through a bounded channel into a pool of
//! membership workers that update the shared [`CouponRegistry`].
//!
//! [`CouponRegistry`]: crate::registry::CouponRegistry

pub mod error;
pub mod loader;
pub mod pipeline;
pub mod reader;
pub mod shutdown;

pub use error::{IngestError, IngestResult};
pub use loader::{CouponLoader, LoadReport};
pub use pipeline::{LoadPipeline, PipelineBuilder, PipelineConfig, SourceLoadStats};
pub use reader::SourceReader;
pub use shutdown::{Shutdown, ShutdownTrigger};
