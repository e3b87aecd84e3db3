pub mod check;
pub mod load;
pub mod quote;

use anyhow::{Context, Result};
use std::sync::Arc;

use couponbase::config::Config;
use couponbase::ingest::{shutdown, CouponLoader, LoadReport};
use couponbase::registry::CouponRegistry;
use couponbase::validator::{CouponRule, CouponValidator};

/// Load every source; Ctrl-C aborts the load
pub async fn load_registry(config: &Config) -> Result<(Arc<CouponRegistry>, LoadReport)> {
    let registry = Arc::new(CouponRegistry::with_shards(config.ingest.shards));
    let (trigger, shutdown) = shutdown::channel();

    let ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Shutdown signal received, aborting coupon load");
                trigger.trigger();
            }
            Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
        }
    });

    let result = CouponLoader::new(&config.ingest)
        .load_all(&registry, &config.sources, shutdown)
        .await;
    ctrl_c.abort();

    let report = result.context("Failed to load coupon sources")?;
    Ok((registry, report))
}

/// Load every source and build a validator over the READY registry
pub async fn load_validator(config: &Config) -> Result<(CouponValidator, LoadReport)> {
    let (registry, report) = load_registry(config).await?;
    let validator = CouponValidator::new(registry, CouponRule::from(&config.validator))?;
    Ok((validator, report))
}
