//! Common test utilities

use std::sync::Arc;

use couponbase::models::SourceId;
use couponbase::registry::CouponRegistry;

/// Build a READY registry from `(code, sources)` pairs
pub fn ready_registry_from(entries: &[(&str, &[SourceId])]) -> Arc<CouponRegistry> {
    let registry = Arc::new(CouponRegistry::new());
    for (code, sources) in entries {
        for source in *sources {
            registry.upsert(code, *source);
        }
    }
    for source in SourceId::ALL {
        registry.mark_loaded(source);
    }
    registry
}

/// Map a bitmask 0..8 onto the sources it selects
#[allow(dead_code)]
pub fn sources_from_mask(mask: u8) -> Vec<SourceId> {
    SourceId::ALL
        .into_iter()
        .filter(|s| mask & (1 << (s.get() - 1)) != 0)
        .collect()
}
