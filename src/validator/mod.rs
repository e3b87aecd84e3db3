//! Coupon validation
//!
//! Decides discount eligibility from the frozen registry: a code is valid when
//! its length lies within the configured bounds and it appears in exactly two
//! sources. Codes found in all three sources are not valid.
//!
//! A validator can only be built over a READY registry.

use std::sync::Arc;

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::registry::CouponRegistry;

/// Number of sources a valid code appears in
pub const REQUIRED_SOURCES: u8 = 2;

/// Length bounds of a valid code, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponRule {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for CouponRule {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 10,
        }
    }
}

impl From<&ValidatorConfig> for CouponRule {
    fn from(config: &ValidatorConfig) -> Self {
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
        }
    }
}

/// Why a code was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponVerdict {
    Valid,

    /// Length (in characters) outside the accepted range; registry not consulted
    BadLength(usize),

    /// Found in this many sources, which is not the required count
    SourceCount(u8),
}

impl CouponVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::BadLength(_) => "bad_length",
            Self::SourceCount(_) => "source_count",
        }
    }
}

/// Answers discount-eligibility queries
#[derive(Debug, Clone)]
pub struct CouponValidator {
    registry: Arc<CouponRegistry>,
    rule: CouponRule,
}

impl CouponValidator {
    /// Build a validator; fails unless every source has been loaded
    pub fn new(registry: Arc<CouponRegistry>, rule: CouponRule) -> Result<Self> {
        if !registry.is_ready() {
            return Err(Error::RegistryNotReady {
                loaded: registry.loaded_sources(),
            });
        }
        Ok(Self { registry, rule })
    }

    pub fn rule(&self) -> &CouponRule {
        &self.rule
    }

    pub fn registry(&self) -> &Arc<CouponRegistry> {
        &self.registry
    }

    /// Classify `code`
    pub fn check(&self, code: &str) -> CouponVerdict {
        let length = code.chars().count();
        let verdict = if length < self.rule.min_length || length > self.rule.max_length {
            CouponVerdict::BadLength(length)
        } else {
            match self.registry.source_count_of(code) {
                REQUIRED_SOURCES => CouponVerdict::Valid,
                n => CouponVerdict::SourceCount(n),
            }
        };

        crate::metrics::record_validation(verdict.as_str());
        tracing::debug!(code, verdict = ?verdict, "Coupon checked");
        verdict
    }

    /// Whether `code` earns the discount
    pub fn is_valid_coupon(&self, code: &str) -> bool {
        self.check(code).is_valid()
    }
}
