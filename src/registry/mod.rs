//! Coupon registry
//!
//! Concurrency-safe mapping from a coupon code to the set of sources that
//! contained it. Writers are linearized per shard: the code is hashed to one
//! of K independently locked maps, so at most one upsert runs against a given
//! shard at any instant. With a single shard this degenerates to one global
//! lock.
//!
//! The registry moves through LOADING(1) → LOADING(2) → LOADING(3) → READY as
//! load phases complete; queries for discount decisions are only meaningful
//! once it is READY.

use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::models::{SourceId, SourceSet};

/// Default number of shards
pub const DEFAULT_SHARDS: usize = 16;

// ============================================================================
// Registry State
// ============================================================================

/// Lifecycle state of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Loads still outstanding; holds the sources finished so far
    Loading { completed: SourceSet },

    /// All three sources loaded; registry is frozen
    Ready,
}

impl RegistryState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Next source expected to load, when loading in order
    pub fn next_source(&self) -> Option<SourceId> {
        match self {
            Self::Loading { completed } => SourceId::ALL.into_iter().find(|s| !completed.contains(*s)),
            Self::Ready => None,
        }
    }
}

// ============================================================================
// Coupon Registry
// ============================================================================

type Shard = Mutex<HashMap<String, SourceSet>>;

/// Sharded code → membership map
pub struct CouponRegistry {
    shards: Box<[Shard]>,
    hasher: RandomState,
    loaded: AtomicU8,
}

impl CouponRegistry {
    /// Create a registry with the default shard count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a registry with `shards` independently locked partitions
    ///
    /// A shard count of zero is treated as one.
    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            loaded: AtomicU8::new(0),
        }
    }

    fn shard(&self, code: &str) -> &Shard {
        let index = self.hasher.hash_one(code) as usize % self.shards.len();
        &self.shards[index]
    }

    /// Record that `code` was observed in `source`
    ///
    /// Creates the entry when the code is unseen; otherwise adds the source to
    /// its membership if not already present.
    pub fn upsert(&self, code: &str, source: SourceId) {
        let mut shard = self.shard(code).lock();
        match shard.get_mut(code) {
            Some(membership) => {
                membership.insert(source);
            }
            None => {
                shard.insert(code.to_owned(), SourceSet::single(source));
            }
        }
    }

    /// Number of sources `code` was observed in (0 if never seen)
    pub fn source_count_of(&self, code: &str) -> u8 {
        self.membership_of(code).map_or(0, |m| m.len())
    }

    /// Membership of `code`, if observed
    pub fn membership_of(&self, code: &str) -> Option<SourceSet> {
        self.shard(code).lock().get(code).copied()
    }

    /// Number of distinct codes
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.lock().is_empty())
    }

    /// Number of distinct codes observed in `source`
    pub fn codes_in(&self, source: SourceId) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().values().filter(|m| m.contains(source)).count())
            .sum()
    }

    /// Code counts indexed by membership size (`[_, in_one, in_two, in_three]`)
    pub fn count_histogram(&self) -> [usize; 4] {
        let mut histogram = [0usize; 4];
        for shard in self.shards.iter() {
            for membership in shard.lock().values() {
                histogram[membership.len() as usize] += 1;
            }
        }
        histogram
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Mark a source's load phase as complete
    pub fn mark_loaded(&self, source: SourceId) {
        let previous = self.loaded.fetch_or(SourceSet::single(source).bits(), Ordering::AcqRel);
        let now = SourceSet::from_bits(previous | SourceSet::single(source).bits());
        tracing::debug!(source = %source, loaded = %now, "Source marked as loaded");
        if now.is_full() && !SourceSet::from_bits(previous).is_full() {
            tracing::info!(codes = self.len(), "Coupon registry ready");
        }
    }

    /// Sources whose load phase has completed
    pub fn loaded_sources(&self) -> SourceSet {
        SourceSet::from_bits(self.loaded.load(Ordering::Acquire))
    }

    pub fn state(&self) -> RegistryState {
        let completed = self.loaded_sources();
        if completed.is_full() {
            RegistryState::Ready
        } else {
            RegistryState::Loading { completed }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }
}

impl Default for CouponRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CouponRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponRegistry")
            .field("shards", &self.shards.len())
            .field("codes", &self.len())
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
