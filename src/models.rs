// Core data structures for coupon ingestion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one of the three coupon sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SourceId {
    One = 1,
    Two = 2,
    Three = 3,
}

impl SourceId {
    /// All sources in load order
    pub const ALL: [SourceId; 3] = [SourceId::One, SourceId::Two, SourceId::Three];

    /// Numeric identifier (1, 2 or 3)
    pub fn get(self) -> u8 {
        self as u8
    }

    /// Bit used for this source inside a [`SourceSet`]
    fn bit(self) -> u8 {
        1 << (self as u8 - 1)
    }

    /// Label used for metrics and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
        }
    }
}

impl TryFrom<u8> for SourceId {
    type Error = InvalidSourceId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(InvalidSourceId(other)),
        }
    }
}

impl From<SourceId> for u8 {
    fn from(id: SourceId) -> Self {
        id.get()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source identifier outside of 1..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid source id {0}, expected 1, 2 or 3")]
pub struct InvalidSourceId(pub u8);

/// Set of sources a code was observed in (the code's membership)
///
/// Stored as a three-bit mask, so a source can never appear twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceSet(u8);

impl SourceSet {
    /// Every source
    pub const FULL: SourceSet = SourceSet(0b111);

    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set holding a single source
    pub fn single(source: SourceId) -> Self {
        Self(source.bit())
    }

    /// Add a source; returns `true` if it was not present yet
    pub fn insert(&mut self, source: SourceId) -> bool {
        let before = self.0;
        self.0 |= source.bit();
        before != self.0
    }

    pub fn contains(&self, source: SourceId) -> bool {
        self.0 & source.bit() != 0
    }

    /// Number of distinct sources (0..=3)
    pub fn len(&self) -> u8 {
        self.0.count_ones() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_full(&self) -> bool {
        self.0 == Self::FULL.0
    }

    /// Iterate over the contained sources in ascending order
    pub fn iter(&self) -> impl Iterator<Item = SourceId> + '_ {
        SourceId::ALL.into_iter().filter(|s| self.contains(*s))
    }

    pub(crate) fn bits(&self) -> u8 {
        self.0
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        Self(bits & Self::FULL.0)
    }
}

impl FromIterator<SourceId> for SourceSet {
    fn from_iter<I: IntoIterator<Item = SourceId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for source in iter {
            set.insert(source);
        }
        set
    }
}

impl fmt::Display for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, source) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{source}")?;
        }
        f.write_str("}")
    }
}
