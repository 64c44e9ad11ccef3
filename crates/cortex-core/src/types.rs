//! Common types for the cortex engine
//!
//! Hemisphere identifiers, entity generations and the neutral activation value
//! shared by every view.

use serde::{Deserialize, Serialize};

/// Number of cortical hemispheres
pub const NUM_HEMISPHERES: usize = 2;

/// Activation value rendered when a hemisphere has no data at the queried time
pub const NEUTRAL_ACTIVATION: f32 = 0.0;

/// Cortical hemisphere identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum Hemisphere {
    Left = 0,
    Right = 1,
}

impl Hemisphere {
    /// Both hemispheres in index order
    pub const ALL: [Hemisphere; NUM_HEMISPHERES] = [Hemisphere::Left, Hemisphere::Right];

    /// Convert from index (0-1) to Hemisphere
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Hemisphere::Left),
            1 => Some(Hemisphere::Right),
            _ => None,
        }
    }

    /// Array index of this hemisphere
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Hemisphere::Left => "LH",
            Hemisphere::Right => "RH",
        }
    }
}

impl std::fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which kind of entity a load or report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Surface(Hemisphere),
    Atlas(Hemisphere),
    Estimate(Hemisphere),
    Recording,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Surface(h) => write!(f, "{} surface", h),
            EntityKind::Atlas(h) => write!(f, "{} atlas", h),
            EntityKind::Estimate(h) => write!(f, "{} source estimate", h),
            EntityKind::Recording => f.write_str("raw recording"),
        }
    }
}

/// Replacement counter for an entity slot
///
/// Every load or unload of an entity bumps its slot's generation. Work that was
/// started against an older generation (slice computation, GPU uploads,
/// background loads) is discarded instead of applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Generation of a slot that has never been filled
    pub const INITIAL: Generation = Generation(0);

    /// The generation that follows this one
    #[inline]
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    /// Raw counter value
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// An RGBA colour with components in 0.0-1.0
pub type Rgba = [f32; 4];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_index_roundtrip() {
        for h in Hemisphere::ALL {
            assert_eq!(Hemisphere::from_index(h.index()), Some(h));
        }
        assert_eq!(Hemisphere::from_index(2), None);
    }

    #[test]
    fn test_generation_advances() {
        let g = Generation::INITIAL;
        assert_eq!(g.next().value(), 1);
        assert!(g.next() > g);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::Estimate(Hemisphere::Right).to_string(), "RH source estimate");
        assert_eq!(EntityKind::Recording.to_string(), "raw recording");
    }
}
