//! Engine error types
//!
//! All fallibility is pushed to load time. Per-frame resolution, slicing and
//! rendering never fail; they fall back to "no data" instead. Queries outside
//! the canonical time domain are clamped and never produce an error.

use thiserror::Error;

use crate::types::{EntityKind, Hemisphere};

/// A loader collaborator failed to produce an entity
///
/// Recoverable: the affected view shows an empty or neutral state.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to load {entity}: {reason}")]
pub struct LoadError {
    pub entity: EntityKind,
    pub reason: String,
}

impl LoadError {
    pub fn new(entity: EntityKind, reason: impl Into<String>) -> Self {
        Self {
            entity,
            reason: reason.into(),
        }
    }
}

/// Loaded entities are internally or mutually inconsistent
///
/// Recoverable: the affected rendering path is disabled until corrected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataIntegrityError {
    /// Source estimate vertex dimension differs from the hemisphere's mesh
    #[error("{hemisphere} source estimate has {estimate} vertices but the surface has {mesh}")]
    VertexCountMismatch {
        hemisphere: Hemisphere,
        mesh: usize,
        estimate: usize,
    },

    /// A face references a vertex that does not exist
    #[error("Face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Normals must be supplied per vertex
    #[error("Mesh has {vertices} vertices but {normals} normals")]
    NormalCountMismatch { vertices: usize, normals: usize },

    /// Timestamps must be strictly increasing
    #[error("Timestamps are not strictly increasing at index {index}")]
    TimestampsNotIncreasing { index: usize },

    /// Timestamps must be finite
    #[error("Timestamp at index {index} is not finite")]
    NonFiniteTimestamp { index: usize },

    /// Source estimate without samples
    #[error("Source estimate has no time samples")]
    EmptyEstimate,

    /// Matrix storage does not match its declared dimensions
    #[error("Matrix has {actual} values, expected {rows} x {cols}")]
    MatrixShapeMismatch {
        rows: usize,
        cols: usize,
        actual: usize,
    },

    /// Atlas labels must cover every vertex exactly once
    #[error("Atlas labels {labels} vertices but the surface has {vertices}")]
    AtlasLengthMismatch { labels: usize, vertices: usize },

    /// Every referenced region needs a display colour
    #[error("Atlas region {region} has no colour entry")]
    MissingRegionColor { region: u32 },

    /// Raw recordings need a positive, finite sample rate
    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(f64),

    /// Channel descriptors and sample rows must agree
    #[error("Recording has {descriptors} channel descriptors but {rows} sample rows")]
    ChannelCountMismatch { descriptors: usize, rows: usize },
}

/// A GPU buffer for a hemisphere could not be allocated
///
/// The session continues without that hemisphere's rendering.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{hemisphere} needs a {requested} byte buffer, device limit is {limit} bytes")]
pub struct ResourceExhaustionError {
    pub hemisphere: Hemisphere,
    pub requested: u64,
    pub limit: u64,
}

/// Umbrella error for engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    #[error(transparent)]
    ResourceExhaustion(#[from] ResourceExhaustionError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_both_counts() {
        let err = DataIntegrityError::VertexCountMismatch {
            hemisphere: Hemisphere::Right,
            mesh: 4000,
            estimate: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("RH"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("4000"));
    }

    #[test]
    fn test_engine_error_from_load_error() {
        let err: EngineError = LoadError::new(EntityKind::Recording, "truncated file").into();
        assert!(matches!(err, EngineError::Load(_)));
        assert_eq!(err.to_string(), "Failed to load raw recording: truncated file");
    }
}
