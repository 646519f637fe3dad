//! Errors surfaced by geometry and the wave engine.
//!
//! Only caller misuse and invalid geometry are errors. Transient states (wave
//! not started, no observer fix, area data still loading) are `Option`s.

use crate::geo::PositionId;

/// All the failures the engine reports.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// A ring operation referenced an id that is not in the ring.
    #[error("position {id} not found in ring")]
    PositionNotFound { id: PositionId },
    /// Bounding box requested for a polygon without positions.
    #[error("bounding box of an empty polygon")]
    EmptyPolygon,
    /// Bounding box or classification requested for a cut line without positions.
    #[error("cut line has no positions")]
    EmptyCutLine,
    /// Identity read from a position that was never inserted into a container.
    #[error("position identity read before insertion")]
    UnassignedId,
    /// The cut line would cross itself.
    #[error("invalid cut arc: longitude deltas change sign {sign_changes} times")]
    InvalidArc { sign_changes: usize },
    /// Wave speed must be strictly positive and finite.
    #[error("wave speed must be positive and finite, got {speed}")]
    InvalidSpeed { speed: f64 },
    /// Wave front sampling needs at least two latitudes.
    #[error("front sampling needs at least 2 latitudes, got {samples}")]
    InvalidSampling { samples: usize },
    /// Area data without any usable ring.
    #[error("area has no polygon with at least 3 positions")]
    NoArea,
    #[error("geojson: {0}")]
    Geojson(#[from] serde_json::Error),
}

pub type GeoResult<T> = Result<T, GeoError>;
