//! Planar-on-sphere geometry for wave fronts (latitude/longitude degrees).
//!
//! Purpose
//! - `Position`: coordinate plus ring identity and optional cut metadata.
//! - `BoundingBox`: min/max envelope (no date-line wraparound).
//! - `Polygon`: arena-backed doubly linked ring with incremental signed area.
//! - `CutLine`: south→north arc used as the splitting longitude.
//! - `PolygonSplitter`: splits rings along a cut line into tagged fragments.
//!
//! Conventions
//! - Planar computations use `x = longitude`, `y = latitude` (see `Position::xy`).
//! - Longitude comparisons go through `util::normalized_longitude_difference`.

pub mod bbox;
pub mod cutline;
pub mod polygon;
pub mod position;
pub mod split;
pub mod util;

pub use bbox::BoundingBox;
pub use cutline::{CutLine, LineDirection, LineSide};
pub use polygon::{Cyclic, Iter, Polygon, Side};
pub use position::{CutId, CutMark, Position, PositionId};
pub use split::{split_by_longitude, PolygonSplitter, SplitResult};
