//! Wave-front simulation over geographic areas.
//!
//! A wave starts on one edge of an area (west or east) and advances at a fixed
//! ground speed. Because a degree of longitude shrinks with `cos(latitude)`, the
//! front is not a meridian but a bent arc; the engine samples it as a [`CutLine`]
//! and splits the area rings along it into traversed and remaining fragments.
//!
//! Layout
//! - [`geo`]: positions, bounding boxes, arena-backed rings, cut lines, splitting.
//! - [`wave`]: the calculator, its cache, and the collaborator traits it consumes
//!   (clock, area data, observer position).
//! - [`geojson`]: FeatureCollection export/import for map layers.
//! - [`sample`]: seeded star-shaped areas for benches, property tests and the CLI.
//!
//! Every computation is synchronous; time and area data are injected.

pub mod consts;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod sample;
pub mod wave;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{GeoError, GeoResult};
pub use geo::{
    BoundingBox, CutId, CutLine, CutMark, LineDirection, LineSide, Polygon, PolygonSplitter,
    Position, PositionId, Side, SplitResult,
};
pub use wave::{
    AreaProvider, Clock, ManualClock, MergeMode, ObserverPositionSource, StaticArea, SystemClock,
    WaveConfig, WaveDirection, WaveFrontCalculator, WavePolygons, WaveStateCache,
};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::geo::util::{
        calculate_distance, meters_per_degree_longitude, normalize_longitude,
        normalized_longitude_difference,
    };
    pub use crate::geo::{
        BoundingBox, CutLine, LineSide, Polygon, PolygonSplitter, Position, Side, SplitResult,
    };
    pub use crate::wave::{
        AreaProvider, Clock, ManualClock, StaticArea, WaveConfig, WaveDirection,
        WaveFrontCalculator, WavePolygons,
    };
    pub use crate::{GeoError, GeoResult};
}
