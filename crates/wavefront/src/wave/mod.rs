//! Wave engine: front position over time, traversed/remaining snapshots, hit queries.
//!
//! Collaborators (clock, area data, observer position) are traits so the engine
//! runs on simulated time in tests and the CLI.

pub mod cache;
pub mod calculator;
pub mod provider;

pub use cache::{GeometryKey, WaveStateCache};
pub use calculator::{MergeMode, WaveConfig, WaveDirection, WaveFrontCalculator, WavePolygons};
pub use provider::{
    bbox_ring, AreaProvider, Clock, ManualClock, ObserverPositionSource, StaticArea, SystemClock,
};

#[cfg(test)]
mod tests;
