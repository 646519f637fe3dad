//! Tolerances and physical constants.
//!
//! Policy
//! - Fixed constants; callers that need different sampling pass a `WaveConfig`.
//! - Longitudes and latitudes are in degrees, distances in metres.

use std::time::Duration;

/// Equality tolerance for longitude/latitude comparisons (degrees).
pub const EPSILON: f64 = 1e-9;

/// WGS84 equatorial radius in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitudes sampled when building the bent wave front.
pub const DEFAULT_FRONT_SAMPLES: usize = 32;

/// Default ground speed of a wave (m/s).
pub const DEFAULT_SPEED_MPS: f64 = 50.0;

/// Observer movement (degrees, per axis) below which cached area membership is reused.
pub const OBSERVER_MOVE_EPSILON: f64 = 1e-6;

/// Floor for the wave duration so degenerate areas still progress.
pub const MIN_WAVE_DURATION: Duration = Duration::from_secs(1);
