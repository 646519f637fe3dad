//! The wave front over an event area.
//!
//! Model
//! - The wave leaves one edge of the area bbox (west for `East`, east for `West`)
//!   at `start` and covers `elapsed * speed` metres along every parallel.
//! - At latitude `lat` the front sits at
//!   `edge ± traveled / calculate_distance(west, east, lat) * width`, clamped to
//!   the bbox. Parallels are shorter away from the equator, so the front bends;
//!   `wave_front_line` samples it into a `CutLine`.
//! - The wave is done when the front reaches the far edge at the widest parallel
//!   (`latitude_of_widest_part`), which is the last one to be fully covered.
//!
//! Snapshots
//! - `Recompose`: split every area ring at the current front.
//! - `Add`: split only the previous snapshot's remaining fragments and append the
//!   newly traversed ones. Used while the area geometry is unchanged and time only
//!   moved forward.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::cache::{GeometryKey, WaveStateCache};
use super::provider::{AreaProvider, Clock, ObserverPositionSource};
use crate::consts::{DEFAULT_FRONT_SAMPLES, DEFAULT_SPEED_MPS, EPSILON, MIN_WAVE_DURATION};
use crate::error::{GeoError, GeoResult};
use crate::geo::util::calculate_distance;
use crate::geo::{BoundingBox, CutId, CutLine, Polygon, PolygonSplitter, Position, Side};

/// Direction of travel; the wave starts on the opposite edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveDirection {
    #[default]
    East,
    West,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveConfig {
    /// Ground speed in metres per second.
    pub speed_mps: f64,
    pub direction: WaveDirection,
    /// Latitudes sampled for the bent front (at least 2).
    pub front_samples: usize,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            speed_mps: DEFAULT_SPEED_MPS,
            direction: WaveDirection::East,
            front_samples: DEFAULT_FRONT_SAMPLES,
        }
    }
}

impl WaveConfig {
    pub fn validate(&self) -> GeoResult<()> {
        if !(self.speed_mps.is_finite() && self.speed_mps > 0.0) {
            return Err(GeoError::InvalidSpeed {
                speed: self.speed_mps,
            });
        }
        if self.front_samples < 2 {
            return Err(GeoError::InvalidSampling {
                samples: self.front_samples,
            });
        }
        Ok(())
    }
}

/// How a snapshot was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    Add,
    Recompose,
}

/// Traversed and remaining fragments of the area at one instant.
#[derive(Clone, Debug)]
pub struct WavePolygons {
    pub timestamp: Instant,
    pub elapsed: Duration,
    pub traversed_polygons: Vec<Polygon>,
    pub remaining_polygons: Vec<Polygon>,
    /// Cut that produced the current leading edge.
    pub cut_id: Option<CutId>,
    pub mode: MergeMode,
}

pub struct WaveFrontCalculator<A, C> {
    area: A,
    clock: C,
    start: Instant,
    config: WaveConfig,
    observer: Option<Box<dyn ObserverPositionSource>>,
    splitter: PolygonSplitter,
    cache: WaveStateCache,
}

impl<A: AreaProvider, C: Clock> WaveFrontCalculator<A, C> {
    pub fn new(area: A, clock: C, start: Instant, config: WaveConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self {
            area,
            clock,
            start,
            config,
            observer: None,
            splitter: PolygonSplitter::new(),
            cache: WaveStateCache::new(),
        })
    }

    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: ObserverPositionSource + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    #[inline]
    pub fn area(&self) -> &A {
        &self.area
    }

    #[inline]
    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    #[inline]
    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn cache(&self) -> &WaveStateCache {
        &self.cache
    }

    /// Time since start; zero before the start.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    pub fn has_started(&self) -> bool {
        self.clock.now() > self.start
    }

    pub fn traveled_meters(&self) -> f64 {
        self.elapsed().as_secs_f64() * self.config.speed_mps
    }

    /// East-west extent of the area along its widest parallel.
    pub fn max_east_west_distance(&self) -> f64 {
        let b = self.area.bbox();
        calculate_distance(
            b.min_longitude(),
            b.max_longitude(),
            b.latitude_of_widest_part(),
        )
    }

    /// Time for the front to cross the whole area (never below `MIN_WAVE_DURATION`).
    pub fn wave_duration(&self) -> Duration {
        let key = self.key();
        if let Some(d) = self.cache.duration(key) {
            return d;
        }
        let secs = self.max_east_west_distance() / self.config.speed_mps;
        let d = Duration::try_from_secs_f64(secs)
            .unwrap_or(Duration::MAX)
            .max(MIN_WAVE_DURATION);
        self.cache.set_duration(key, d);
        d
    }

    /// Percentage of the wave duration elapsed, in [0, 100].
    pub fn progression(&self) -> f64 {
        if !self.has_started() {
            return 0.0;
        }
        let ratio = self.elapsed().as_secs_f64() / self.wave_duration().as_secs_f64();
        (ratio * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_running(&self) -> bool {
        self.has_started() && !self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.progression() >= 100.0
    }

    /// Front longitude on the widest parallel of the bbox.
    pub fn current_wave_longitude(&self) -> f64 {
        self.closest_wave_longitude(self.area.bbox().latitude_of_widest_part())
    }

    /// Longitude of the front at `lat`.
    pub fn closest_wave_longitude(&self, lat: f64) -> f64 {
        self.front_longitude(&self.area.bbox(), lat, self.traveled_meters())
    }

    fn front_longitude(&self, b: &BoundingBox, lat: f64, traveled: f64) -> f64 {
        let (west, east) = (b.min_longitude(), b.max_longitude());
        let width = east - west;
        let span = calculate_distance(west, east, lat);
        let fraction = if span > 0.0 {
            (traveled / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self.config.direction {
            WaveDirection::East => (west + fraction * width).clamp(west, east),
            WaveDirection::West => (east - fraction * width).clamp(west, east),
        }
    }

    /// The front sampled over the bbox latitudes (and the equator when crossed).
    pub fn wave_front_line(&self) -> GeoResult<CutLine> {
        self.front_line_at(self.traveled_meters())
    }

    fn front_line_at(&self, traveled: f64) -> GeoResult<CutLine> {
        let b = self.area.bbox();
        let n = self.config.front_samples;
        let (south, north) = (b.min_latitude(), b.max_latitude());
        let mut lats: Vec<f64> = (0..n)
            .map(|i| south + (north - south) * (i as f64) / ((n - 1) as f64))
            .collect();
        if south < 0.0 && north > 0.0 {
            lats.push(0.0);
        }
        lats.sort_by(f64::total_cmp);
        lats.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
        CutLine::from_positions(
            lats.into_iter()
                .map(|lat| Position::new(lat, self.front_longitude(&b, lat, traveled))),
        )
    }

    fn traversed_side(&self, side: Option<Side>) -> bool {
        match (self.config.direction, side) {
            (WaveDirection::East, Some(Side::Left(_))) => true,
            (WaveDirection::West, Some(Side::Right(_))) => true,
            _ => false,
        }
    }

    fn key(&self) -> GeometryKey {
        self.cache.key(self.area.geometry_version())
    }

    /// Traversed and remaining fragments now; `None` before the start or while
    /// the area has no rings.
    pub fn wave_polygons(&self) -> Option<Arc<WavePolygons>> {
        let now = self.clock.now();
        if now <= self.start {
            return None;
        }
        let elapsed = now.duration_since(self.start);
        let key = self.key();
        let previous = self.cache.snapshot(key);
        if let Some(prev) = &previous {
            if prev.timestamp == now {
                return previous;
            }
        }

        let traveled = elapsed.as_secs_f64() * self.config.speed_mps;
        let line = match self.front_line_at(traveled) {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "wave front line rejected");
                return None;
            }
        };
        let cut_id = self.splitter.next_cut_id();

        let (mode, mut traversed, sources) = match previous {
            Some(prev) if prev.elapsed <= elapsed => (
                MergeMode::Add,
                prev.traversed_polygons.clone(),
                prev.remaining_polygons.clone(),
            ),
            _ => {
                let polygons = self.area.polygons();
                if polygons.is_empty() {
                    return None;
                }
                (MergeMode::Recompose, Vec::new(), polygons)
            }
        };

        let mut remaining = Vec::new();
        for poly in &sources {
            let split = self.splitter.split_with_cut(poly, &line, cut_id);
            for fragment in split.left.into_iter().chain(split.right) {
                if self.traversed_side(fragment.side()) {
                    traversed.push(fragment);
                } else {
                    remaining.push(fragment);
                }
            }
        }
        debug!(
            ?mode,
            ?cut_id,
            traversed = traversed.len(),
            remaining = remaining.len(),
            "wave snapshot"
        );
        let snapshot = Arc::new(WavePolygons {
            timestamp: now,
            elapsed,
            traversed_polygons: traversed,
            remaining_polygons: remaining,
            cut_id: Some(cut_id),
            mode,
        });
        self.cache.set_snapshot(key, Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Area membership, memoized while the observer stays put.
    fn observer_within_area(&self, observer: &Position) -> bool {
        if let Some(within) = self.cache.observer_within(observer) {
            return within;
        }
        let within = self.area.is_position_within(observer);
        self.cache.set_observer_within(observer, within);
        within
    }

    /// The front has passed `observer`, who is inside the area.
    pub fn has_been_hit(&self, observer: &Position) -> bool {
        if !self.has_started() || !self.observer_within_area(observer) {
            return false;
        }
        let front = self.closest_wave_longitude(observer.lat);
        match self.config.direction {
            WaveDirection::East => observer.lng <= front + EPSILON,
            WaveDirection::West => observer.lng >= front - EPSILON,
        }
    }

    pub fn has_user_been_hit_in_current_position(&self) -> bool {
        self.observer_position()
            .is_some_and(|p| self.has_been_hit(&p))
    }

    /// When the front reaches `observer`'s longitude on its parallel.
    pub fn hit_instant(&self, observer: &Position) -> Option<Instant> {
        let key = self.key();
        if let Some(t) = self.cache.hit_instant(key, observer) {
            return Some(t);
        }
        let b = self.area.bbox();
        let (west, east) = (b.min_longitude(), b.max_longitude());
        let width = east - west;
        let offset = match self.config.direction {
            WaveDirection::East => observer.lng - west,
            WaveDirection::West => east - observer.lng,
        };
        let fraction = if width > 0.0 {
            (offset / width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let meters = fraction * calculate_distance(west, east, observer.lat);
        let at = self
            .start
            .checked_add(Duration::try_from_secs_f64(meters / self.config.speed_mps).ok()?)?;
        self.cache.set_hit_instant(key, *observer, at);
        Some(at)
    }

    /// Time left until the front reaches `observer`; zero once passed.
    pub fn time_before_hit(&self, observer: &Position) -> Option<Duration> {
        let at = self.hit_instant(observer)?;
        Some(at.saturating_duration_since(self.clock.now()))
    }

    /// `None` without an observer fix.
    pub fn time_before_user_hit(&self) -> Option<Duration> {
        self.time_before_hit(&self.observer_position()?)
    }

    pub fn observer_position(&self) -> Option<Position> {
        self.observer.as_ref()?.position()
    }

    /// Point on the current front used for camera targeting; before any snapshot,
    /// the bbox center latitude at the current wave longitude.
    pub fn wave_front_center_position(&self) -> Position {
        match self.leading_edge_latitude() {
            Some(lat) => Position::new(lat, self.closest_wave_longitude(lat)),
            None => Position::new(self.area.bbox().center().lat, self.current_wave_longitude()),
        }
    }

    fn leading_edge_latitude(&self) -> Option<f64> {
        let snapshot = self.wave_polygons()?;
        let cut_id = snapshot.cut_id?;
        let lats: Vec<f64> = snapshot
            .traversed_polygons
            .iter()
            .flat_map(Polygon::cut_positions)
            .filter(|p| p.cut_id() == Some(cut_id))
            .map(|p| p.lat)
            .collect();
        if lats.is_empty() {
            return None;
        }
        let (min, max) = lats
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &l| (lo.min(l), hi.max(l)));
        if let Some(obs) = self.observer_position() {
            if obs.lat >= min && obs.lat <= max && self.observer_within_area(&obs) {
                return Some(obs.lat);
            }
        }
        Some(lats.iter().sum::<f64>() / lats.len() as f64)
    }

    /// Drop every geometry-derived value (area data changed out of band).
    pub fn invalidate_geometry(&self) {
        self.cache.invalidate_geometry();
    }

    pub fn clear_duration_cache(&self) {
        self.cache.clear_duration_cache();
    }
}
