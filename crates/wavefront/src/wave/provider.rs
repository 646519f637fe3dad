//! Collaborators injected into the wave engine: time, area data, observer position.

use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{GeoError, GeoResult};
use crate::geo::{BoundingBox, Polygon, Position};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Simulated time, moved explicitly by the caller.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(now: Instant) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: Instant) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Geometry of the event area.
///
/// `geometry_version` must change whenever `polygons()` would return different
/// rings; the calculator recomposes its snapshot when it does.
pub trait AreaProvider: Send + Sync {
    fn bbox(&self) -> BoundingBox;

    /// Area rings; empty while data is unavailable.
    fn polygons(&self) -> Vec<Polygon>;

    fn is_position_within(&self, p: &Position) -> bool {
        self.polygons().iter().any(|poly| poly.contains_position(p))
    }

    fn geometry_version(&self) -> u64 {
        0
    }
}

impl<A: AreaProvider + ?Sized> AreaProvider for std::sync::Arc<A> {
    fn bbox(&self) -> BoundingBox {
        (**self).bbox()
    }

    fn polygons(&self) -> Vec<Polygon> {
        (**self).polygons()
    }

    fn is_position_within(&self, p: &Position) -> bool {
        (**self).is_position_within(p)
    }

    fn geometry_version(&self) -> u64 {
        (**self).geometry_version()
    }
}

/// Where the observer currently is, if known.
pub trait ObserverPositionSource: Send + Sync {
    fn position(&self) -> Option<Position>;
}

impl<F> ObserverPositionSource for F
where
    F: Fn() -> Option<Position> + Send + Sync,
{
    fn position(&self) -> Option<Position> {
        self()
    }
}

#[derive(Debug)]
struct AreaState {
    bbox: BoundingBox,
    polygons: Vec<Polygon>,
    version: u64,
}

/// In-memory area: starts as a bbox placeholder or with exact rings, and can be
/// upgraded later (each upgrade bumps the geometry version).
#[derive(Debug)]
pub struct StaticArea {
    state: RwLock<AreaState>,
}

impl StaticArea {
    /// Area with the given rings (possibly none yet).
    pub fn new(bbox: BoundingBox, polygons: Vec<Polygon>) -> Self {
        Self {
            state: RwLock::new(AreaState {
                bbox,
                polygons,
                version: 0,
            }),
        }
    }

    /// The bbox rectangle stands in for the area until exact rings arrive.
    pub fn placeholder(bbox: BoundingBox) -> Self {
        Self::new(bbox, vec![bbox_ring(&bbox)])
    }

    /// Area whose bbox is the envelope of `polygons`.
    pub fn from_polygons(polygons: Vec<Polygon>) -> GeoResult<Self> {
        let polygons: Vec<Polygon> = polygons.into_iter().filter(|p| p.len() >= 3).collect();
        let bbox = polygons
            .iter()
            .map(Polygon::bbox)
            .collect::<GeoResult<Vec<_>>>()?
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .ok_or(GeoError::NoArea)?;
        Ok(Self::new(bbox, polygons))
    }

    /// Replace the rings (bbox kept) and bump the geometry version.
    pub fn set_polygons(&self, polygons: Vec<Polygon>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.polygons = polygons;
        state.version += 1;
        debug!(version = state.version, rings = state.polygons.len(), "area geometry replaced");
    }
}

impl AreaProvider for StaticArea {
    fn bbox(&self) -> BoundingBox {
        self.state.read().unwrap_or_else(PoisonError::into_inner).bbox
    }

    fn polygons(&self) -> Vec<Polygon> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .polygons
            .clone()
    }

    fn is_position_within(&self, p: &Position) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.polygons.is_empty() {
            return state.bbox.contains(p);
        }
        state.polygons.iter().any(|poly| poly.contains_position(p))
    }

    fn geometry_version(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).version
    }
}

/// Counterclockwise rectangle of a bbox.
pub fn bbox_ring(bbox: &BoundingBox) -> Polygon {
    let (sw, ne) = (bbox.southwest(), bbox.northeast());
    Polygon::from_lat_lngs(&[
        (sw.lat, sw.lng),
        (sw.lat, ne.lng),
        (ne.lat, ne.lng),
        (ne.lat, sw.lng),
    ])
}
