//! Memoized wave state with two independent invalidation paths.
//!
//! - Geometry entry: wave duration, last hit instant and the latest snapshot,
//!   keyed by `(epoch, geometry version)`. `invalidate_geometry` bumps the epoch;
//!   a new area version resets the entry on the next write. Writes computed under
//!   an older epoch are dropped so a reader never sees a stale value republished.
//! - Observer entry: whether the observer is inside the area, reused while the
//!   observer stays within `OBSERVER_MOVE_EPSILON`. Geometry changes do not touch it;
//!   only movement (or `clear_observer`) does.
//!
//! Each entry sits behind its own `RwLock`, so readers see either the old or the
//! new entry, never a mix.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use super::calculator::WavePolygons;
use crate::consts::OBSERVER_MOVE_EPSILON;
use crate::geo::Position;

/// Identifies the geometry a cached value was computed from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeometryKey {
    pub epoch: u64,
    pub version: u64,
}

#[derive(Debug, Default)]
struct GeometryEntry {
    key: GeometryKey,
    duration: Option<Duration>,
    hit: Option<(Position, Instant)>,
    snapshot: Option<Arc<WavePolygons>>,
}

#[derive(Clone, Copy, Debug)]
struct ObserverEntry {
    position: Position,
    within_area: bool,
}

#[derive(Debug, Default)]
pub struct WaveStateCache {
    geometry: RwLock<GeometryEntry>,
    observer: RwLock<Option<ObserverEntry>>,
}

impl WaveStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for values computed now against area version `version`.
    pub fn key(&self, version: u64) -> GeometryKey {
        let epoch = self.geometry.read().unwrap_or_else(PoisonError::into_inner).key.epoch;
        GeometryKey { epoch, version }
    }

    pub fn duration(&self, key: GeometryKey) -> Option<Duration> {
        self.read_matching(key, |e| e.duration)
    }

    pub fn set_duration(&self, key: GeometryKey, duration: Duration) {
        self.write_matching(key, |e| e.duration = Some(duration));
    }

    /// Hit instant memoized for exactly this observer position.
    pub fn hit_instant(&self, key: GeometryKey, observer: &Position) -> Option<Instant> {
        self.read_matching(key, |e| match e.hit {
            Some((p, t)) if p == *observer => Some(t),
            _ => None,
        })
    }

    pub fn set_hit_instant(&self, key: GeometryKey, observer: Position, at: Instant) {
        self.write_matching(key, |e| e.hit = Some((observer.detached(), at)));
    }

    pub fn snapshot(&self, key: GeometryKey) -> Option<Arc<WavePolygons>> {
        self.read_matching(key, |e| e.snapshot.clone())
    }

    pub fn set_snapshot(&self, key: GeometryKey, snapshot: Arc<WavePolygons>) {
        self.write_matching(key, |e| e.snapshot = Some(snapshot));
    }

    /// Drop every geometry-derived value; writes still in flight are discarded.
    pub fn invalidate_geometry(&self) {
        let mut entry = self.geometry.write().unwrap_or_else(PoisonError::into_inner);
        let epoch = entry.key.epoch + 1;
        *entry = GeometryEntry {
            key: GeometryKey {
                epoch,
                version: entry.key.version,
            },
            ..GeometryEntry::default()
        };
        debug!(epoch, "geometry cache invalidated");
    }

    /// Forget duration and hit instant; the snapshot stays.
    pub fn clear_duration_cache(&self) {
        let mut entry = self.geometry.write().unwrap_or_else(PoisonError::into_inner);
        entry.duration = None;
        entry.hit = None;
    }

    /// Cached area membership if the observer has not moved.
    pub fn observer_within(&self, observer: &Position) -> Option<bool> {
        let entry = (*self.observer.read().unwrap_or_else(PoisonError::into_inner))?;
        let moved = (entry.position.lat - observer.lat).abs() > OBSERVER_MOVE_EPSILON
            || (entry.position.lng - observer.lng).abs() > OBSERVER_MOVE_EPSILON;
        (!moved).then_some(entry.within_area)
    }

    pub fn set_observer_within(&self, observer: &Position, within_area: bool) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(ObserverEntry {
            position: observer.detached(),
            within_area,
        });
    }

    pub fn clear_observer(&self) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn read_matching<T>(
        &self,
        key: GeometryKey,
        f: impl FnOnce(&GeometryEntry) -> Option<T>,
    ) -> Option<T> {
        let entry = self.geometry.read().unwrap_or_else(PoisonError::into_inner);
        if entry.key != key {
            return None;
        }
        f(&*entry)
    }

    fn write_matching(&self, key: GeometryKey, f: impl FnOnce(&mut GeometryEntry)) {
        let mut entry = self.geometry.write().unwrap_or_else(PoisonError::into_inner);
        if key.epoch < entry.key.epoch {
            return;
        }
        if entry.key != key {
            *entry = GeometryEntry {
                key,
                ..GeometryEntry::default()
            };
        }
        f(&mut *entry);
    }
}
