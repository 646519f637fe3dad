//! Cut lines: south→north arcs of positions used as splitting longitudes.
//!
//! A line is a polyline in `(lng, lat)` ordered by latitude. Outside its latitude
//! range it extends vertically from the first/last vertex, so every latitude has
//! exactly one line longitude (`longitude_at`). Arcs whose longitude deltas change
//! sign more than once are rejected; such a line could fold back over a ring edge.

use nalgebra::Vector2;
use tracing::trace;

use super::bbox::BoundingBox;
use super::position::{CutId, CutMark, Position, PositionId};
use super::util::{normalize_longitude, normalized_longitude_difference, point_on_segment};
use crate::consts::EPSILON;
use crate::error::{GeoError, GeoResult};

/// Order in which the caller supplied positions (bookkeeping only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineDirection {
    #[default]
    North,
    South,
}

/// Position of a point relative to a cut line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineSide {
    East,
    West,
    On,
}

#[derive(Clone, Debug, Default)]
pub struct CutLine {
    positions: Vec<Position>,
    direction: LineDirection,
    last_inserted: Option<Position>,
    next_id: u64,
}

impl CutLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vertical line through `lng`.
    pub fn from_longitude(lng: f64) -> Self {
        let mut line = Self::new();
        line.push_unchecked(Position::new(0.0, lng));
        line
    }

    /// Validated line from positions in the given order.
    pub fn from_positions<I>(positions: I) -> GeoResult<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut line = Self::new();
        line.add_all(positions)?;
        Ok(line)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions sorted south→north.
    #[inline]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    #[inline]
    pub fn direction(&self) -> LineDirection {
        self.direction
    }

    pub fn bbox(&self) -> GeoResult<BoundingBox> {
        BoundingBox::from_positions(&self.positions).ok_or(GeoError::EmptyCutLine)
    }

    /// Insert one position. On an invalid arc the line is left unchanged.
    pub fn add(&mut self, pos: Position) -> GeoResult<Position> {
        let mut candidate = self.positions.clone();
        let inserted = self.prepare(pos);
        candidate.push(inserted);
        sort_by_latitude(&mut candidate);
        validate_arc(&candidate)?;
        self.commit(candidate, std::iter::once(inserted));
        Ok(inserted)
    }

    /// Insert several positions atomically.
    pub fn add_all<I>(&mut self, positions: I) -> GeoResult<()>
    where
        I: IntoIterator<Item = Position>,
    {
        let saved_next_id = self.next_id;
        let added: Vec<Position> = positions.into_iter().map(|p| self.prepare(p)).collect();
        let mut candidate = self.positions.clone();
        candidate.extend_from_slice(&added);
        sort_by_latitude(&mut candidate);
        if let Err(e) = validate_arc(&candidate) {
            self.next_id = saved_next_id;
            return Err(e);
        }
        self.commit(candidate, added);
        Ok(())
    }

    fn prepare(&mut self, pos: Position) -> Position {
        let mut p = pos.detached().normalized();
        p.assign_id(PositionId(self.next_id));
        self.next_id += 1;
        p
    }

    fn commit<I>(&mut self, sorted: Vec<Position>, inserted: I)
    where
        I: IntoIterator<Item = Position>,
    {
        for p in inserted {
            if let Some(prev) = self.last_inserted {
                self.direction = if p.lat >= prev.lat {
                    LineDirection::North
                } else {
                    LineDirection::South
                };
            }
            self.last_inserted = Some(p);
        }
        self.positions = sorted;
    }

    fn push_unchecked(&mut self, pos: Position) {
        let p = self.prepare(pos);
        self.last_inserted = Some(p);
        self.positions.push(p);
    }

    /// Single point or constant longitude.
    pub fn is_meridian(&self) -> bool {
        match self.positions.first() {
            None => true,
            Some(first) => self
                .positions
                .iter()
                .all(|p| normalized_longitude_difference(p.lng, first.lng).abs() <= EPSILON),
        }
    }

    /// Line longitude at `lat`; `None` for an empty line.
    pub fn longitude_at(&self, lat: f64) -> Option<f64> {
        let first = self.positions.first()?;
        let last = self.positions.last()?;
        if lat <= first.lat {
            return Some(first.lng);
        }
        if lat >= last.lat {
            return Some(last.lng);
        }
        for w in self.positions.windows(2) {
            let (s, e) = (&w[0], &w[1]);
            let dlat = e.lat - s.lat;
            if dlat > EPSILON && lat >= s.lat && lat <= e.lat {
                let t = (lat - s.lat) / dlat;
                let dlng = normalized_longitude_difference(e.lng, s.lng);
                return Some(normalize_longitude(s.lng + t * dlng));
            }
        }
        Some(last.lng)
    }

    /// Signed longitude offset of `p` from the line (positive = east).
    pub fn offset(&self, p: &Position) -> Option<f64> {
        let lng = self.longitude_at(p.lat)?;
        Some(normalized_longitude_difference(p.lng, lng))
    }

    pub fn is_point_on_line(&self, p: &Position) -> LineSide {
        if self.positions.len() <= 1 || self.is_meridian() {
            return match self.offset(p) {
                Some(d) => side_from_offset(d),
                None => LineSide::On,
            };
        }
        let pv = |s: &Position, q: &Position| {
            Vector2::new(normalized_longitude_difference(q.lng, s.lng), q.lat - s.lat)
        };
        for w in self.positions.windows(2) {
            let s = &w[0];
            if point_on_segment(Vector2::zeros(), pv(s, &w[1]), pv(s, p)) {
                return LineSide::On;
            }
        }
        let (first, last) = (&self.positions[0], &self.positions[self.positions.len() - 1]);
        if p.lat < first.lat || p.lat > last.lat {
            let end = if p.lat < first.lat { first } else { last };
            return side_from_offset(normalized_longitude_difference(p.lng, end.lng));
        }
        for w in self.positions.windows(2) {
            let (s, e) = (&w[0], &w[1]);
            if e.lat - s.lat <= EPSILON || p.lat < s.lat || p.lat > e.lat {
                continue;
            }
            let seg = pv(s, e);
            let cross = seg.perp(&pv(s, p));
            if cross.abs() <= EPSILON * seg.norm() {
                return LineSide::On;
            }
            return if cross < 0.0 {
                LineSide::East
            } else {
                LineSide::West
            };
        }
        match self.offset(p) {
            Some(d) => side_from_offset(d),
            None => LineSide::On,
        }
    }

    /// Points strictly inside the edge `a→b` where it meets the line, ordered from `a`.
    ///
    /// The edge is cut at every line-vertex latitude (bends only; a meridian has
    /// none); on each piece the offset is linear in the edge parameter, so roots are
    /// found by interpolation.
    pub(crate) fn crossings(&self, a: &Position, b: &Position) -> Vec<Position> {
        let mut out = Vec::new();
        if self.positions.is_empty() {
            return out;
        }
        let at = |t: f64| Position::new(a.lat + t * (b.lat - a.lat), a.lng + t * (b.lng - a.lng));
        let mut ts = vec![0.0, 1.0];
        let dlat = b.lat - a.lat;
        if dlat.abs() > EPSILON && !self.is_meridian() {
            ts.extend(
                self.positions
                    .iter()
                    .map(|p| (p.lat - a.lat) / dlat)
                    .filter(|t| *t > 0.0 && *t < 1.0),
            );
        }
        ts.sort_by(f64::total_cmp);
        ts.dedup();
        let f = |t: f64| self.offset(&at(t)).unwrap_or(0.0);
        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            let (f0, f1) = (f(t0), f(t1));
            if f0.abs() > EPSILON && f1.abs() > EPSILON && (f0 < 0.0) != (f1 < 0.0) {
                let t = t0 + (t1 - t0) * f0 / (f0 - f1);
                out.push(at(t));
            } else if t1 < 1.0 && f1.abs() <= EPSILON {
                out.push(at(t1));
            }
        }
        trace!(count = out.len(), "edge crossings");
        out
    }

    /// First point where the segment `a→b` crosses the line, marked as a cut vertex.
    /// A single-point line behaves as the meridian through it.
    pub fn intersect_with_segment(
        &self,
        cut_id: CutId,
        a: &Position,
        b: &Position,
    ) -> Option<Position> {
        let hit = *self.crossings(a, b).first()?;
        let (west, east) = if a.lng <= b.lng { (a, b) } else { (b, a) };
        Some(hit.with_cut(CutMark {
            cut_id,
            cut_left: west.xy(),
            cut_right: east.xy(),
        }))
    }

    /// Line vertices with `min_lat < lat < max_lat`, south→north.
    pub fn positions_between(&self, min_lat: f64, max_lat: f64) -> Vec<Position> {
        self.positions
            .iter()
            .filter(|p| p.lat > min_lat && p.lat < max_lat)
            .copied()
            .collect()
    }
}

fn side_from_offset(d: f64) -> LineSide {
    if d.abs() < EPSILON {
        LineSide::On
    } else if d < 0.0 {
        LineSide::West
    } else {
        LineSide::East
    }
}

fn sort_by_latitude(positions: &mut [Position]) {
    positions.sort_by(|a, b| a.lat.total_cmp(&b.lat));
}

/// At most one sign change among the non-zero longitude deltas.
fn validate_arc(sorted: &[Position]) -> GeoResult<()> {
    let mut last_sign = None;
    let mut sign_changes = 0;
    for w in sorted.windows(2) {
        let d = normalized_longitude_difference(w[1].lng, w[0].lng);
        if d.abs() <= EPSILON {
            continue;
        }
        let sign = d > 0.0;
        if last_sign.is_some_and(|s| s != sign) {
            sign_changes += 1;
        }
        last_sign = Some(sign);
    }
    if sign_changes > 1 {
        return Err(GeoError::InvalidArc { sign_changes });
    }
    Ok(())
}
