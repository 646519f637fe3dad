//! Latitude/longitude envelopes.
//!
//! No date-line wraparound: `sw.lng <= ne.lng` always holds, so an area crossing
//! ±180° must be represented by the caller on one side of the antimeridian.

use super::position::Position;

/// Axis-aligned envelope `{ southwest, northeast }`.
///
/// Invariant: `sw.lat <= ne.lat` and `sw.lng <= ne.lng` (inputs are min/maxed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    sw: Position,
    ne: Position,
}

impl BoundingBox {
    /// Envelope of two corners given in any order.
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            sw: Position::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            ne: Position::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    pub fn from_corners(sw_lat: f64, sw_lng: f64, ne_lat: f64, ne_lng: f64) -> Self {
        Self::new(Position::new(sw_lat, sw_lng), Position::new(ne_lat, ne_lng))
    }

    /// Envelope of a set of positions; `None` when empty.
    pub fn from_positions<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        let mut it = positions.into_iter();
        let first = *it.next()?;
        Some(it.fold(Self::new(first, first), |b, p| b.expanded_to(p)))
    }

    #[inline]
    pub fn southwest(&self) -> Position {
        self.sw
    }

    #[inline]
    pub fn northeast(&self) -> Position {
        self.ne
    }

    #[inline]
    pub fn min_latitude(&self) -> f64 {
        self.sw.lat
    }

    #[inline]
    pub fn max_latitude(&self) -> f64 {
        self.ne.lat
    }

    #[inline]
    pub fn min_longitude(&self) -> f64 {
        self.sw.lng
    }

    #[inline]
    pub fn max_longitude(&self) -> f64 {
        self.ne.lng
    }

    /// Longitude span in degrees.
    #[inline]
    pub fn width(&self) -> f64 {
        self.ne.lng - self.sw.lng
    }

    /// Latitude span in degrees.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ne.lat - self.sw.lat
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.sw.lat + self.ne.lat) / 2.0,
            (self.sw.lng + self.ne.lng) / 2.0,
        )
    }

    /// Inclusive containment.
    pub fn contains(&self, p: &Position) -> bool {
        p.lat >= self.sw.lat && p.lat <= self.ne.lat && p.lng >= self.sw.lng && p.lng <= self.ne.lng
    }

    /// Closed boxes overlap (touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.sw.lat <= other.ne.lat
            && other.sw.lat <= self.ne.lat
            && self.sw.lng <= other.ne.lng
            && other.sw.lng <= self.ne.lng
    }

    /// Grow (or shrink, for negative values) by the given degrees on every side.
    /// Shrinking never inverts the box; it collapses to the center instead.
    pub fn padded(&self, dlat: f64, dlng: f64) -> Self {
        let c = self.center();
        let half_h = (self.height() / 2.0 + dlat).max(0.0);
        let half_w = (self.width() / 2.0 + dlng).max(0.0);
        Self::from_corners(c.lat - half_h, c.lng - half_w, c.lat + half_h, c.lng + half_w)
    }

    pub fn expanded_to(&self, p: &Position) -> Self {
        Self {
            sw: Position::new(self.sw.lat.min(p.lat), self.sw.lng.min(p.lng)),
            ne: Position::new(self.ne.lat.max(p.lat), self.ne.lng.max(p.lng)),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        self.expanded_to(&other.sw).expanded_to(&other.ne)
    }

    /// Latitude where a degree of longitude is longest inside the box:
    /// `0.0` if the box straddles the equator, otherwise the edge closest to it.
    pub fn latitude_of_widest_part(&self) -> f64 {
        if self.sw.lat <= 0.0 && self.ne.lat >= 0.0 {
            0.0
        } else if self.sw.lat.abs() < self.ne.lat.abs() {
            self.sw.lat
        } else {
            self.ne.lat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_min_maxed() {
        let b = BoundingBox::new(Position::new(15.0, 30.0), Position::new(10.0, 20.0));
        assert_eq!(b.southwest(), Position::new(10.0, 20.0));
        assert_eq!(b.northeast(), Position::new(15.0, 30.0));
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 5.0);
    }

    #[test]
    fn widest_part() {
        let widest = |s, w, n, e| BoundingBox::from_corners(s, w, n, e).latitude_of_widest_part();
        assert_eq!(widest(-30.0, -10.0, 30.0, 10.0), 0.0);
        assert_eq!(widest(10.0, 20.0, 15.0, 30.0), 10.0);
        assert_eq!(widest(-50.0, 0.0, -20.0, 1.0), -20.0);
    }

    #[test]
    fn containment_and_intersection() {
        let b = BoundingBox::from_corners(0.0, 0.0, 2.0, 2.0);
        assert!(b.contains(&Position::new(2.0, 0.0)));
        assert!(!b.contains(&Position::new(2.1, 0.0)));
        assert!(b.intersects(&BoundingBox::from_corners(2.0, 2.0, 3.0, 3.0)));
        assert!(!b.intersects(&BoundingBox::from_corners(2.5, 0.0, 3.0, 1.0)));
        let p = b.padded(1.0, 0.5);
        assert_eq!(p.southwest(), Position::new(-1.0, -0.5));
        assert_eq!(p.northeast(), Position::new(3.0, 2.5));
        let shrunk = b.padded(-5.0, -5.0);
        assert_eq!(shrunk.southwest(), shrunk.northeast());
    }

    #[test]
    fn from_positions_envelope() {
        let pts = [Position::new(1.0, 5.0), Position::new(-2.0, 3.0), Position::new(0.0, 7.0)];
        let b = BoundingBox::from_positions(pts.iter()).unwrap();
        assert_eq!(b, BoundingBox::from_corners(-2.0, 3.0, 1.0, 7.0));
        assert!(BoundingBox::from_positions(std::iter::empty::<&Position>()).is_none());
    }
}
