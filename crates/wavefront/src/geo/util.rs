//! Longitude arithmetic and small planar predicates.

use nalgebra::Vector2;
use std::f64::consts::PI;

use crate::consts::{EARTH_RADIUS, EPSILON};

/// Wrap a longitude into [-180, 180]. Values already in range are returned unchanged.
#[inline]
pub fn normalize_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// `a - b` wrapped into (-180, 180].
#[inline]
pub fn normalized_longitude_difference(a: f64, b: f64) -> f64 {
    let d = a - b;
    if d > -180.0 && d <= 180.0 {
        return d;
    }
    let w = d.rem_euclid(360.0);
    if w > 180.0 {
        w - 360.0
    } else {
        w
    }
}

/// Length in metres of one degree of longitude at `lat` (degrees).
#[inline]
pub fn meters_per_degree_longitude(lat: f64) -> f64 {
    EARTH_RADIUS * lat.to_radians().cos() * (PI / 180.0)
}

/// East-west distance in metres between two longitudes along the parallel `lat`.
///
/// Longitudes are taken as they come: bounding boxes never wrap, so a span from
/// -170 to 170 is 340 degrees wide.
#[inline]
pub fn calculate_distance(lon1: f64, lon2: f64, lat: f64) -> f64 {
    (lon2 - lon1).abs() * meters_per_degree_longitude(lat).max(0.0)
}

/// Twice the signed area of triangle (a, b, c); positive when counterclockwise.
#[inline]
pub(crate) fn orient(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    (b - a).perp(&(c - a))
}

/// Closed-segment membership with tolerance `EPSILON` (scaled by segment length).
pub(crate) fn point_on_segment(a: Vector2<f64>, b: Vector2<f64>, p: Vector2<f64>) -> bool {
    let len = (b - a).norm();
    if len <= EPSILON {
        return (p - a).norm() <= EPSILON;
    }
    if orient(a, b, p).abs() > EPSILON * len.max(1.0) {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Segments (a, b) and (c, d) share at least one point.
pub(crate) fn segments_intersect(
    a: Vector2<f64>,
    b: Vector2<f64>,
    c: Vector2<f64>,
    d: Vector2<f64>,
) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if (o1 > EPSILON && o2 < -EPSILON || o1 < -EPSILON && o2 > EPSILON)
        && (o3 > EPSILON && o4 < -EPSILON || o3 < -EPSILON && o4 > EPSILON)
    {
        return true;
    }
    point_on_segment(a, b, c)
        || point_on_segment(a, b, d)
        || point_on_segment(c, d, a)
        || point_on_segment(c, d, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::vector;

    #[test]
    fn normalize_wraps_out_of_range() {
        assert_eq!(normalize_longitude(10.0), 10.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_relative_eq!(normalize_longitude(190.0), -170.0);
        assert_relative_eq!(normalize_longitude(-190.0), 170.0);
        assert_relative_eq!(normalize_longitude(540.0), -180.0);
    }

    #[test]
    fn difference_crosses_antimeridian() {
        assert_relative_eq!(normalized_longitude_difference(-179.0, 179.0), 2.0);
        assert_relative_eq!(normalized_longitude_difference(179.0, -179.0), -2.0);
        assert_relative_eq!(normalized_longitude_difference(0.0, 180.0), 180.0);
        assert_relative_eq!(normalized_longitude_difference(180.0, 0.0), 180.0);
    }

    #[test]
    fn degree_length_shrinks_with_latitude() {
        let equator = meters_per_degree_longitude(0.0);
        assert_relative_eq!(equator, 111_319.490_793, epsilon = 1e-3);
        assert_relative_eq!(meters_per_degree_longitude(60.0), equator * 0.5, epsilon = 1e-6);
        assert!(meters_per_degree_longitude(90.0).abs() < 1e-6);
    }

    #[test]
    fn distance_spans_boxes_wider_than_half_the_globe() {
        let lat = 45.0;
        let d = calculate_distance(-170.0, 170.0, lat);
        assert_relative_eq!(d, 340.0 * meters_per_degree_longitude(lat), epsilon = 1e-6);
        assert_eq!(d, calculate_distance(170.0, -170.0, lat));
    }

    #[test]
    fn segment_predicates() {
        let a = vector![0.0, 0.0];
        let b = vector![2.0, 2.0];
        assert!(point_on_segment(a, b, vector![1.0, 1.0]));
        assert!(!point_on_segment(a, b, vector![3.0, 3.0]));
        assert!(segments_intersect(a, b, vector![0.0, 2.0], vector![2.0, 0.0]));
        assert!(!segments_intersect(a, b, vector![0.0, 1.0], vector![-1.0, 2.0]));
    }
}
