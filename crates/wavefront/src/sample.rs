//! Random event areas and cut lines (radial jitter + replay tokens).
//!
//! Model
//! - Start from `n` equally spaced angles on [0, 2π), add bounded angular and
//!   radial jitter, then place the vertices around `center` in `(lng, lat)` degrees.
//!   The result is star-shaped around the center and counterclockwise; with
//!   `convex = true` the convex hull of the jittered points is returned instead.
//! - Determinism uses a replay token `(seed, index)` mixed into a single RNG.
//!
//! Used by property tests, benches and the `sample` CLI command.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GeoError, GeoResult};
use crate::geo::{BoundingBox, CutLine, Polygon, Position};

/// Vertex count distribution.
#[derive(Clone, Copy, Debug)]
pub enum VertexCount {
    Fixed(usize),
    Uniform { min: usize, max: usize },
}

impl VertexCount {
    fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        match *self {
            VertexCount::Fixed(n) => n.max(3),
            VertexCount::Uniform { min, max } => {
                let lo = min.max(3);
                let hi = max.max(lo);
                rng.gen_range(lo..=hi)
            }
        }
    }
}

/// Radial-jitter sampler configuration.
#[derive(Clone, Copy, Debug)]
pub struct RadialCfg {
    pub vertex_count: VertexCount,
    /// Angular jitter as a fraction of the base spacing Δ=2π/n. Clamped to [0, 0.49].
    pub angle_jitter_frac: f64,
    /// Radii are `radius_deg * (1 + u)` with `u∈[-radial_jitter, radial_jitter]`.
    pub radial_jitter: f64,
    pub radius_deg: f64,
    pub center: Position,
    pub random_phase: bool,
    pub convex: bool,
}

impl Default for RadialCfg {
    fn default() -> Self {
        Self {
            vertex_count: VertexCount::Fixed(12),
            angle_jitter_frac: 0.3,
            radial_jitter: 0.25,
            radius_deg: 0.05,
            center: Position::new(48.85, 2.35),
            random_phase: true,
            convex: false,
        }
    }
}

/// Replay token to make draws reproducible and indexable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayToken {
    pub seed: u64,
    pub index: u64,
}

impl ReplayToken {
    #[inline]
    fn to_std_rng(self) -> StdRng {
        // SplitMix64 finalizer
        fn mix(mut x: u64) -> u64 {
            x ^= x >> 30;
            x = x.wrapping_mul(0xbf58476d1ce4e5b9);
            x ^= x >> 27;
            x = x.wrapping_mul(0x94d049bb133111eb);
            x ^ (x >> 31)
        }
        let k = mix(self.seed ^ mix(self.index.wrapping_add(0x9e3779b97f4a7c15)));
        StdRng::seed_from_u64(k)
    }
}

/// Draw a random event area around `cfg.center`.
pub fn draw_area_radial(cfg: RadialCfg, tok: ReplayToken) -> Polygon {
    let mut rng = tok.to_std_rng();
    let n = cfg.vertex_count.sample(&mut rng);
    let aj = cfg.angle_jitter_frac.clamp(0.0, 0.49);
    let rj = cfg.radial_jitter.clamp(0.0, 0.95);
    let r0 = cfg.radius_deg.max(1e-9);
    let delta = 2.0 * std::f64::consts::PI / (n as f64);
    let phase = if cfg.random_phase {
        rng.gen::<f64>() * 2.0 * std::f64::consts::PI
    } else {
        0.0
    };
    let angles: Vec<f64> = (0..n)
        .map(|k| phase + (k as f64) * delta + (rng.gen::<f64>() * 2.0 - 1.0) * aj * delta)
        .collect();
    let c = cfg.center.xy();
    let mut pts: Vec<Vector2<f64>> = angles
        .into_iter()
        .map(|th| {
            let u = (rng.gen::<f64>() * 2.0 - 1.0) * rj;
            c + Vector2::new(th.cos(), th.sin()) * (1.0 + u) * r0
        })
        .collect();
    if cfg.convex {
        pts = convex_hull(&pts);
    }
    Polygon::from_positions(pts.into_iter().map(Position::from_xy))
}

/// A random cut line spanning `bbox` from south to north with `vertices` points.
///
/// Longitudes drift in one direction only, so the arc is always valid.
pub fn draw_cut_line(bbox: &BoundingBox, vertices: usize, tok: ReplayToken) -> GeoResult<CutLine> {
    if vertices == 0 {
        return Err(GeoError::EmptyCutLine);
    }
    let mut rng = tok.to_std_rng();
    let b = bbox.padded(bbox.height() * 0.1, 0.0);
    let mut lats: Vec<f64> = (0..vertices)
        .map(|_| rng.gen_range(b.min_latitude()..=b.max_latitude()))
        .collect();
    lats.sort_by(f64::total_cmp);
    let step = bbox.width() / (vertices as f64 * 2.0);
    let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
    let mut lng = bbox.min_longitude() + bbox.width() * rng.gen_range(0.25..=0.75);
    let mut positions = Vec::with_capacity(vertices);
    for lat in lats {
        positions.push(Position::new(lat, lng));
        lng += sign * step * rng.gen::<f64>();
    }
    CutLine::from_positions(positions)
}

/// Counterclockwise convex hull (monotone chain); collinear points dropped.
fn convex_hull(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts: Vec<_> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
    if pts.len() < 3 {
        return pts;
    }
    let cross = |a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>| (b - a).perp(&(c - a));
    let mut lower: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproducible_draw() {
        let cfg = RadialCfg {
            vertex_count: VertexCount::Fixed(10),
            ..RadialCfg::default()
        };
        let tok = ReplayToken { seed: 42, index: 7 };
        let a = draw_area_radial(cfg, tok).positions();
        let b = draw_area_radial(cfg, tok).positions();
        assert_eq!(a, b);
        let c = draw_area_radial(cfg, ReplayToken { seed: 42, index: 8 }).positions();
        assert_ne!(a, c);
    }

    #[test]
    fn areas_are_counterclockwise_and_simple() {
        for index in 0..32 {
            let cfg = RadialCfg {
                vertex_count: VertexCount::Uniform { min: 4, max: 30 },
                angle_jitter_frac: 0.45,
                radial_jitter: 0.6,
                ..RadialCfg::default()
            };
            let p = draw_area_radial(cfg, ReplayToken { seed: 3, index });
            assert!(!p.is_clockwise());
            assert!(p.self_intersections().is_empty(), "index {index}");
            assert!(p.contains_position(&cfg.center));
        }
    }

    #[test]
    fn convex_draw_is_hull() {
        let cfg = RadialCfg {
            convex: true,
            radial_jitter: 0.5,
            ..RadialCfg::default()
        };
        let p = draw_area_radial(cfg, ReplayToken { seed: 9, index: 1 });
        let pts: Vec<_> = p.iter().map(|q| q.xy()).collect();
        let n = pts.len();
        assert!(n >= 3);
        for i in 0..n {
            let (a, b, c) = (pts[i], pts[(i + 1) % n], pts[(i + 2) % n]);
            assert!((b - a).perp(&(c - b)) > 0.0);
        }
    }

    #[test]
    fn cut_lines_span_the_box() {
        let bbox = BoundingBox::from_corners(10.0, 20.0, 15.0, 30.0);
        for index in 0..16 {
            let line = draw_cut_line(&bbox, 5, ReplayToken { seed: 1, index }).unwrap();
            assert_eq!(line.len(), 5);
        }
        assert!(draw_cut_line(&bbox, 0, ReplayToken { seed: 1, index: 0 }).is_err());
    }
}
