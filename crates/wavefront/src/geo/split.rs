//! Splitting rings along a cut line.
//!
//! Method
//! - Work on a detached, deduplicated copy of the ring walked counterclockwise.
//! - Classify every vertex against the line and insert the edge crossings (`On`).
//! - Between two sided vertices on opposite sides lies a run of `On` vertices; the
//!   side being left ends at the first of them, the side being entered starts at
//!   the last. This yields open chains per side, each starting and ending on the line.
//! - Close chains into rings along the line: in a counterclockwise walk west chains
//!   run from north to south, so a west ring closes by walking north to the nearest
//!   chain start; east rings walk south. Interior line vertices are spliced in on
//!   the way.
//!
//! Degenerate input (fewer than three distinct vertices, or every vertex on the
//! line) splits into nothing. Rings touching the cut in a single point may come
//! out as bowties; those are kept.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::cutline::{CutLine, LineSide};
use super::polygon::{Polygon, Side};
use super::position::{CutId, CutMark, Position};
use crate::consts::EPSILON;

/// Fragments produced by one split, tagged with the cut that produced them.
#[derive(Clone, Debug, Default)]
pub struct SplitResult {
    pub left: Vec<Polygon>,
    pub right: Vec<Polygon>,
}

impl SplitResult {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Splits rings and hands out a fresh `CutId` per split.
#[derive(Debug, Default)]
pub struct PolygonSplitter {
    next_cut: AtomicU64,
}

impl PolygonSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the id the next split would use.
    pub fn next_cut_id(&self) -> CutId {
        CutId(self.next_cut.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Split `poly` at `line`: west fragments left, east fragments right.
    pub fn split(&self, poly: &Polygon, line: &CutLine) -> SplitResult {
        self.split_with_cut(poly, line, self.next_cut_id())
    }

    /// Split with a caller-chosen cut id (several rings cut by one wave position).
    pub fn split_with_cut(&self, poly: &Polygon, line: &CutLine, cut_id: CutId) -> SplitResult {
        let ring = detached_ring(poly);
        if ring.len() < 3 {
            debug!(len = ring.len(), "ring too small to split");
            return SplitResult::default();
        }
        let Ok(line_box) = line.bbox() else {
            return SplitResult::default();
        };
        let (min_lng, max_lng) = ring
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.lng), hi.max(p.lng)));
        if line_box.min_longitude() > max_lng {
            return whole(ring, Side::Left(cut_id));
        }
        if line_box.max_longitude() < min_lng {
            return whole(ring, Side::Right(cut_id));
        }

        let ccw = if Polygon::from_positions(ring.iter().copied()).is_clockwise() {
            ring.iter().rev().copied().collect()
        } else {
            ring.clone()
        };
        let verts = classify(&ccw, line);
        let has_west = verts.iter().any(|v| v.side == LineSide::West);
        let has_east = verts.iter().any(|v| v.side == LineSide::East);
        match (has_west, has_east) {
            (false, false) => {
                debug!(?cut_id, "all vertices on the cut line");
                return SplitResult::default();
            }
            (true, false) => return whole(ring, Side::Left(cut_id)),
            (false, true) => return whole(ring, Side::Right(cut_id)),
            (true, true) => {}
        }

        let (west, east) = chains(&verts, cut_id);
        let meridian = line.is_meridian();
        let result = SplitResult {
            left: assemble(&west, line, meridian, Side::Left(cut_id)),
            right: assemble(&east, line, meridian, Side::Right(cut_id)),
        };
        debug!(
            ?cut_id,
            vertices = verts.len(),
            left = result.left.len(),
            right = result.right.len(),
            "split ring"
        );
        result
    }
}

/// Split at a constant longitude with a throwaway splitter.
pub fn split_by_longitude(poly: &Polygon, lng: f64) -> SplitResult {
    PolygonSplitter::new().split(poly, &CutLine::from_longitude(lng))
}

#[derive(Clone, Copy, Debug)]
struct Vertex {
    pos: Position,
    side: LineSide,
}

struct Chain {
    points: Vec<Position>,
}

impl Chain {
    fn start(&self) -> &Position {
        &self.points[0]
    }

    fn end(&self) -> &Position {
        &self.points[self.points.len() - 1]
    }
}

/// Detached positions without a closing duplicate or repeated neighbours.
fn detached_ring(poly: &Polygon) -> Vec<Position> {
    let mut ring: Vec<Position> = Vec::with_capacity(poly.len());
    for p in poly.iter() {
        if ring.last().map_or(true, |q| !q.approx_eq(p)) {
            ring.push(p.detached());
        }
    }
    while ring.len() > 1 && ring[0].approx_eq(&ring[ring.len() - 1]) {
        ring.pop();
    }
    ring
}

fn whole(ring: Vec<Position>, side: Side) -> SplitResult {
    let poly = Polygon::from_positions(ring).with_side(side);
    match side {
        Side::Left(_) => SplitResult {
            left: vec![poly],
            right: Vec::new(),
        },
        Side::Right(_) => SplitResult {
            left: Vec::new(),
            right: vec![poly],
        },
    }
}

fn opposite(a: LineSide, b: LineSide) -> bool {
    matches!(
        (a, b),
        (LineSide::West, LineSide::East) | (LineSide::East, LineSide::West)
    )
}

/// Ring vertices with crossings inserted; approximate duplicates merged (`On` wins).
fn classify(ring: &[Position], line: &CutLine) -> Vec<Vertex> {
    let n = ring.len();
    let mut verts = Vec::with_capacity(n * 2);
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[(i + 1) % n]);
        let side = line.is_point_on_line(a);
        verts.push(Vertex { pos: *a, side });
        let mut xs = line.crossings(a, b);
        if xs.is_empty() && opposite(side, line.is_point_on_line(b)) {
            // classification and offsets disagree near the line; force one crossing
            let fa = line.offset(a).unwrap_or(0.0);
            let fb = line.offset(b).unwrap_or(0.0);
            let t = if (fa - fb).abs() > EPSILON {
                (fa / (fa - fb)).clamp(0.0, 1.0)
            } else {
                0.5
            };
            xs.push(Position::new(a.lat + t * (b.lat - a.lat), a.lng + t * (b.lng - a.lng)));
        }
        verts.extend(xs.into_iter().map(|pos| Vertex {
            pos,
            side: LineSide::On,
        }));
    }

    let mut out: Vec<Vertex> = Vec::with_capacity(verts.len());
    for v in verts {
        if let Some(last) = out.last_mut() {
            if last.pos.approx_eq(&v.pos) {
                if v.side == LineSide::On {
                    last.side = LineSide::On;
                }
                continue;
            }
        }
        out.push(v);
    }
    while out.len() > 1 && out[0].pos.approx_eq(&out[out.len() - 1].pos) {
        if let Some(v) = out.pop() {
            if v.side == LineSide::On {
                out[0].side = LineSide::On;
            }
        }
    }
    insert_side_probes(&mut out, line);
    trace!(vertices = out.len(), "classified ring");
    out
}

/// A line bending through a single edge leaves two consecutive contacts with a
/// sliver of the other side between them. Probe such sub-edges at their midpoint
/// and keep the probe when it changes a side transition.
fn insert_side_probes(verts: &mut Vec<Vertex>, line: &CutLine) {
    let m = verts.len();
    if verts.iter().all(|v| v.side == LineSide::On) {
        return;
    }
    let sided_before = |i: usize| {
        (1..=m)
            .map(|k| verts[(i + m - k) % m].side)
            .find(|s| *s != LineSide::On)
    };
    let sided_after = |i: usize| {
        (1..=m)
            .map(|k| verts[(i + k) % m].side)
            .find(|s| *s != LineSide::On)
    };
    let mut probes = Vec::new();
    for i in 0..m {
        let j = (i + 1) % m;
        if verts[i].side != LineSide::On || verts[j].side != LineSide::On {
            continue;
        }
        let (a, b) = (verts[i].pos, verts[j].pos);
        let mid = Position::new((a.lat + b.lat) / 2.0, (a.lng + b.lng) / 2.0);
        let side = line.is_point_on_line(&mid);
        if side == LineSide::On {
            continue;
        }
        if sided_before(i) != Some(side) || sided_after(j) != Some(side) {
            probes.push((i + 1, Vertex { pos: mid, side }));
        }
    }
    for (at, v) in probes.into_iter().rev() {
        verts.insert(at, v);
    }
}

/// Open west and east chains, each beginning and ending on the line.
fn chains(verts: &[Vertex], cut_id: CutId) -> (Vec<Chain>, Vec<Chain>) {
    let m = verts.len();
    let sided: Vec<usize> = (0..m).filter(|&i| verts[i].side != LineSide::On).collect();

    // (side entered, start index, end index of the previous side's chain)
    let mut transitions = Vec::new();
    for k in 0..sided.len() {
        let i = sided[k];
        let j = sided[(k + 1) % sided.len()];
        if verts[i].side == verts[j].side {
            continue;
        }
        let first_gap = (i + 1) % m;
        let last_gap = (j + m - 1) % m;
        if first_gap == j {
            debug!(i, j, "side change without crossing");
            continue;
        }
        transitions.push((verts[j].side, last_gap, first_gap));
    }

    let mark = |idx: usize| {
        let prev = verts[(idx + m - 1) % m].pos;
        let next = verts[(idx + 1) % m].pos;
        let (w, e) = if prev.lng <= next.lng { (prev, next) } else { (next, prev) };
        verts[idx].pos.with_cut(CutMark {
            cut_id,
            cut_left: w.xy(),
            cut_right: e.xy(),
        })
    };

    let mut west = Vec::new();
    let mut east = Vec::new();
    let t = transitions.len();
    for k in 0..t {
        let (side, start, _) = transitions[k];
        let (_, _, end) = transitions[(k + 1) % t];
        let mut points = vec![mark(start)];
        let mut idx = (start + 1) % m;
        while idx != end {
            points.push(verts[idx].pos);
            idx = (idx + 1) % m;
        }
        points.push(mark(end));
        let chain = Chain { points };
        match side {
            LineSide::West => west.push(chain),
            LineSide::East => east.push(chain),
            LineSide::On => unreachable!("transitions only enter sided vertices"),
        }
    }
    (west, east)
}

/// Close chains into rings by walking along the line (north for left, south for right).
fn assemble(chains: &[Chain], line: &CutLine, meridian: bool, side: Side) -> Vec<Polygon> {
    let north = side.is_left();
    let mut used = vec![false; chains.len()];
    let mut out = Vec::new();
    for first in 0..chains.len() {
        if used[first] {
            continue;
        }
        let mut ring: Vec<Position> = Vec::new();
        let mut cur = first;
        loop {
            used[cur] = true;
            ring.extend(chains[cur].points.iter().copied());
            let end = *chains[cur].end();
            let next = nearest_start(chains, &end, north);
            if let Some(k) = next {
                if !meridian {
                    let s = chains[k].start();
                    let mut between =
                        line.positions_between(end.lat.min(s.lat), end.lat.max(s.lat));
                    if !north {
                        between.reverse();
                    }
                    ring.extend(between.iter().map(Position::detached));
                }
            }
            match next {
                Some(k) if !used[k] => cur = k,
                _ => break,
            }
        }
        let mut poly = Polygon::from_positions(ring);
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() >= 3 {
            out.push(poly.with_side(side));
        } else {
            trace!(len = poly.len(), "dropping degenerate fragment");
        }
    }
    out
}

fn nearest_start(chains: &[Chain], end: &Position, north: bool) -> Option<usize> {
    let candidates = chains.iter().enumerate().map(|(k, c)| (k, c.start().lat));
    if north {
        candidates
            .filter(|&(_, lat)| lat >= end.lat - EPSILON)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
    } else {
        candidates
            .filter(|&(_, lat)| lat <= end.lat + EPSILON)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
    }
}
