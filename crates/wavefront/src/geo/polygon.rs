//! Mutable position rings with incrementally maintained aggregates.
//!
//! Layout
//! - Nodes live in an arena (`Vec<Option<Node>>`) addressed by slot index; freed
//!   slots are recycled. `prev`/`next` are slot indices and never leave this module.
//! - `index` maps a `PositionId` to its slot for O(1) lookup, insert and remove.
//! - `area_sum` accumulates `(x2 - x1) * (y1 + y2)` over the open chain head→tail
//!   (`x = lng`, `y = lat`); the closing edge tail→head is added on query.
//! - The bounding box is computed lazily and dropped on every structural edit.
//!
//! Inserts update `area_sum` in O(1). Removals recompute it in O(n): unlinking a
//! head or tail changes which edge closes the ring, and a full pass keeps the sum
//! free of accumulated cancellation error.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use super::bbox::BoundingBox;
use super::position::{CutId, Position, PositionId};
use super::util::{point_on_segment, segments_intersect};
use crate::error::{GeoError, GeoResult};

/// Which side of a cut a fragment came from, with the cut that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left(CutId),
    Right(CutId),
}

impl Side {
    #[inline]
    pub fn cut_id(&self) -> CutId {
        match *self {
            Side::Left(id) | Side::Right(id) => id,
        }
    }

    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, Side::Left(_))
    }
}

#[derive(Clone, Debug)]
struct Node {
    pos: Position,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked ring of positions (implicitly closed; no hole support).
#[derive(Clone, Debug, Default)]
pub struct Polygon {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<PositionId, usize>,
    cut_ids: BTreeSet<PositionId>,
    next_id: u64,
    area_sum: f64,
    bbox: OnceLock<BoundingBox>,
    side: Option<Side>,
}

#[inline]
fn edge_term(a: &Position, b: &Position) -> f64 {
    (b.lng - a.lng) * (a.lat + b.lat)
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring built by `add`-ing each position in order.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut poly = Self::new();
        for p in positions {
            poly.add(p);
        }
        poly
    }

    /// Ring from `(lat, lng)` pairs.
    pub fn from_lat_lngs(coords: &[(f64, f64)]) -> Self {
        Self::from_positions(coords.iter().map(|&c| Position::from(c)))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    #[inline]
    pub fn set_side(&mut self, side: Option<Side>) {
        self.side = side;
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn first(&self) -> Option<&Position> {
        self.head.map(|s| &self.node(s).pos)
    }

    pub fn last(&self) -> Option<&Position> {
        self.tail.map(|s| &self.node(s).pos)
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.index.get(&id).map(|&s| &self.node(s).pos)
    }

    #[inline]
    pub fn contains_id(&self, id: PositionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Append at the tail. A position equal to the current tail is not inserted;
    /// the existing tail is returned instead.
    ///
    /// The stored position always gets a fresh id from this ring, even when `pos`
    /// already carries one: a copy of a position owned elsewhere is a new vertex.
    pub fn add(&mut self, pos: Position) -> Position {
        self.push_tail(pos, false)
    }

    fn push_tail(&mut self, pos: Position, keep_id: bool) -> Position {
        let prev = self.tail;
        if let Some(t) = prev {
            let tail_pos = self.node(t).pos;
            if tail_pos == pos {
                return tail_pos;
            }
            self.area_sum += edge_term(&tail_pos, &pos);
        }
        let slot = self.attach(pos, prev, None, keep_id);
        match prev {
            Some(t) => self.node_mut(t).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.node(slot).pos
    }

    /// Insert `pos` right after the position `after`.
    pub fn insert_after(&mut self, pos: Position, after: PositionId) -> GeoResult<Position> {
        let a = self.slot_of(after)?;
        let a_pos = self.node(a).pos;
        let next = self.node(a).next;
        match next {
            Some(n) => {
                let n_pos = self.node(n).pos;
                self.area_sum +=
                    edge_term(&a_pos, &pos) + edge_term(&pos, &n_pos) - edge_term(&a_pos, &n_pos);
            }
            None => self.area_sum += edge_term(&a_pos, &pos),
        }
        let slot = self.attach(pos, Some(a), next, false);
        self.node_mut(a).next = Some(slot);
        match next {
            Some(n) => self.node_mut(n).prev = Some(slot),
            None => self.tail = Some(slot),
        }
        Ok(self.node(slot).pos)
    }

    /// Insert `pos` right before the position `before`.
    pub fn insert_before(&mut self, pos: Position, before: PositionId) -> GeoResult<Position> {
        let b = self.slot_of(before)?;
        let b_pos = self.node(b).pos;
        let prev = self.node(b).prev;
        match prev {
            Some(p) => {
                let p_pos = self.node(p).pos;
                self.area_sum +=
                    edge_term(&p_pos, &pos) + edge_term(&pos, &b_pos) - edge_term(&p_pos, &b_pos);
            }
            None => self.area_sum += edge_term(&pos, &b_pos),
        }
        let slot = self.attach(pos, prev, Some(b), false);
        self.node_mut(b).prev = Some(slot);
        match prev {
            Some(p) => self.node_mut(p).next = Some(slot),
            None => self.head = Some(slot),
        }
        Ok(self.node(slot).pos)
    }

    /// Remove by id; `false` if the id is not in this ring.
    pub fn remove(&mut self, id: PositionId) -> bool {
        self.take(id).is_some()
    }

    /// Unlink and return a position. Its identity is kept so it can be re-inserted
    /// elsewhere.
    pub fn take(&mut self, id: PositionId) -> Option<Position> {
        let slot = self.index.remove(&id)?;
        let node = self.nodes[slot].take()?;
        match node.prev {
            Some(p) => self.node_mut(p).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.node_mut(n).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(slot);
        self.cut_ids.remove(&id);
        self.bbox = OnceLock::new();
        self.force_direction_computation();
        Some(node.pos)
    }

    /// Remove and return the tail.
    pub fn pop(&mut self) -> Option<Position> {
        let id = self.last()?.try_id()?;
        self.take(id)
    }

    /// Move a position from this ring to the tail of `dest`, keeping its id unless
    /// `dest` already uses it. This is the only way an identity crosses rings.
    pub fn move_position(&mut self, id: PositionId, dest: &mut Polygon) -> GeoResult<Position> {
        let pos = self.take(id).ok_or(GeoError::PositionNotFound { id })?;
        Ok(dest.push_tail(pos, true))
    }

    /// Recompute the signed-area accumulator from scratch.
    pub fn force_direction_computation(&mut self) {
        let sum: f64 = self
            .iter()
            .zip(self.iter().skip(1))
            .map(|(a, b)| edge_term(a, b))
            .sum();
        self.area_sum = sum;
    }

    fn closed_sum(&self) -> f64 {
        match (self.last(), self.first()) {
            (Some(t), Some(h)) if self.len() > 1 => self.area_sum + edge_term(t, h),
            _ => 0.0,
        }
    }

    /// Winding direction; rings with fewer than 3 positions count as clockwise.
    pub fn is_clockwise(&self) -> bool {
        if self.len() < 3 {
            return true;
        }
        self.closed_sum() > 0.0
    }

    /// Shoelace area in square degrees, positive for counterclockwise rings.
    pub fn signed_area(&self) -> f64 {
        -self.closed_sum() / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Envelope of all positions (cached until the next edit).
    pub fn bbox(&self) -> GeoResult<BoundingBox> {
        let first = *self.first().ok_or(GeoError::EmptyPolygon)?;
        Ok(*self.bbox.get_or_init(|| {
            self.iter()
                .fold(BoundingBox::new(first, first), |b, p| b.expanded_to(p))
        }))
    }

    /// Even-odd containment; points on the boundary count as inside.
    pub fn contains_position(&self, point: &Position) -> bool {
        if self.len() < 3 {
            return false;
        }
        match self.bbox() {
            Ok(b) if b.contains(point) => {}
            _ => return false,
        }
        let p = point.xy();
        let mut inside = false;
        for (a, b) in self.edges() {
            if point_on_segment(a.xy(), b.xy(), p) {
                return true;
            }
            if (a.lat > point.lat) != (b.lat > point.lat) {
                let x = a.lng + (point.lat - a.lat) * (b.lng - a.lng) / (b.lat - a.lat);
                if point.lng < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Ring edges including the closing edge tail→head.
    pub fn edges(&self) -> impl Iterator<Item = (&Position, &Position)> + '_ {
        self.iter().zip(self.iter().skip(1).chain(self.first()))
    }

    /// Pairs of non-adjacent edge indices that touch or cross.
    pub fn self_intersections(&self) -> Vec<(usize, usize)> {
        let edges: Vec<_> = self.edges().map(|(a, b)| (a.xy(), b.xy())).collect();
        let m = edges.len();
        let mut out = Vec::new();
        if m < 4 {
            return out;
        }
        for i in 0..m {
            for j in (i + 2)..m {
                if i == 0 && j == m - 1 {
                    continue;
                }
                let (a, b) = edges[i];
                let (c, d) = edges[j];
                if segments_intersect(a, b, c, d) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    /// Positions head→tail. Reverse with `.rev()`.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            poly: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    /// One full loop starting at `start`, following `next` and wrapping at the tail.
    pub fn cyclic_from(&self, start: PositionId) -> GeoResult<Cyclic<'_>> {
        Ok(Cyclic {
            poly: self,
            cur: Some(self.slot_of(start)?),
            remaining: self.len(),
            forward: true,
        })
    }

    /// One full loop starting at `start`, following `prev` and wrapping at the head.
    pub fn cyclic_rev_from(&self, start: PositionId) -> GeoResult<Cyclic<'_>> {
        Ok(Cyclic {
            poly: self,
            cur: Some(self.slot_of(start)?),
            remaining: self.len(),
            forward: false,
        })
    }

    /// Copies of the positions, head→tail.
    pub fn positions(&self) -> Vec<Position> {
        self.iter().copied().collect()
    }

    /// Cut vertices currently in the ring, ordered by id.
    pub fn cut_positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.cut_ids.iter().filter_map(move |id| self.get(*id))
    }

    fn slot_of(&self, id: PositionId) -> GeoResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GeoError::PositionNotFound { id })
    }

    /// Store a position in a free slot. With `keep_id` its identity survives unless
    /// it collides; otherwise a fresh id is drawn.
    fn attach(
        &mut self,
        mut pos: Position,
        prev: Option<usize>,
        next: Option<usize>,
        keep_id: bool,
    ) -> usize {
        let id = match pos.try_id() {
            Some(id) if keep_id && !self.index.contains_key(&id) => {
                self.next_id = self.next_id.max(id.0 + 1);
                id
            }
            _ => {
                let id = PositionId(self.next_id);
                self.next_id += 1;
                id
            }
        };
        pos.assign_id(id);
        let node = Node { pos, prev, next };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(id, slot);
        if pos.is_cut() {
            self.cut_ids.insert(id);
        }
        self.bbox = OnceLock::new();
        slot
    }

    fn node(&self, slot: usize) -> &Node {
        match self.nodes[slot] {
            Some(ref n) => n,
            None => unreachable!("ring link to freed slot {slot}"),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        match self.nodes[slot] {
            Some(ref mut n) => n,
            None => unreachable!("ring link to freed slot {slot}"),
        }
    }
}

impl<'a> IntoIterator for &'a Polygon {
    type Item = &'a Position;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Head→tail iterator; double-ended.
pub struct Iter<'a> {
    poly: &'a Polygon,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Position;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.poly.node(self.front?);
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.poly.node(self.back?);
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.pos)
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Single-loop cyclic iterator (see `Polygon::cyclic_from`).
pub struct Cyclic<'a> {
    poly: &'a Polygon,
    cur: Option<usize>,
    remaining: usize,
    forward: bool,
}

impl<'a> Iterator for Cyclic<'a> {
    type Item = &'a Position;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.poly.node(self.cur?);
        self.cur = if self.forward {
            node.next.or(self.poly.head)
        } else {
            node.prev.or(self.poly.tail)
        };
        self.remaining -= 1;
        Some(&node.pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
