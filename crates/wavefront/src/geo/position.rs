//! Geographic positions and their container identities.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::util::normalize_longitude;
use crate::consts::EPSILON;
use crate::error::{GeoError, GeoResult};

/// Identity of a position inside one ring or cut line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Groups the crossings produced by one split operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CutId(pub u64);

/// Crossing metadata of a cut vertex.
///
/// `cut_left`/`cut_right` are the ring neighbours (as `(lng, lat)`) on the west
/// and east side at the moment the cut was made.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CutMark {
    pub cut_id: CutId,
    pub cut_left: Vector2<f64>,
    pub cut_right: Vector2<f64>,
}

/// A latitude/longitude pair with a container-assigned identity.
///
/// Equality (`==`) compares coordinates only; identity matters for ring structure,
/// not for geometry. The id stays unset until the position is inserted into a
/// `Polygon` or `CutLine`.
#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    id: Option<PositionId>,
    cut: Option<CutMark>,
}

impl Position {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            id: None,
            cut: None,
        }
    }

    /// Planar view `(x, y) = (lng, lat)`.
    #[inline]
    pub fn xy(&self) -> Vector2<f64> {
        Vector2::new(self.lng, self.lat)
    }

    #[inline]
    pub fn from_xy(v: Vector2<f64>) -> Self {
        Self::new(v.y, v.x)
    }

    /// Identity assigned at insertion; reading it earlier is a precondition error.
    pub fn id(&self) -> GeoResult<PositionId> {
        self.id.ok_or(GeoError::UnassignedId)
    }

    #[inline]
    pub fn try_id(&self) -> Option<PositionId> {
        self.id
    }

    #[inline]
    pub(crate) fn assign_id(&mut self, id: PositionId) {
        self.id = Some(id);
    }

    /// Same coordinates, no identity and no cut metadata.
    #[inline]
    pub fn detached(&self) -> Self {
        Self::new(self.lat, self.lng)
    }

    /// Same position with the longitude wrapped into [-180, 180].
    #[inline]
    pub fn normalized(mut self) -> Self {
        self.lng = normalize_longitude(self.lng);
        self
    }

    #[inline]
    pub fn cut(&self) -> Option<&CutMark> {
        self.cut.as_ref()
    }

    #[inline]
    pub fn is_cut(&self) -> bool {
        self.cut.is_some()
    }

    #[inline]
    pub fn cut_id(&self) -> Option<CutId> {
        self.cut.map(|c| c.cut_id)
    }

    /// Turn this position into a cut vertex.
    #[inline]
    pub fn with_cut(mut self, mark: CutMark) -> Self {
        self.cut = Some(mark);
        self
    }

    /// Coordinate equality within `EPSILON` on both axes.
    #[inline]
    pub fn approx_eq(&self, other: &Position) -> bool {
        (self.lat - other.lat).abs() <= EPSILON && (self.lng - other.lng).abs() <= EPSILON
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lng == other.lng
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

impl From<(f64, f64)> for Position {
    /// `(lat, lng)`.
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}
