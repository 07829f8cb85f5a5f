//! Planar geometry of the drawing surface and the 2-link arm.
//!
//! Operator coordinates and arm coordinates share one plane with the arm's
//! shoulder at the origin. The reachable region is the annulus between
//! `|L1 - L2|` and `L1 + L2`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;

/// A sample point in operator space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_polar(radius: f64, heading: f64) -> Self {
        Self {
            x: radius * heading.cos(),
            y: radius * heading.sin(),
        }
    }

    pub fn radius(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Polar angle in radians, `atan2(y, x)`.
    pub fn heading(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One pointer-down to pointer-up gesture.
///
/// Immutable once built, so a stroke held in the log can never change
/// underneath a reader. Clones share the point buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    points: Arc<[Point]>,
}

impl Stroke {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Build a stroke from a flat `[x0, y0, x1, y1, ...]` list.
    ///
    /// Returns `None` when the list has an odd length.
    pub fn from_flat(coords: &[f64]) -> Option<Self> {
        if coords.len() % 2 != 0 {
            return None;
        }
        let points = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect::<Vec<_>>();
        Some(Self::new(points))
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A link described by its 2-D offset vector in the arm's rest pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkVector {
    pub x: f64,
    pub y: f64,
}

impl LinkVector {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angular offset of the link in its rest pose, in radians.
    pub fn offset(self) -> f64 {
        self.y.atan2(self.x)
    }
}

/// Minimum and maximum planar reach of the arm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkspaceBounds {
    pub r_min: f64,
    pub r_max: f64,
}

impl WorkspaceBounds {
    pub fn from_lengths(l1: f64, l2: f64) -> Self {
        Self {
            r_min: (l1 - l2).abs(),
            r_max: l1 + l2,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let r = point.radius();
        r >= self.r_min && r <= self.r_max
    }

    /// Constrain `point` to the reachable annulus.
    ///
    /// Points already inside are returned untouched. Points outside keep their
    /// polar angle and have their radius forced to the nearest bound. The
    /// origin maps to `(r_min, 0)`.
    pub fn clamp(&self, point: Point) -> Point {
        if self.contains(point) {
            return point;
        }
        let radius = point.radius().clamp(self.r_min, self.r_max);
        Point::from_polar(radius, point.heading())
    }
}

/// Fixed link geometry of the physical arm.
///
/// Derived quantities (link lengths, rest offsets, workspace bounds) are
/// computed once at construction and never change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinkPair", into = "LinkPair")]
pub struct ArmGeometry {
    link1: LinkVector,
    link2: LinkVector,
    l1: f64,
    l2: f64,
    o1: f64,
    o2: f64,
    bounds: WorkspaceBounds,
}

/// Serialized form of [`ArmGeometry`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct LinkPair {
    link1: LinkVector,
    link2: LinkVector,
}

impl TryFrom<LinkPair> for ArmGeometry {
    type Error = GeometryError;

    fn try_from(pair: LinkPair) -> Result<Self, Self::Error> {
        Self::new(pair.link1, pair.link2)
    }
}

impl From<ArmGeometry> for LinkPair {
    fn from(geometry: ArmGeometry) -> Self {
        Self {
            link1: geometry.link1,
            link2: geometry.link2,
        }
    }
}

impl ArmGeometry {
    pub const DEFAULT_LINK1: LinkVector = LinkVector::new(0.0, 7.0);
    pub const DEFAULT_LINK2: LinkVector = LinkVector::new(5.0, 0.0);

    pub fn new(link1: LinkVector, link2: LinkVector) -> Result<Self, GeometryError> {
        for (index, link) in [(1, link1), (2, link2)] {
            if !(link.x.is_finite() && link.y.is_finite()) {
                return Err(GeometryError::NonFinite { link: index });
            }
            if link.length() <= f64::EPSILON {
                return Err(GeometryError::ZeroLength { link: index });
            }
        }
        Ok(Self::derive(link1, link2))
    }

    fn derive(link1: LinkVector, link2: LinkVector) -> Self {
        let l1 = link1.length();
        let l2 = link2.length();
        Self {
            link1,
            link2,
            l1,
            l2,
            o1: link1.offset(),
            o2: link2.offset(),
            bounds: WorkspaceBounds::from_lengths(l1, l2),
        }
    }

    pub fn link1(&self) -> LinkVector {
        self.link1
    }

    pub fn link2(&self) -> LinkVector {
        self.link2
    }

    /// Link lengths `(L1, L2)`.
    pub fn lengths(&self) -> (f64, f64) {
        (self.l1, self.l2)
    }

    /// Rest offsets `(O1, O2)` in radians.
    pub fn offsets(&self) -> (f64, f64) {
        (self.o1, self.o2)
    }

    pub fn bounds(&self) -> WorkspaceBounds {
        self.bounds
    }
}

impl Default for ArmGeometry {
    fn default() -> Self {
        Self::derive(Self::DEFAULT_LINK1, Self::DEFAULT_LINK2)
    }
}
