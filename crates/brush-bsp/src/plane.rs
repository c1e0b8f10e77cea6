//! Plane representation and operations for brush geometry.

use std::ops::Neg;

use nalgebra::{Point3, Vector3};

/// Default epsilon for point/plane classification.
/// Points within this distance of the plane are considered "on" the plane.
pub const ON_EPSILON: f64 = 0.0001;

/// Tolerance used when comparing plane normals for equality.
pub const NORMAL_EPSILON: f64 = 0.000_01;

/// Tolerance used when comparing plane distances for equality.
pub const DIST_EPSILON: f64 = 0.0001;

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is in front of the plane (positive side of normal)
    Front,
    /// Point is behind the plane (negative side of normal)
    Back,
    /// Point lies on the plane (within epsilon tolerance)
    OnPlane,
}

/// Classification of a winding relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// All vertices are in front of the plane
    Front,
    /// All vertices are behind the plane
    Back,
    /// All vertices are on the plane (coplanar)
    Coplanar,
    /// Vertices are on both sides (spans the plane)
    Spanning,
}

/// Axial type of a plane, as stored in the output plane lump.
///
/// `X`, `Y` and `Z` are exactly axial; the `Any*` variants are snapped to the
/// axis their normal is closest to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PlaneType {
    X = 0,
    Y = 1,
    Z = 2,
    AnyX = 3,
    AnyY = 4,
    AnyZ = 5,
}

impl PlaneType {
    /// Returns `true` for the three exactly axial types.
    #[inline]
    pub fn is_axial(self) -> bool {
        matches!(self, PlaneType::X | PlaneType::Y | PlaneType::Z)
    }
}

/// A plane in 3D space, represented as `normal · point = dist`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    dist: f64,
}

impl Plane {
    /// Creates a new plane from a normal vector and distance.
    /// The normal will be normalized automatically.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn new(normal: Vector3<f64>, dist: f64) -> Self {
        let norm = normal.norm();
        assert!(norm > f64::EPSILON, "Plane normal cannot be zero");
        Self {
            normal: normal / norm,
            dist: dist / norm,
        }
    }

    /// Creates a plane from a point on the plane and a normal vector.
    /// The normal will be normalized automatically.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn from_point_and_normal(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        let norm = normal.norm();
        assert!(norm > f64::EPSILON, "Plane normal cannot be zero");
        let unit_normal = normal / norm;
        Self {
            normal: unit_normal,
            dist: unit_normal.dot(&point.coords),
        }
    }

    /// Creates a plane from three non-collinear points.
    ///
    /// Map files list the points clockwise when seen from outside the brush, so
    /// the outward normal is `(a - b) × (c - b)`.
    ///
    /// Returns `None` if the points are collinear (or nearly so).
    pub fn from_map_points(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Option<Self> {
        let normal = (a - b).cross(&(c - b));
        if normal.norm() < NORMAL_EPSILON {
            return None;
        }
        Some(Self::from_point_and_normal(b, normal))
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Returns the signed distance from the origin to the plane along the normal.
    #[inline]
    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Computes the signed distance from a point to the plane.
    /// - Positive: point is in front (same side as normal)
    /// - Negative: point is behind (opposite side from normal)
    /// - Zero: point is on the plane
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.dist
    }

    /// Classifies which side of the plane a point lies on, with a custom epsilon.
    pub fn classify_point_with_epsilon(&self, point: &Point3<f64>, epsilon: f64) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            PlaneSide::Front
        } else if dist < -epsilon {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    /// Classifies which side of the plane a point lies on using [`ON_EPSILON`].
    #[inline]
    pub fn classify_point(&self, point: &Point3<f64>) -> PlaneSide {
        self.classify_point_with_epsilon(point, ON_EPSILON)
    }

    /// Returns a new plane with the normal flipped (facing the opposite direction).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// Compares two planes component-wise within the given tolerances.
    pub fn epsilon_eq(&self, other: &Plane, normal_epsilon: f64, dist_epsilon: f64) -> bool {
        (self.dist - other.dist).abs() <= dist_epsilon
            && (self.normal - other.normal)
                .iter()
                .all(|d| d.abs() <= normal_epsilon)
    }

    /// Returns the axis (0, 1, 2) the normal is closest to.
    pub fn dominant_axis(&self) -> usize {
        self.normal.iamax()
    }

    /// Classifies the plane for the output plane lump.
    pub fn plane_type(&self) -> PlaneType {
        for (axis, plane_type) in [PlaneType::X, PlaneType::Y, PlaneType::Z].into_iter().enumerate() {
            if self.normal[axis].abs() == 1.0 {
                return plane_type;
            }
        }

        match self.dominant_axis() {
            0 => PlaneType::AnyX,
            1 => PlaneType::AnyY,
            _ => PlaneType::AnyZ,
        }
    }

    /// Returns `true` if the normal component of the dominant axis is positive.
    ///
    /// The plane table stores this orientation at the even index of each pair.
    pub fn is_canonical(&self) -> bool {
        self.normal[self.dominant_axis()] > 0.0
    }

    /// Computes the intersection of a line segment with the plane.
    ///
    /// Returns `Some((t, point))` where:
    /// - `t` is the interpolation parameter (0.0 = start, 1.0 = end)
    /// - `point` is the intersection point
    ///
    /// Returns `None` if the segment is parallel to the plane or doesn't intersect.
    pub fn intersect_segment(
        &self,
        start: &Point3<f64>,
        end: &Point3<f64>,
    ) -> Option<(f64, Point3<f64>)> {
        let direction = end - start;
        let denom = self.normal.dot(&direction);

        // Segment is parallel to plane
        if denom.abs() < f64::EPSILON {
            return None;
        }

        let t = (self.dist - self.normal.dot(&start.coords)) / denom;

        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        let mut point = start + direction * t;

        // keep axial coordinates exact so axial faces stay on their plane
        for axis in 0..3 {
            if self.normal[axis] == 1.0 {
                point[axis] = self.dist;
            } else if self.normal[axis] == -1.0 {
                point[axis] = -self.dist;
            }
        }

        Some((t, point))
    }
}

impl Neg for Plane {
    type Output = Plane;

    fn neg(self) -> Plane {
        self.flipped()
    }
}

/// Snaps every component that is within `epsilon` of an integer to that integer.
pub fn snap_vector(mut v: Vector3<f64>, epsilon: f64) -> Vector3<f64> {
    for c in v.iter_mut() {
        let rounded = c.round();
        if (*c - rounded).abs() < epsilon {
            *c = rounded;
        }
    }
    v
}
