//! Axis-aligned bounding boxes.

use nalgebra::Point3;

/// An axis-aligned bounding box.
///
/// The default box is empty (inverted infinite bounds), so unioning into it
/// yields the other operand unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub mins: Point3<f64>,
    pub maxs: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    #[inline]
    pub const fn new(mins: Point3<f64>, maxs: Point3<f64>) -> Self {
        Self { mins, maxs }
    }

    pub fn empty() -> Self {
        Self {
            mins: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            maxs: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Builds the smallest box containing every point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    /// Returns `true` if no point was ever added.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.mins[axis] > self.maxs[axis])
    }

    pub fn add_point(&mut self, p: &Point3<f64>) {
        self.mins = self.mins.inf(p);
        self.maxs = self.maxs.sup(p);
    }

    /// Returns the union of both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }

    /// Grows this box to contain `other`.
    pub fn merge(&mut self, other: &Aabb) {
        *self = self.union(other);
    }
}
