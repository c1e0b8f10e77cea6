//! Face polygons ("windings") and plane clipping.

use nalgebra::{Point3, Vector3};

use crate::{Aabb, Classification, Plane, PlaneSide};

/// A convex face polygon in 3D space, defined by an ordered list of points.
///
/// Points run clockwise when viewed from the front of the supporting plane,
/// the same order map files use for their three plane points. With that
/// order `normal × edge` points out of the polygon for every edge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Winding {
    points: Vec<Point3<f64>>,
}

impl Winding {
    /// Creates a winding from a list of points.
    ///
    /// No validation is performed; see [`crate::face::check_face`].
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Creates a huge square on `plane`, `extent` units from its center in
    /// every direction. Clipping it by the other planes of a brush yields
    /// the face polygon.
    pub fn from_plane(plane: &Plane, extent: f64) -> Self {
        let normal = plane.normal();

        let mut up = if plane.dominant_axis() == 2 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        up -= normal * up.dot(&normal);
        up.normalize_mut();

        let origin = Point3::from(normal * plane.dist());
        let right = up.cross(&normal);

        let up = up * extent;
        let right = right * extent;

        Self {
            points: vec![
                origin - right + up,
                origin + right + up,
                origin + right - up,
                origin - right - up,
            ],
        }
    }

    /// Returns the points of the winding.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the winding has been cleared (discarded).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Discards every point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Removes the point at `index`, shifting the following points down.
    pub fn remove(&mut self, index: usize) -> Point3<f64> {
        self.points.remove(index)
    }

    /// Computes the (unnormalized) normal vector from the first three points.
    pub fn normal(&self) -> Vector3<f64> {
        let a = &self.points[0];
        let b = &self.points[1];
        let c = &self.points[2];
        (a - b).cross(&(c - b))
    }

    /// Returns the plane that this winding lies on.
    ///
    /// Returns `None` for fewer than three points or collinear leading points.
    pub fn plane(&self) -> Option<Plane> {
        if self.points.len() < 3 {
            return None;
        }
        Plane::from_map_points(self.points[0], self.points[1], self.points[2])
    }

    /// Returns the bounding box of the points.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    /// Classifies this winding relative to a plane.
    pub fn classify(&self, plane: &Plane, epsilon: f64) -> Classification {
        let mut front = 0;
        let mut back = 0;
        let mut on_plane = 0;

        for point in &self.points {
            match plane.classify_point_with_epsilon(point, epsilon) {
                PlaneSide::Front => front += 1,
                PlaneSide::Back => back += 1,
                PlaneSide::OnPlane => on_plane += 1,
            }
        }

        if on_plane == self.points.len() {
            Classification::Coplanar
        } else if back == 0 {
            Classification::Front
        } else if front == 0 {
            Classification::Back
        } else {
            Classification::Spanning
        }
    }

    /// Keeps the part of the winding behind `plane`.
    pub fn clip_back(&self, plane: &Plane, epsilon: f64) -> Option<Winding> {
        match self.classify(plane, epsilon) {
            // coplanar windings belong to another face of the brush
            Classification::Front | Classification::Coplanar => None,
            Classification::Back => Some(self.clone()),
            Classification::Spanning => split_winding(self, plane, epsilon).1,
        }
    }
}

/// Splits a spanning winding into front and back parts.
///
/// Walks the winding edges and builds two point lists, adding intersection
/// points where edges cross the plane.
fn split_winding(winding: &Winding, plane: &Plane, epsilon: f64) -> (Option<Winding>, Option<Winding>) {
    let points = winding.points();
    let n = points.len();

    let mut front_points = Vec::with_capacity(n + 1);
    let mut back_points = Vec::with_capacity(n + 1);

    let sides: Vec<PlaneSide> = points
        .iter()
        .map(|p| plane.classify_point_with_epsilon(p, epsilon))
        .collect();

    for i in 0..n {
        let current = points[i];
        let current_side = sides[i];
        let next_idx = (i + 1) % n;
        let next = points[next_idx];
        let next_side = sides[next_idx];

        match current_side {
            PlaneSide::Front => front_points.push(current),
            PlaneSide::Back => back_points.push(current),
            PlaneSide::OnPlane => {
                front_points.push(current);
                back_points.push(current);
            }
        }

        let crosses = matches!(
            (current_side, next_side),
            (PlaneSide::Front, PlaneSide::Back) | (PlaneSide::Back, PlaneSide::Front)
        );

        if crosses {
            if let Some((_, intersection)) = plane.intersect_segment(&current, &next) {
                front_points.push(intersection);
                back_points.push(intersection);
            }
        }
    }

    let front = (front_points.len() >= 3).then(|| Winding::new(front_points));
    let back = (back_points.len() >= 3).then(|| Winding::new(back_points));

    (front, back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ON_EPSILON;

    fn make_square(size: f64) -> Winding {
        // clockwise seen from +Z
        Winding::new(vec![
            Point3::new(size, size, 0.0),
            Point3::new(size, -size, 0.0),
            Point3::new(-size, -size, 0.0),
            Point3::new(-size, size, 0.0),
        ])
    }

    #[test]
    fn from_plane_lies_on_plane() {
        let plane = Plane::new(Vector3::new(1.0, 2.0, 3.0), 10.0);
        let w = Winding::from_plane(&plane, 1024.0);
        assert_eq!(w.len(), 4);
        for p in w.points() {
            assert!(plane.signed_distance(p).abs() < 1e-6);
        }
    }

    #[test]
    fn from_plane_orientation_matches_plane() {
        let plane = Plane::new(Vector3::new(0.0, 0.0, 1.0), 5.0);
        let w = Winding::from_plane(&plane, 64.0);
        let wplane = w.plane().unwrap();
        assert!(wplane.epsilon_eq(&plane, 1e-9, 1e-9));
    }

    #[test]
    fn plane_of_square() {
        let plane = make_square(1.0).plane().unwrap();
        assert_eq!(plane.normal(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(plane.dist(), 0.0);
    }

    #[test]
    fn classify_square() {
        let w = make_square(1.0);
        let up = Plane::new(Vector3::new(0.0, 0.0, 1.0), -1.0);
        let across = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0);
        let same = Plane::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        assert_eq!(w.classify(&up, ON_EPSILON), Classification::Front);
        assert_eq!(w.classify(&up.flipped(), ON_EPSILON), Classification::Back);
        assert_eq!(w.classify(&across, ON_EPSILON), Classification::Spanning);
        assert_eq!(w.classify(&same, ON_EPSILON), Classification::Coplanar);
    }

    #[test]
    fn split_spanning_square() {
        let w = make_square(1.0);
        let across = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0);
        let (front, back) = split_winding(&w, &across, ON_EPSILON);
        let front = front.unwrap();
        let back = back.unwrap();
        assert_eq!(w.clip_back(&across, ON_EPSILON), Some(back.clone()));
        assert_eq!(front.len(), 4);
        assert_eq!(back.len(), 4);
        assert!(front.points().iter().all(|p| p.x >= 0.0));
        assert!(back.points().iter().all(|p| p.x <= 0.0));
    }

    #[test]
    fn clip_back_discards_front_and_coplanar() {
        let w = make_square(1.0);
        let same = Plane::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let below = Plane::new(Vector3::new(0.0, 0.0, 1.0), -1.0);
        assert!(w.clip_back(&same, ON_EPSILON).is_none());
        assert!(w.clip_back(&below, ON_EPSILON).is_none());
        assert_eq!(w.clip_back(&below.flipped(), ON_EPSILON), Some(w.clone()));
    }

    #[test]
    fn remove_shifts_points() {
        let mut w = make_square(1.0);
        let removed = w.remove(1);
        assert_eq!(removed, Point3::new(1.0, -1.0, 0.0));
        assert_eq!(w.len(), 3);
        assert_eq!(w.points()[1], Point3::new(-1.0, -1.0, 0.0));
    }

    #[test]
    fn bounds_of_square() {
        let w = make_square(2.0);
        assert_eq!(w.bounds().mins, Point3::new(-2.0, -2.0, 0.0));
        assert_eq!(w.bounds().maxs, Point3::new(2.0, 2.0, 0.0));
    }
}
