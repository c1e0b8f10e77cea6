//! Face polygon validation and repair.

use nalgebra::Point3;

use crate::{CompileError, Options, Plane, Result, Winding};

/// A non-fatal problem found while checking a face.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceIssue {
    /// Fewer than three points; the winding was cleared.
    TooFewPoints { count: usize },
    /// A point further than epsilon from the face plane. Left uncorrected.
    OffPlane { point: Point3<f64>, distance: f64 },
    /// An edge shorter than epsilon; one of its points was removed.
    DegenerateEdge { point: Point3<f64>, length: f64 },
    /// A point in front of an edge plane; the winding was cleared.
    NonConvex { point: Point3<f64>, error: f64 },
}

/// Checks a face polygon against its plane, healing degenerate edges.
///
/// On return the winding is either convex with at least three points and no
/// edge shorter than `options.epsilon`, or empty. Each problem is logged and
/// returned. A coordinate outside `options.world_extent` is an error.
///
/// Note: this will not catch zero-area polygons.
pub fn check_face(winding: &mut Winding, plane: &Plane, line: usize, options: &Options) -> Result<Vec<FaceIssue>> {
    let mut issues = Vec::new();
    let epsilon = options.epsilon;
    let facenormal = plane.normal();

    'validate: loop {
        let count = winding.len();
        if count < 3 {
            match winding.points() {
                [a, b] => log::warn!("line {line}: too few points (2): ({a}) ({b})"),
                [a] => log::warn!("line {line}: too few points (1): ({a})"),
                _ => log::warn!("line {line}: too few points ({count})"),
            }
            issues.push(FaceIssue::TooFewPoints { count });
            winding.clear();
            return Ok(issues);
        }

        for i in 0..count {
            let p1 = winding.points()[i];
            let p2 = winding.points()[(i + 1) % count];

            // a point should never lie outside the world
            if let Some(&value) = p1.iter().find(|v| v.abs() > options.world_extent) {
                return Err(CompileError::CoordinateOutOfRange { line, value });
            }

            let distance = plane.signed_distance(&p1);
            if distance.abs() > epsilon {
                log::warn!(
                    "line {line}: point ({:.3} {:.3} {:.3}) off plane by {distance:.4}",
                    p1.x, p1.y, p1.z
                );
                issues.push(FaceIssue::OffPlane { point: p1, distance });
            }

            let edge = p2 - p1;
            let length = edge.norm();
            if length < epsilon {
                log::warn!(
                    "line {line}: healing degenerate edge ({length}) at ({:.3} {:.3} {:.3})",
                    p1.x, p1.y, p1.z
                );
                issues.push(FaceIssue::DegenerateEdge { point: p1, length });
                // the closing edge drops its first point instead of wrapping
                winding.remove(if i + 1 < count { i + 1 } else { i });
                continue 'validate;
            }

            let edgenormal = facenormal.cross(&edge).normalize();
            let edgedist = p1.coords.dot(&edgenormal) + epsilon;

            for (j, point) in winding.points().iter().enumerate() {
                if j == i {
                    continue;
                }
                let dist = point.coords.dot(&edgenormal);
                if dist > edgedist {
                    let error = dist - edgedist;
                    log::warn!("line {line}: found a non-convex face (error size {error}, point: {point})");
                    issues.push(FaceIssue::NonConvex { point: *point, error });
                    winding.clear();
                    return Ok(issues);
                }
            }
        }

        return Ok(issues);
    }
}
