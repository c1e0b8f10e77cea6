//! Collision brush export.
//!
//! Box traces expand each brush by the size of the box. That only works if
//! every brush has a plane for each axial direction and for each edge that
//! would otherwise leave a gap, so those bevel planes are added on export.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::{snap_vector, Brush, Plane, PlaneTable, PlaneType, DIST_EPSILON, NORMAL_EPSILON};

/// Points further than this in front of a candidate bevel reject it.
const BEVEL_EPSILON: f64 = 0.1;

/// One plane of a beveled brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BevelPlane {
    /// Plane table index.
    pub plane_num: usize,
    /// The brush side the plane came from, `None` for added bevels.
    pub side: Option<usize>,
}

impl BevelPlane {
    /// Texture info for the exported side. Added bevels use the first side's.
    pub fn texinfo(&self, brush: &Brush) -> usize {
        let side = self.side.unwrap_or(0);
        brush.sides.get(side).map_or(0, |s| s.texinfo)
    }
}

/// Returns the planes of `brush` plus the bevels it needs.
///
/// The first six entries are always the axial planes in the order -X, +X,
/// -Y, +Y, -Z, +Z. Missing axial planes are added at the brush bounds. Edge
/// bevels follow the remaining face planes. New planes are added to `planes`.
pub fn add_brush_bevels(brush: &Brush, planes: &mut PlaneTable) -> Vec<BevelPlane> {
    let mut result: Vec<BevelPlane> = brush
        .sides
        .iter()
        .enumerate()
        .map(|(i, side)| BevelPlane {
            plane_num: side.plane_num,
            side: Some(i),
        })
        .collect();

    let mut order = 0;
    for axis in 0..3 {
        for dir in [-1.0, 1.0] {
            let found = result
                .iter()
                .position(|b| planes.get_plane(b.plane_num).normal()[axis] == dir);

            let i = match found {
                Some(i) => i,
                None => {
                    let mut normal = Vector3::zeros();
                    normal[axis] = dir;
                    let dist = if dir > 0.0 {
                        brush.bounds.maxs[axis]
                    } else {
                        -brush.bounds.mins[axis]
                    };
                    result.push(BevelPlane {
                        plane_num: planes.add_or_find_plane(&Plane::new(normal, dist)),
                        side: None,
                    });
                    result.len() - 1
                }
            };

            // keep the axial planes in canonical order
            if i != order {
                result.swap(i, order);
            }
            order += 1;
        }
    }

    if result.len() == 6 {
        // pure axial
        return result;
    }

    let edges_to_test = result.len();
    for entry in 6..edges_to_test {
        let Some(side) = result[entry].side else {
            continue;
        };
        let points = brush.sides[side].winding.points();

        for (j, point) in points.iter().enumerate() {
            let next = &points[(j + 1) % points.len()];
            let mut vec = point - next;
            if vec.normalize_mut() < 0.5 {
                continue;
            }
            let vec = snap_vector(vec, NORMAL_EPSILON);
            if vec.iter().any(|c| *c == -1.0 || *c == 1.0) {
                // axial edges are covered by the axial planes
                continue;
            }

            // try the six slanted axials through this edge
            for axis in 0..3 {
                for dir in [-1.0, 1.0] {
                    let mut axis_dir = Vector3::zeros();
                    axis_dir[axis] = dir;
                    let mut normal = vec.cross(&axis_dir);
                    if normal.normalize_mut() < 0.5 {
                        continue;
                    }
                    let current = Plane::new(normal, point.coords.dot(&normal));

                    if is_edge_bevel(brush, &current, planes) {
                        result.push(BevelPlane {
                            plane_num: planes.add_or_find_plane(&current),
                            side: None,
                        });
                    }
                }
            }
        }
    }

    result
}

/// A candidate is a bevel if it is not a face plane and every face lies
/// behind it.
fn is_edge_bevel(brush: &Brush, candidate: &Plane, planes: &PlaneTable) -> bool {
    brush.sides.iter().all(|side| {
        let plane = planes.get_plane(side.plane_num);
        !candidate.epsilon_eq(plane, NORMAL_EPSILON, DIST_EPSILON)
            && side
                .winding
                .points()
                .iter()
                .all(|p| candidate.signed_distance(p) <= BEVEL_EPSILON)
    })
}

/// An exported plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DPlane {
    pub normal: [f32; 3],
    pub dist: f32,
    pub kind: PlaneType,
}

/// An exported brush, referencing a run of sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DBrush {
    pub first_side: usize,
    pub num_sides: usize,
    pub contents: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DBrushSide {
    /// Index into [`CollisionLump::planes`].
    pub plane: usize,
    /// Index into [`CollisionLump::texinfos`].
    pub texinfo: usize,
}

/// Output of the collision brush export, accumulated over all models.
#[derive(Debug, Clone, Default)]
pub struct CollisionLump {
    pub planes: Vec<DPlane>,
    /// Map texinfo index of each exported texinfo.
    pub texinfos: Vec<usize>,
    pub brushes: Vec<DBrush>,
    pub sides: Vec<DBrushSide>,
    exported_planes: HashMap<usize, usize>,
    exported_texinfos: HashMap<usize, usize>,
}

impl CollisionLump {
    /// Returns the output index of a plane table entry, exporting it once.
    pub fn export_plane(&mut self, plane_num: usize, planes: &PlaneTable) -> usize {
        if let Some(&index) = self.exported_planes.get(&plane_num) {
            return index;
        }
        let plane = planes.get_plane(plane_num);
        let normal = plane.normal();
        let index = self.planes.len();
        self.planes.push(DPlane {
            normal: [normal.x as f32, normal.y as f32, normal.z as f32],
            dist: plane.dist() as f32,
            kind: plane.plane_type(),
        });
        self.exported_planes.insert(plane_num, index);
        index
    }

    /// Returns the output index of a map texinfo, exporting it once.
    pub fn export_texinfo(&mut self, texinfo: usize) -> usize {
        if let Some(&index) = self.exported_texinfos.get(&texinfo) {
            return index;
        }
        let index = self.texinfos.len();
        self.texinfos.push(texinfo);
        self.exported_texinfos.insert(texinfo, index);
        index
    }
}

/// Exports the brushes of one model with their bevels.
pub fn export_brush_list(brushes: &[Brush], planes: &mut PlaneTable, lump: &mut CollisionLump) {
    log::debug!("---- export_brush_list ----");

    let mut total_sides = 0;

    for brush in brushes {
        let bevels = add_brush_bevels(brush, planes);
        let first_side = lump.sides.len();

        for bevel in &bevels {
            let plane = lump.export_plane(bevel.plane_num, planes);
            let texinfo = lump.export_texinfo(bevel.texinfo(brush));
            lump.sides.push(DBrushSide { plane, texinfo });
        }

        lump.brushes.push(DBrush {
            first_side,
            num_sides: bevels.len(),
            contents: brush.contents.native,
        });
        total_sides += bevels.len();
    }

    log::info!("{:8} total brushes", brushes.len());
    log::info!("{:8} total brush sides", total_sides);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{load_brush, BrushSource};
    use crate::contents::ContentFlags;
    use crate::map::{FacePlane, MapBrush};
    use crate::{Hull, Options};

    fn make_brush(planes: &mut PlaneTable, faces: &[(Vector3<f64>, f64)], texinfos: &[usize]) -> Brush {
        let sides: Vec<FacePlane> = faces
            .iter()
            .zip(texinfos)
            .map(|(&(normal, dist), &texinfo)| FacePlane {
                plane: Plane::new(normal, dist),
                texinfo,
                contents: ContentFlags::new(0),
            })
            .collect();
        let mapbrush = MapBrush::from_planes(planes, &sides, 65536.0, 1);
        load_brush(
            &mapbrush,
            BrushSource { entity: 0, brush: 0 },
            ContentFlags::new(-2),
            Hull::Draw,
            planes,
            &Options::default(),
        )
        .unwrap()
        .unwrap()
    }

    fn make_cube(planes: &mut PlaneTable) -> Brush {
        let faces = [
            (Vector3::new(0.0, 0.0, 1.0), 16.0),
            (Vector3::new(0.0, 0.0, -1.0), 16.0),
            (Vector3::new(1.0, 0.0, 0.0), 16.0),
            (Vector3::new(-1.0, 0.0, 0.0), 16.0),
            (Vector3::new(0.0, 1.0, 0.0), 16.0),
            (Vector3::new(0.0, -1.0, 0.0), 16.0),
        ];
        make_brush(planes, &faces, &[1, 2, 3, 4, 5, 6])
    }

    fn axial_normals(result: &[BevelPlane], planes: &PlaneTable) -> Vec<Vector3<f64>> {
        result[..6]
            .iter()
            .map(|b| planes.get_plane(b.plane_num).normal())
            .collect()
    }

    fn canonical_axials() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn cube_needs_no_bevels() {
        let mut planes = PlaneTable::new();
        let cube = make_cube(&mut planes);
        let count = planes.len();

        let result = add_brush_bevels(&cube, &mut planes);
        assert_eq!(result.len(), 6);
        assert_eq!(planes.len(), count);
        assert_eq!(axial_normals(&result, &planes), canonical_axials());
        assert!(result.iter().all(|b| b.side.is_some()));
    }

    #[test]
    fn wedge_gets_missing_axials() {
        let mut planes = PlaneTable::new();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let faces = [
            (Vector3::new(-1.0, 0.0, 0.0), 0.0),
            (Vector3::new(0.0, -1.0, 0.0), 0.0),
            (Vector3::new(0.0, 1.0, 0.0), 32.0),
            (Vector3::new(0.0, 0.0, -1.0), 0.0),
            (Vector3::new(s, 0.0, s), 32.0 * s),
        ];
        let wedge = make_brush(&mut planes, &faces, &[7, 8, 8, 8, 9]);

        let result = add_brush_bevels(&wedge, &mut planes);
        assert_eq!(result.len(), 7);
        assert_eq!(axial_normals(&result, &planes), canonical_axials());
        assert_eq!(result[1].side, None);
        assert_eq!(result[5].side, None);
        assert_eq!(result[6].side, Some(4));

        let top = planes.get_plane(result[5].plane_num);
        assert_eq!(top.dist(), wedge.bounds.maxs.z);
        assert_eq!(result[5].texinfo(&wedge), 7);
    }

    #[test]
    fn tetrahedron_gets_edge_bevels() {
        let mut planes = PlaneTable::new();
        let t = 1.0 / 3.0_f64.sqrt();
        let faces = [
            (Vector3::new(-1.0, 0.0, 0.0), 0.0),
            (Vector3::new(0.0, -1.0, 0.0), 0.0),
            (Vector3::new(0.0, 0.0, -1.0), 0.0),
            (Vector3::new(t, t, t), 32.0 * t),
        ];
        let tetra = make_brush(&mut planes, &faces, &[1, 1, 1, 2]);

        let result = add_brush_bevels(&tetra, &mut planes);
        assert_eq!(result.len(), 10);
        assert_eq!(axial_normals(&result, &planes), canonical_axials());
        assert_eq!(result[6].side, Some(3));

        for bevel in &result[7..] {
            assert_eq!(bevel.side, None);
            let plane = planes.get_plane(bevel.plane_num);
            assert_eq!(plane.normal().iter().filter(|c| **c == 0.0).count(), 1);
            for side in &tetra.sides {
                for p in side.winding.points() {
                    assert!(plane.signed_distance(p) <= BEVEL_EPSILON);
                }
            }
        }
    }

    #[test]
    fn export_shares_planes_and_texinfos() {
        let mut planes = PlaneTable::new();
        let cube = make_cube(&mut planes);
        let mut lump = CollisionLump::default();

        export_brush_list(&[cube.clone(), cube], &mut planes, &mut lump);

        assert_eq!(lump.brushes.len(), 2);
        assert_eq!(lump.brushes[1], DBrush { first_side: 6, num_sides: 6, contents: -2 });
        assert_eq!(lump.sides.len(), 12);
        assert_eq!(lump.planes.len(), 6);
        assert_eq!(lump.texinfos.len(), 6);
        assert_eq!(lump.sides[0..6], lump.sides[6..12]);
        assert!(lump.planes.iter().all(|p| p.kind.is_axial()));
    }
}
