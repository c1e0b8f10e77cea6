//! Brushes built from map brushes for a single hull.

use crate::contents::ContentFlags;
use crate::face::check_face;
use crate::map::{MapBrush, TexInfo};
use crate::{Aabb, CompileError, GamePolicy, Hull, Options, PlaneTable, Result, Winding};

/// One face of a [`Brush`].
#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    pub winding: Winding,
    /// Plane table index. The plane already faces out of the brush, so no
    /// separate side bit is kept.
    pub plane_num: usize,
    pub texinfo: usize,
    pub bevel: bool,
    pub lmshift: u32,
}

/// Where a brush came from: entity index and brush index inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrushSource {
    pub entity: usize,
    pub brush: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub sides: Vec<Side>,
    pub bounds: Aabb,
    pub contents: ContentFlags,
    pub source: BrushSource,
    /// Entity index of the owning `func_areaportal`, if any.
    pub func_areaportal: Option<usize>,
    pub lmshift: u32,
}

impl Brush {
    /// Recomputes the bounds from the side windings.
    pub fn update_bounds(&mut self) {
        self.bounds = Aabb::empty();
        for side in &self.sides {
            self.bounds.merge(&side.winding.bounds());
        }
    }
}

/// Two faces of one brush that disagree on contents.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedContents {
    pub base: ContentFlags,
    pub other: ContentFlags,
    pub line: usize,
}

/// Result of classifying a brush.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedContents {
    pub contents: ContentFlags,
    /// First disagreement found, if any.
    pub mixed: Option<MixedContents>,
}

/// Derives the contents of a whole brush from its faces.
///
/// Faces with empty contents are ignored. The first remaining face decides;
/// a later face of a different type is reported once and otherwise ignored.
pub fn brush_get_contents(
    policy: &dyn GamePolicy,
    mapbrush: &MapBrush,
    texinfos: &[TexInfo],
) -> Result<ClassifiedContents> {
    let mut base: Option<ContentFlags> = None;
    let mut mixed = None;

    for face in &mapbrush.faces {
        let texinfo = &texinfos[face.texinfo];
        let contents = policy.face_get_contents(&texinfo.name, &texinfo.flags, &face.contents);

        if policy.is_empty(&contents) {
            continue;
        }

        let Some(first) = base else {
            base = Some(contents);
            continue;
        };

        if !policy.types_equal(&contents, &first) {
            log::warn!(
                "mixed face contents ({} != {}) at line {}",
                policy.contents_to_string(&first),
                policy.contents_to_string(&contents),
                face.line
            );
            mixed = Some(MixedContents {
                base: first,
                other: contents,
                line: face.line,
            });
            break;
        }
    }

    let contents = base.unwrap_or_else(|| policy.create_empty_contents());
    if !policy.is_valid(&contents, false) {
        return Err(CompileError::InvalidContents {
            line: mapbrush.line,
            contents: policy.contents_to_string(&contents),
        });
    }

    Ok(ClassifiedContents { contents, mixed })
}

/// Converts a map brush into a [`Brush`] for `hull`.
///
/// Bevel faces are skipped and clip hulls lose their texture info. Every side
/// is validated; sides whose winding gets discarded stay in the list. The
/// bounds are the map brush bounds, not recomputed from the validated sides.
///
/// Returns `None` when no side is left.
pub fn load_brush(
    mapbrush: &MapBrush,
    source: BrushSource,
    contents: ContentFlags,
    hull: Hull,
    planes: &PlaneTable,
    options: &Options,
) -> Result<Option<Brush>> {
    let mut sides = Vec::with_capacity(mapbrush.faces.len());

    for face in mapbrush.faces.iter().filter(|f| !f.bevel) {
        let mut side = Side {
            winding: face.winding.clone(),
            plane_num: face.plane_num,
            texinfo: if hull.is_clip() { 0 } else { face.texinfo },
            bevel: face.bevel,
            lmshift: 0,
        };
        check_face(&mut side.winding, planes.get_plane(face.plane_num), face.line, options)?;
        sides.push(side);
    }

    if sides.is_empty() {
        return Ok(None);
    }

    Ok(Some(Brush {
        sides,
        bounds: mapbrush.bounds,
        contents,
        source,
        func_areaportal: None,
        lmshift: 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::q1;
    use crate::map::{FacePlane, MapFace};
    use crate::{GameId, Plane, QuakePolicy};
    use nalgebra::{Point3, Vector3};

    fn make_cube(planes: &mut PlaneTable, texinfos: [usize; 6]) -> MapBrush {
        let mut sides = Vec::new();
        for axis in 0..3 {
            for dir in [1.0, -1.0] {
                let mut n = Vector3::zeros();
                n[axis] = dir;
                sides.push(FacePlane {
                    plane: Plane::new(n, 32.0),
                    texinfo: texinfos[sides.len()],
                    contents: ContentFlags::new(0),
                });
            }
        }
        MapBrush::from_planes(planes, &sides, 65536.0, 10)
    }

    fn make_texinfos() -> Vec<TexInfo> {
        vec![
            TexInfo::new("wall", 0),
            TexInfo::new("*water1", 0),
            TexInfo::new("skip", 0),
            TexInfo::new("*lava", 0),
        ]
    }

    #[test]
    fn uniform_brush_is_solid() {
        let policy = QuakePolicy::new(GameId::Quake);
        let mut planes = PlaneTable::new();
        let brush = make_cube(&mut planes, [0; 6]);
        let classified = brush_get_contents(&policy, &brush, &make_texinfos()).unwrap();
        assert!(policy.is_solid(&classified.contents));
        assert!(classified.mixed.is_none());
    }

    #[test]
    fn empty_faces_are_ignored() {
        let policy = QuakePolicy::new(GameId::Quake);
        let mut planes = PlaneTable::new();
        let brush = make_cube(&mut planes, [2, 2, 1, 1, 2, 1]);
        let classified = brush_get_contents(&policy, &brush, &make_texinfos()).unwrap();
        assert_eq!(classified.contents.native, q1::CONTENTS_WATER);
        assert!(classified.mixed.is_none());
    }

    #[test]
    fn first_face_wins_and_reports_once() {
        let policy = QuakePolicy::new(GameId::Quake);
        let mut planes = PlaneTable::new();
        let brush = make_cube(&mut planes, [2, 1, 0, 3, 0, 3]);
        let classified = brush_get_contents(&policy, &brush, &make_texinfos()).unwrap();
        assert_eq!(classified.contents.native, q1::CONTENTS_WATER);
        let mixed = classified.mixed.unwrap();
        assert_eq!(mixed.other.native, q1::CONTENTS_SOLID);
    }

    #[test]
    fn all_skip_brush_is_invalid() {
        let policy = QuakePolicy::new(GameId::Quake);
        let mut planes = PlaneTable::new();
        let brush = make_cube(&mut planes, [2; 6]);
        let err = brush_get_contents(&policy, &brush, &make_texinfos()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidContents { line: 10, .. }));
    }

    #[test]
    fn load_cube_for_draw_hull() {
        let policy = QuakePolicy::new(GameId::Quake);
        let mut planes = PlaneTable::new();
        let mapbrush = make_cube(&mut planes, [0, 1, 2, 3, 0, 1]);
        let source = BrushSource { entity: 0, brush: 0 };

        let brush = load_brush(
            &mapbrush,
            source,
            policy.create_solid_contents(),
            Hull::Draw,
            &planes,
            &Options::default(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(brush.sides.len(), 6);
        assert!(brush.sides.iter().all(|s| s.winding.len() == 4));
        let texinfos: Vec<usize> = brush.sides.iter().map(|s| s.texinfo).collect();
        assert_eq!(texinfos, vec![0, 1, 2, 3, 0, 1]);
        assert_eq!(brush.bounds, mapbrush.bounds);
    }

    #[test]
    fn clip_hull_strips_texinfo_and_skips_bevels() {
        let mut planes = PlaneTable::new();
        let mut mapbrush = make_cube(&mut planes, [3; 6]);
        mapbrush.faces[5].bevel = true;

        let brush = load_brush(
            &mapbrush,
            BrushSource { entity: 0, brush: 0 },
            ContentFlags::new(q1::CONTENTS_SOLID),
            Hull::Clip(1),
            &planes,
            &Options::default(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(brush.sides.len(), 5);
        assert!(brush.sides.iter().all(|s| s.texinfo == 0));
    }

    #[test]
    fn discarded_sides_are_kept_with_source_bounds() {
        let mut planes = PlaneTable::new();
        let plane_num = planes.add_or_find_plane(&Plane::new(Vector3::new(0.0, 0.0, 1.0), 0.0));
        let face = MapFace {
            plane_num,
            texinfo: 0,
            contents: ContentFlags::new(0),
            winding: Winding::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]),
            bevel: false,
            line: 4,
        };
        let mut mapbrush = MapBrush::from_faces(vec![face], 4);
        let bounds = mapbrush.bounds;

        let brush = load_brush(
            &mapbrush,
            BrushSource { entity: 0, brush: 0 },
            ContentFlags::new(q1::CONTENTS_SOLID),
            Hull::Draw,
            &planes,
            &Options::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(brush.sides.len(), 1);
        assert!(brush.sides[0].winding.is_empty());
        assert_eq!(brush.bounds, bounds);

        mapbrush.faces[0].bevel = true;
        let none = load_brush(
            &mapbrush,
            BrushSource { entity: 0, brush: 0 },
            ContentFlags::new(q1::CONTENTS_SOLID),
            Hull::Draw,
            &planes,
            &Options::default(),
        )
        .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn update_bounds_follows_sides() {
        let mut planes = PlaneTable::new();
        let mapbrush = make_cube(&mut planes, [0; 6]);
        let mut brush = load_brush(
            &mapbrush,
            BrushSource { entity: 0, brush: 0 },
            ContentFlags::new(q1::CONTENTS_SOLID),
            Hull::Draw,
            &planes,
            &Options::default(),
        )
        .unwrap()
        .unwrap();

        brush.sides.truncate(1);
        brush.update_bounds();
        assert_eq!(brush.bounds.mins.x, 32.0);
        assert_eq!(brush.bounds.maxs.x, 32.0);
    }
}
