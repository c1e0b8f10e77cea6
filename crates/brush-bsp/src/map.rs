//! Parsed map data: entities, their key/value pairs and source brushes.
//!
//! Nothing here is modified by brush loading except each entity's output
//! `brushes` list and `bounds`, which are rebuilt for every hull.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::contents::{ContentFlags, SurfaceFlags};
use crate::{Aabb, Brush, Plane, PlaneTable, Winding, ON_EPSILON};

/// Entity classes whose brushes are merged into the world and which are
/// removed from the output.
const WORLD_BRUSH_CLASSES: [&str; 5] = [
    "func_group",
    "func_detail",
    "func_detail_illusionary",
    "func_detail_wall",
    "func_detail_fence",
];

/// Entity classes whose brushes are merged into the world but which stay in
/// the output.
const NON_REMOVED_WORLD_BRUSH_CLASSES: [&str; 2] = ["func_areaportal", "func_illusionary_visblocker"];

/// Ordered key/value pairs of one entity. Key lookup ignores case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityPairs {
    pairs: Vec<(String, String)>,
}

impl EntityPairs {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, key: &str) -> Option<usize> {
        self.pairs.iter().position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Returns the value for `key`, or an empty string.
    pub fn get(&self, key: &str) -> &str {
        self.find(key).map_or("", |i| self.pairs[i].1.as_str())
    }

    /// Returns the value for `key` as an integer, `0` if missing or unparsable.
    /// Fractional values are truncated.
    pub fn get_int(&self, key: &str) -> i32 {
        let value = self.get(key).trim();
        value
            .parse::<i32>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(|v| v as i32))
            .unwrap_or(0)
    }

    /// Returns the value for `key` as a float, `0.0` if missing or unparsable.
    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key).trim().parse().unwrap_or(0.0)
    }

    /// Parses up to three whitespace separated numbers. Missing components
    /// are zero.
    pub fn get_vector(&self, key: &str) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        for (i, part) in self.get(key).split_whitespace().take(3).enumerate() {
            v[i] = part.parse().unwrap_or(0.0);
        }
        v
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Sets `key`, replacing an existing value in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.find(key) {
            Some(i) => self.pairs[i].1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EntityPairs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut pairs = EntityPairs::new();
        for (k, v) in iter {
            pairs.set(&k.into(), v);
        }
        pairs
    }
}

/// Texture projection info, reduced to what classification needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TexInfo {
    pub name: String,
    pub flags: SurfaceFlags,
}

impl TexInfo {
    /// Creates texture info, deriving the extended flags from the name.
    pub fn new(name: impl Into<String>, native_flags: i32) -> Self {
        let name = name.into();
        let flags = SurfaceFlags::for_texture(&name, native_flags);
        Self { name, flags }
    }
}

/// One face of a source brush.
#[derive(Debug, Clone)]
pub struct MapFace {
    /// Index into the plane table, already oriented outwards.
    pub plane_num: usize,
    pub texinfo: usize,
    /// Contents bits as written in the map (only meaningful for some games).
    pub contents: ContentFlags,
    pub winding: Winding,
    /// Synthetic face that is regenerated downstream.
    pub bevel: bool,
    pub line: usize,
}

/// One face given as a plane, before its polygon is known.
#[derive(Debug, Clone, Copy)]
pub struct FacePlane {
    /// Outward facing plane.
    pub plane: Plane,
    pub texinfo: usize,
    pub contents: ContentFlags,
}

/// A source brush: the faces as they appear in the map.
#[derive(Debug, Clone)]
pub struct MapBrush {
    pub faces: Vec<MapFace>,
    pub bounds: Aabb,
    pub line: usize,
}

impl MapBrush {
    /// Creates a brush from faces with known windings.
    pub fn from_faces(faces: Vec<MapFace>, line: usize) -> Self {
        let mut bounds = Aabb::empty();
        for face in &faces {
            bounds.merge(&face.winding.bounds());
        }
        Self { faces, bounds, line }
    }

    /// Builds the face polygons of a brush given by its bounding planes.
    ///
    /// Each face starts as a square of half-size `extent` on its plane and is
    /// clipped by every other plane. Faces clipped away entirely, and repeats
    /// of an earlier plane, are dropped with a warning.
    pub fn from_planes(planes: &mut PlaneTable, sides: &[FacePlane], extent: f64, line: usize) -> Self {
        let mut faces = Vec::with_capacity(sides.len());

        for (i, side) in sides.iter().enumerate() {
            let plane_num = planes.add_or_find_plane(&side.plane);
            let plane = *planes.get_plane(plane_num);

            if sides[..i]
                .iter()
                .any(|other| planes.find_plane(&other.plane) == Some(plane_num))
            {
                log::warn!("line {line}: brush with duplicate plane");
                continue;
            }

            let mut winding = Some(Winding::from_plane(&plane, extent));
            for (j, other) in sides.iter().enumerate() {
                if i == j {
                    continue;
                }
                let clip_num = planes.add_or_find_plane(&other.plane);
                // a repeat of this face's own plane would clip it away entirely
                if clip_num == plane_num {
                    continue;
                }
                let Some(w) = winding.take() else {
                    break;
                };
                winding = w.clip_back(planes.get_plane(clip_num), ON_EPSILON);
            }

            match winding {
                Some(winding) => faces.push(MapFace {
                    plane_num,
                    texinfo: side.texinfo,
                    contents: side.contents,
                    winding,
                    bevel: false,
                    line,
                }),
                None => log::warn!("line {line}: brush plane with no face"),
            }
        }

        Self::from_faces(faces, line)
    }
}

/// An entity and the brushes built for it.
#[derive(Debug, Clone, Default)]
pub struct MapEntity {
    pub epairs: EntityPairs,
    pub mapbrushes: Vec<MapBrush>,
    /// Brushes loaded for the hull currently being built.
    pub brushes: Vec<Brush>,
    /// Union of the bounds of everything loaded for the current hull.
    pub bounds: Aabb,
    /// Model index, reserved the first time the entity is processed.
    pub output_model_number: Option<usize>,
    /// Set once the entity has been numbered as an area portal.
    pub area_portal_num: Option<usize>,
}

impl MapEntity {
    pub fn new(epairs: EntityPairs, mapbrushes: Vec<MapBrush>) -> Self {
        Self {
            epairs,
            mapbrushes,
            ..Default::default()
        }
    }

    pub fn classname(&self) -> &str {
        self.epairs.get("classname")
    }

    pub fn is_classname(&self, classname: &str) -> bool {
        self.classname().eq_ignore_ascii_case(classname)
    }

    /// `func_group` and the `func_detail` family: merged into the world and
    /// removed from the output.
    pub fn is_world_brush_entity(&self) -> bool {
        WORLD_BRUSH_CLASSES.iter().any(|c| self.is_classname(c))
    }

    /// Merged into the world but kept in the output.
    pub fn is_non_removed_world_brush_entity(&self) -> bool {
        NON_REMOVED_WORLD_BRUSH_CLASSES
            .iter()
            .any(|c| self.is_classname(c))
    }

    /// `rotate_*` entities, whose origin comes from their target.
    pub fn is_rotate_entity(&self) -> bool {
        self.classname()
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("rotate_"))
    }

    /// Logs every key/value pair at debug level.
    pub fn log_pairs(&self) {
        for (key, value) in self.epairs.iter() {
            log::debug!("{:>20} : {}", key, value);
        }
    }
}

/// A whole map. Entity 0 is the world.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub entities: Vec<MapEntity>,
    pub texinfos: Vec<TexInfo>,
    pub planes: PlaneTable,
    /// Number of area portals handed out so far.
    pub num_area_portals: usize,
}

pub const WORLD_ENTITY: usize = 0;

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `texinfo`, adding it if no equal entry exists.
    pub fn add_texinfo(&mut self, texinfo: TexInfo) -> usize {
        if let Some(index) = self.texinfos.iter().position(|t| *t == texinfo) {
            return index;
        }
        self.texinfos.push(texinfo);
        self.texinfos.len() - 1
    }

    pub fn add_entity(&mut self, entity: MapEntity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Returns the index of the first entity whose `targetname` is `target`.
    pub fn find_target_entity(&self, target: &str) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.epairs.get("targetname").eq_ignore_ascii_case(target))
    }

    /// # Panics
    /// Panics if the map has no entities.
    pub fn world(&self) -> &MapEntity {
        &self.entities[WORLD_ENTITY]
    }
}
