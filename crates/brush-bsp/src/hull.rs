//! Hull passes over the whole map.
//!
//! A [`CompileContext`] owns the map, the game policy and every piece of
//! state shared between entities. For each hull it rebuilds the brush list
//! of every model entity, hands the result to a [`HullVisitor`] (where tree
//! construction plugs in) and frees the brushes again.

use std::fmt;

use crate::bevel::{export_brush_list, CollisionLump};
use crate::bspx::BrushListLump;
use crate::entity::{fix_rotate_origin, load_entity_brushes};
use crate::map::{Map, MapEntity, WORLD_ENTITY};
use crate::{Aabb, Brush, CompileError, GamePolicy, HullSize, Options, PlaneTable, Result};

/// Which hull a pass builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hull {
    /// Every brush, unfiltered. Used for brush list export.
    Collision,
    /// Hull 0, the drawn geometry.
    Draw,
    /// A movement hull, numbered from 1.
    Clip(u8),
}

impl Hull {
    /// Hull for index `n` of a game's hull size table.
    pub fn from_index(n: usize) -> Self {
        match n {
            0 => Hull::Draw,
            n => Hull::Clip(n as u8),
        }
    }

    /// Numeric hull index; the collision pseudo-hull is `-1`.
    pub fn index(self) -> i32 {
        match self {
            Hull::Collision => -1,
            Hull::Draw => 0,
            Hull::Clip(n) => i32::from(n),
        }
    }

    #[inline]
    pub fn is_clip(self) -> bool {
        matches!(self, Hull::Clip(_))
    }
}

impl fmt::Display for Hull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hull::Collision => f.write_str("collision hull"),
            other => write!(f, "hull {}", other.index()),
        }
    }
}

/// Receives the brushes of every model entity after they are loaded.
pub trait HullVisitor {
    /// Called once per model entity and hull. `index` is the entity index.
    fn visit(&mut self, hull: Hull, index: usize, entity: &MapEntity, planes: &PlaneTable);
}

/// The brushes of one entity in one hull, as seen by a [`CollectingVisitor`].
#[derive(Debug, Clone)]
pub struct HullModel {
    pub hull: Hull,
    pub entity: usize,
    pub model: Option<usize>,
    pub brushes: Vec<Brush>,
    pub bounds: Aabb,
}

/// A visitor that keeps a copy of everything it sees.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<HullModel>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[HullModel] {
        &self.collected
    }

    pub fn into_models(self) -> Vec<HullModel> {
        self.collected
    }
}

impl HullVisitor for CollectingVisitor {
    fn visit(&mut self, hull: Hull, index: usize, entity: &MapEntity, _planes: &PlaneTable) {
        self.collected.push(HullModel {
            hull,
            entity: index,
            model: entity.output_model_number,
            brushes: entity.brushes.clone(),
            bounds: entity.bounds,
        });
    }
}

/// A visitor that calls a closure.
pub struct FnVisitor<F>
where
    F: FnMut(Hull, usize, &MapEntity, &PlaneTable),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(Hull, usize, &MapEntity, &PlaneTable),
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> HullVisitor for FnVisitor<F>
where
    F: FnMut(Hull, usize, &MapEntity, &PlaneTable),
{
    fn visit(&mut self, hull: Hull, index: usize, entity: &MapEntity, planes: &PlaneTable) {
        (self.func)(hull, index, entity, planes);
    }
}

/// Everything a compilation reads and writes.
#[derive(Debug)]
pub struct CompileContext {
    pub map: Map,
    pub options: Options,
    pub policy: Box<dyn GamePolicy>,
    /// Models reserved so far.
    pub num_models: usize,
    /// Output of the collision brush export.
    pub collision: CollisionLump,
}

impl CompileContext {
    /// Creates a context using the policy of `options.game`.
    pub fn new(map: Map, options: Options) -> Self {
        let policy = options.game.policy();
        Self::with_policy(map, options, policy)
    }

    pub fn with_policy(map: Map, options: Options, policy: Box<dyn GamePolicy>) -> Self {
        Self {
            map,
            options,
            policy,
            num_models: 0,
            collision: CollisionLump::default(),
        }
    }

    /// The hulls [`CompileContext::create_hulls`] builds, in order.
    pub fn hulls(&self) -> Vec<Hull> {
        let sizes = self.policy.hull_sizes();
        if sizes.is_empty() {
            // the game collides against brushes, not hulls
            vec![Hull::Collision]
        } else if self.options.noclip {
            vec![Hull::Draw]
        } else {
            (0..sizes.len()).map(Hull::from_index).collect()
        }
    }

    /// The box a hull is expanded by, if the game has a size table entry for it.
    pub fn hull_size(&self, hull: Hull) -> Option<HullSize> {
        let index = usize::try_from(hull.index()).ok()?;
        self.policy.hull_sizes().get(index).copied()
    }

    /// Builds every hull of the game, one after another.
    pub fn create_hulls(&mut self, visitor: &mut dyn HullVisitor) -> Result<()> {
        for hull in self.hulls() {
            self.create_single_hull(hull, visitor)?;
        }
        Ok(())
    }

    pub fn create_single_hull(&mut self, hull: Hull, visitor: &mut dyn HullVisitor) -> Result<()> {
        log::info!("Processing {hull}...");
        if let Some(size) = self.hull_size(hull) {
            log::debug!("hull box {:?} to {:?}", size.mins, size.maxs);
        }
        for index in 0..self.map.entities.len() {
            self.process_entity(index, hull, visitor)?;
        }
        Ok(())
    }

    /// Loads, visits and frees the brushes of one entity.
    ///
    /// Entities without brushes (other than the world) and entities merged
    /// into the world are skipped. The first call for an entity reserves its
    /// model number, sets its `model` key and moves `rotate_*` entities to
    /// the origin of their target.
    pub fn process_entity(&mut self, index: usize, hull: Hull, visitor: &mut dyn HullVisitor) -> Result<()> {
        let entity = &self.map.entities[index];

        if entity.mapbrushes.is_empty() && index != WORLD_ENTITY {
            return Ok(());
        }
        if entity.is_world_brush_entity() || entity.is_non_removed_world_brush_entity() {
            return Ok(());
        }

        let reserved = entity.output_model_number;
        let model = match reserved {
            Some(model) => model,
            None => {
                let model = self.num_models;
                self.num_models += 1;
                self.map.entities[index].output_model_number = Some(model);
                model
            }
        };

        let entity = &mut self.map.entities[index];
        if index != WORLD_ENTITY {
            let name = format!("*{model}");
            if !hull.is_clip() {
                log::info!("     MODEL: {name}");
            }
            entity.epairs.set("model", name);
        }

        entity.brushes.clear();
        entity.bounds = Aabb::empty();

        if reserved.is_none() && index != WORLD_ENTITY && self.map.entities[index].is_rotate_entity() {
            fix_rotate_origin(&mut self.map, index);
        }

        log::debug!("---- load_entity_brushes ----");
        load_entity_brushes(&mut self.map, index, hull, self.policy.as_ref(), &self.options)?;
        log::info!("{:8} planes", self.map.planes.len());

        let entity = &self.map.entities[index];
        if entity.brushes.is_empty() && hull != Hull::Draw {
            entity.log_pairs();
            return Err(CompileError::EmptyCollisionHull {
                classname: entity.classname().to_string(),
                hull,
            });
        }

        visitor.visit(hull, index, entity, &self.map.planes);

        if self.policy.exports_brush_list() && !hull.is_clip() {
            let Map { entities, planes, .. } = &mut self.map;
            export_brush_list(&entities[index].brushes, planes, &mut self.collision);
        }

        self.map.entities[index].brushes.clear();
        Ok(())
    }

    /// Builds the BSPX brush list from the unfiltered brushes of every model.
    ///
    /// Returns `None` unless `options.bspx_brushes` is set. Must run after
    /// the hulls, which assign the `model` keys.
    pub fn create_bspx_brush_list(&mut self) -> Result<Option<BrushListLump>> {
        if !self.options.bspx_brushes {
            return Ok(None);
        }

        let mut lump = BrushListLump::new();

        for index in 0..self.map.entities.len() {
            let modelnum = if index == WORLD_ENTITY {
                0
            } else {
                let model = self.map.entities[index].epairs.get("model");
                match model.strip_prefix('*').and_then(|n| n.parse().ok()) {
                    Some(modelnum) => modelnum,
                    None => continue,
                }
            };

            self.map.entities[index].brushes.clear();
            load_entity_brushes(&mut self.map, index, Hull::Collision, self.policy.as_ref(), &self.options)?;

            let entity = &self.map.entities[index];
            if entity.brushes.is_empty() {
                continue;
            }
            lump.add_model(modelnum, &entity.brushes, &self.map.planes, self.policy.as_ref());
            self.map.entities[index].brushes.clear();
        }

        Ok(Some(lump))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::ContentFlags;
    use crate::map::{EntityPairs, FacePlane, MapBrush, TexInfo};
    use crate::{GameId, Plane};
    use nalgebra::Vector3;

    fn make_box(map: &mut Map, mins: [f64; 3], maxs: [f64; 3], texture: &str) -> MapBrush {
        let texinfo = map.add_texinfo(TexInfo::new(texture, 0));
        let mut sides = Vec::new();
        for axis in 0..3 {
            let mut n = Vector3::zeros();
            n[axis] = 1.0;
            sides.push(FacePlane {
                plane: Plane::new(n, maxs[axis]),
                texinfo,
                contents: ContentFlags::new(0),
            });
            sides.push(FacePlane {
                plane: Plane::new(-n, -mins[axis]),
                texinfo,
                contents: ContentFlags::new(0),
            });
        }
        MapBrush::from_planes(&mut map.planes, &sides, 65536.0, 1)
    }

    fn make_map() -> Map {
        let mut map = Map::new();
        let floor = make_box(&mut map, [-64.0, -64.0, -16.0], [64.0, 64.0, 0.0], "floor");
        let door = make_box(&mut map, [0.0, 0.0, 0.0], [8.0, 32.0, 64.0], "door");
        let detail = make_box(&mut map, [32.0, 32.0, 0.0], [40.0, 40.0, 8.0], "crate");
        let pairs = |items: &[(&str, &str)]| items.iter().copied().collect::<EntityPairs>();

        map.add_entity(MapEntity::new(pairs(&[("classname", "worldspawn")]), vec![floor]));
        map.add_entity(MapEntity::new(pairs(&[("classname", "light")]), vec![]));
        map.add_entity(MapEntity::new(pairs(&[("classname", "func_door")]), vec![door]));
        map.add_entity(MapEntity::new(pairs(&[("classname", "func_detail")]), vec![detail]));
        map
    }

    #[test]
    fn hull_numbering() {
        assert_eq!(Hull::from_index(0), Hull::Draw);
        assert_eq!(Hull::from_index(2), Hull::Clip(2));
        assert_eq!(Hull::Collision.index(), -1);
        assert_eq!(Hull::Clip(1).to_string(), "hull 1");
        assert!(!Hull::Draw.is_clip());
    }

    #[test]
    fn hulls_per_game() {
        let quake = CompileContext::new(Map::new(), Options::default());
        assert_eq!(quake.hulls(), vec![Hull::Draw, Hull::Clip(1), Hull::Clip(2)]);

        let noclip = CompileContext::new(
            Map::new(),
            Options {
                noclip: true,
                ..Default::default()
            },
        );
        assert_eq!(noclip.hulls(), vec![Hull::Draw]);

        let quake2 = CompileContext::new(
            Map::new(),
            Options {
                game: GameId::Quake2,
                ..Default::default()
            },
        );
        assert_eq!(quake2.hulls(), vec![Hull::Collision]);
    }

    #[test]
    fn hull_boxes() {
        let quake = CompileContext::new(Map::new(), Options::default());
        let player = quake.hull_size(Hull::Clip(1)).unwrap();
        assert_eq!(player.mins, [-16.0, -16.0, -32.0]);
        assert_eq!(player.maxs, [16.0, 16.0, 24.0]);
        assert_eq!(quake.hull_size(Hull::Draw).unwrap().maxs, [0.0; 3]);
        assert!(quake.hull_size(Hull::Clip(3)).is_none());
        assert!(quake.hull_size(Hull::Collision).is_none());
    }

    #[test]
    fn every_model_is_visited_per_hull() {
        let mut ctx = CompileContext::new(make_map(), Options::default());
        let mut visitor = CollectingVisitor::new();
        ctx.create_hulls(&mut visitor).unwrap();

        let models = visitor.models();
        assert_eq!(models.len(), 6);
        assert_eq!(models[0].hull, Hull::Draw);
        assert_eq!(models[0].entity, 0);
        assert_eq!(models[0].model, Some(0));
        assert_eq!(models[0].brushes.len(), 2);
        assert_eq!(models[1].entity, 2);
        assert_eq!(models[1].model, Some(1));
        assert_eq!(models[5].hull, Hull::Clip(2));
        assert_eq!(models[5].model, Some(1));

        assert_eq!(ctx.num_models, 2);
        assert_eq!(ctx.map.entities[2].epairs.get("model"), "*1");
        assert!(!ctx.map.entities[1].epairs.has("model"));
        assert!(ctx.map.entities.iter().all(|e| e.brushes.is_empty()));
    }

    #[test]
    fn rotating_entity_takes_target_origin() {
        let mut map = make_map();
        let gear = make_box(&mut map, [64.0, 0.0, 0.0], [96.0, 32.0, 32.0], "gear");
        let pairs = |items: &[(&str, &str)]| items.iter().copied().collect::<EntityPairs>();
        map.add_entity(MapEntity::new(
            pairs(&[("classname", "rotate_object"), ("target", "hub")]),
            vec![gear],
        ));
        map.add_entity(MapEntity::new(
            pairs(&[("classname", "info_rotate"), ("targetname", "hub"), ("origin", "80 16 16")]),
            vec![],
        ));

        let mut ctx = CompileContext::new(map, Options::default());
        ctx.create_hulls(&mut CollectingVisitor::new()).unwrap();

        let rotate = &ctx.map.entities[4];
        assert_eq!(rotate.epairs.get("model"), "*2");
        assert_eq!(rotate.epairs.get("origin"), "80 16 16");
        assert!(!ctx.map.entities[2].epairs.has("origin"));
    }

    #[test]
    fn empty_entity_fails_in_clip_hull() {
        let mut map = make_map();
        let water = make_box(&mut map, [0.0, 0.0, 0.0], [8.0, 8.0, 8.0], "*water");
        map.entities[0].mapbrushes = vec![water];
        map.entities.truncate(1);

        let mut ctx = CompileContext::new(map, Options::default());
        let mut count = 0;
        let mut visitor = FnVisitor::new(|_: Hull, _: usize, _: &MapEntity, _: &PlaneTable| count += 1);
        let err = ctx.create_hulls(&mut visitor).unwrap_err();

        assert_eq!(
            err,
            CompileError::EmptyCollisionHull {
                classname: "worldspawn".to_string(),
                hull: Hull::Clip(1),
            }
        );
        drop(visitor);
        assert_eq!(count, 1);
    }

    #[test]
    fn quake2_exports_brush_list() {
        let options = Options {
            game: GameId::Quake2,
            ..Default::default()
        };
        let mut ctx = CompileContext::new(make_map(), options);
        ctx.create_hulls(&mut CollectingVisitor::new()).unwrap();

        assert_eq!(ctx.collision.brushes.len(), 3);
        assert!(ctx.collision.brushes.iter().all(|b| b.num_sides == 6));
        assert_eq!(ctx.collision.sides.len(), 18);
    }

    #[test]
    fn bspx_brush_list_needs_option() {
        let mut ctx = CompileContext::new(make_map(), Options::default());
        ctx.create_hulls(&mut CollectingVisitor::new()).unwrap();
        assert!(ctx.create_bspx_brush_list().unwrap().is_none());

        ctx.options.bspx_brushes = true;
        let lump = ctx.create_bspx_brush_list().unwrap().unwrap();
        let models: Vec<i32> = lump.models().iter().map(|m| m.modelnum).collect();
        assert_eq!(models, vec![0, 1]);
        assert_eq!(lump.models()[0].brushes.len(), 2);
    }
}
