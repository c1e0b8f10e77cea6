//! Gathering the brushes of an entity for one hull.
//!
//! The world entity also receives the brushes of `func_group`, the
//! `func_detail` family, `func_areaportal` and `func_illusionary_visblocker`.
//! Every brush goes through a fixed sequence of contents rules before it is
//! loaded; which rules apply depends on the hull being built.

use nalgebra::Vector3;

use crate::brush::{brush_get_contents, load_brush, BrushSource};
use crate::map::{Map, MapBrush, MapEntity, TexInfo, WORLD_ENTITY};
use crate::{Aabb, Brush, ContentStats, GamePolicy, Hull, Options, Result};

/// Converts an `_lmscale` value to a light map shift.
///
/// The scale is multiplied by 16 and rounded down to a power of two; zero
/// selects the default of 16 (shift 4).
pub fn lmshift_for_scale(scale: f64) -> u32 {
    let mut size = (16.0 * scale) as i64;
    if size == 0 {
        size = 16;
    }
    let mut shift = 0;
    while size > 1 {
        shift += 1;
        size /= 2;
    }
    shift
}

/// Entity-wide settings applied to each of its brushes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntitySettings {
    pub detail: bool,
    pub detail_fence: bool,
    pub detail_illusionary: bool,
    pub lmshift: u32,
    pub mirror_inside: Option<bool>,
    pub clips_same_type: Option<bool>,
    pub illusionary_visblocker: bool,
    pub func_areaportal: bool,
}

impl EntitySettings {
    pub fn from_entity(entity: &MapEntity, options: &Options) -> Self {
        let pairs = &entity.epairs;
        let detail_allowed = !options.nodetail;

        Self {
            detail: detail_allowed && entity.is_classname("func_detail"),
            detail_fence: detail_allowed
                && (entity.is_classname("func_detail_fence") || entity.is_classname("func_detail_wall")),
            detail_illusionary: detail_allowed && entity.is_classname("func_detail_illusionary"),
            lmshift: lmshift_for_scale(pairs.get_float("_lmscale")),
            mirror_inside: pairs
                .has("_mirrorinside")
                .then(|| pairs.get_int("_mirrorinside") != 0),
            clips_same_type: pairs
                .has("_noclipfaces")
                .then(|| pairs.get_int("_noclipfaces") == 0),
            illusionary_visblocker: entity.is_classname("func_illusionary_visblocker"),
            func_areaportal: entity.is_classname("func_areaportal"),
        }
    }
}

/// Returns `true` if any face of the brush has a hint surface.
pub fn map_brush_is_hint(mapbrush: &MapBrush, texinfos: &[TexInfo], policy: &dyn GamePolicy) -> bool {
    mapbrush
        .faces
        .iter()
        .any(|face| policy.is_hint_surface(&texinfos[face.texinfo].flags))
}

/// Copies the `origin` of the entity named by `target` into a rotating
/// entity and returns it.
///
/// Without a target the origin becomes zero.
pub fn fix_rotate_origin(map: &mut Map, index: usize) -> Vector3<f64> {
    let entity = &map.entities[index];
    let search = entity.epairs.get("target");
    let target = if search.is_empty() {
        None
    } else {
        map.find_target_entity(search)
    };

    let offset = match target {
        Some(target) => map.entities[target].epairs.get_vector("origin"),
        None => {
            log::warn!("No target for rotation entity \"{}\"", entity.classname());
            Vector3::zeros()
        }
    };

    map.entities[index]
        .epairs
        .set("origin", format!("{} {} {}", offset.x, offset.y, offset.z));
    offset
}

/// Numbers a `func_areaportal` entity the first time it is seen.
///
/// The number is stored in the `style` key. Games with an area portal
/// contents type get it written into every face of the entity.
pub fn process_area_portal(map: &mut Map, index: usize, policy: &dyn GamePolicy) {
    let entity = &map.entities[index];
    if !entity.is_classname("func_areaportal") || entity.area_portal_num.is_some() {
        return;
    }

    map.num_area_portals += 1;
    let num = map.num_area_portals;

    let entity = &mut map.entities[index];
    entity.area_portal_num = Some(num);
    entity.epairs.set("style", num.to_string());

    if let Some(contents) = policy.area_portal_contents() {
        for face in entity.mapbrushes.iter_mut().flat_map(|b| b.faces.iter_mut()) {
            face.contents = contents;
        }
    }

    log::debug!("area portal {num} at entity {index}");
}

#[derive(Debug, Default)]
struct Collected {
    brushes: Vec<Brush>,
    bounds: Aabb,
    stats: ContentStats,
}

fn load_source_entity(
    map: &Map,
    src: usize,
    into_world: bool,
    hull: Hull,
    policy: &dyn GamePolicy,
    options: &Options,
    out: &mut Collected,
) -> Result<()> {
    let entity = &map.entities[src];

    if entity.epairs.get_int("_omitbrushes") != 0 {
        return Ok(());
    }

    let settings = EntitySettings::from_entity(entity, options);

    for (index, mapbrush) in entity.mapbrushes.iter().enumerate() {
        let source = BrushSource { entity: src, brush: index };
        let mut contents = brush_get_contents(policy, mapbrush, &map.texinfos)?.contents;

        if policy.is_origin(&contents) {
            continue;
        }

        if options.omitdetail && settings.detail {
            continue;
        }
        if (options.omitdetail || options.omitdetailillusionary) && settings.detail_illusionary {
            continue;
        }
        if (options.omitdetail || options.omitdetailfence) && settings.detail_fence {
            continue;
        }

        // detail only exists outside the clip hulls
        if !hull.is_clip() && policy.is_solid(&contents) {
            if settings.detail_illusionary {
                contents = policy.create_detail_illusionary_contents(contents);
            } else if settings.detail_fence {
                contents = policy.create_detail_fence_contents(contents);
            } else if settings.detail {
                contents = policy.create_detail_solid_contents(contents);
            }
        }

        if hull.is_clip() && settings.detail_illusionary {
            continue;
        }

        // clip brushes are not drawn but still count for the model bounds
        if hull != Hull::Collision && policy.is_clip(&contents) {
            if hull == Hull::Draw {
                if let Some(brush) = load_brush(mapbrush, source, contents, hull, &map.planes, options)? {
                    out.bounds.merge(&brush.bounds);
                }
                continue;
            }
            contents = policy.create_solid_contents();
        }

        if map_brush_is_hint(mapbrush, &map.texinfos, policy) {
            if hull.is_clip() {
                continue;
            }
            contents = policy.create_empty_contents();
        }

        if !into_world && !policy.allow_contented_bmodels() {
            contents = policy.create_solid_contents();

            // keeps the inside faces of _mirrorinside bmodels
            if !hull.is_clip() && settings.mirror_inside == Some(true) {
                contents = policy.create_detail_fence_contents(contents);
            }
        }

        if hull.is_clip() {
            if policy.is_sky(&contents) {
                contents = policy.create_solid_contents();
            } else if !policy.is_solid(&contents) {
                continue;
            }
        }

        contents.set_mirrored(settings.mirror_inside);
        contents.set_clips_same_type(settings.clips_same_type);
        contents.illusionary_visblocker = settings.illusionary_visblocker;

        let Some(mut brush) = load_brush(mapbrush, source, contents, hull, &map.planes, options)? else {
            continue;
        };

        brush.lmshift = settings.lmshift;
        for side in &mut brush.sides {
            side.lmshift = settings.lmshift;
        }
        if settings.func_areaportal {
            brush.func_areaportal = Some(src);
        }

        policy.count_contents_in_stats(&brush.contents, &mut out.stats);
        out.bounds.merge(&brush.bounds);
        out.brushes.push(brush);
    }

    Ok(())
}

/// Loads the brushes of entity `dst` for `hull`, appending them to its
/// brush list and growing its bounds.
///
/// For the world entity the brushes of every donor entity are added as well,
/// after numbering any area portals among them.
pub fn load_entity_brushes(
    map: &mut Map,
    dst: usize,
    hull: Hull,
    policy: &dyn GamePolicy,
    options: &Options,
) -> Result<ContentStats> {
    let into_world = dst == WORLD_ENTITY;
    let mut out = Collected::default();

    load_source_entity(map, dst, into_world, hull, policy, options, &mut out)?;

    if into_world {
        for src in 1..map.entities.len() {
            process_area_portal(map, src, policy);

            let donor = &map.entities[src];
            if donor.is_world_brush_entity() || donor.is_non_removed_world_brush_entity() {
                load_source_entity(map, src, into_world, hull, policy, options, &mut out)?;
            }
        }
    }

    let entity = &mut map.entities[dst];
    entity.brushes.append(&mut out.brushes);
    entity.bounds.merge(&out.bounds);

    policy.print_content_stats(&out.stats, "brushes");
    Ok(out.stats)
}
