//! Game-specific contents rules.
//!
//! Each supported game interprets contents differently: Quake uses a small set
//! of negative codes, Quake II a bit field read from the map faces. The rest of
//! the compiler only talks to a [`GamePolicy`], selected once from
//! [`GameId`] when the compilation context is created.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contents::{q1, q2, ContentFlags, ContentStats, ExtendedContents, SurfaceFlags};
use crate::CompileError;

/// Size of the box a collision hull is expanded by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullSize {
    pub mins: [f64; 3],
    pub maxs: [f64; 3],
}

const fn hull(mins: [f64; 3], maxs: [f64; 3]) -> HullSize {
    HullSize { mins, maxs }
}

const QUAKE_HULLS: [HullSize; 3] = [
    hull([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
    hull([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]),
    hull([-32.0, -32.0, -64.0], [32.0, 32.0, 24.0]),
];

const HEXEN2_HULLS: [HullSize; 6] = [
    hull([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
    hull([-16.0, -16.0, -24.0], [16.0, 16.0, 32.0]),
    hull([-24.0, -24.0, -20.0], [24.0, 24.0, 20.0]),
    hull([-16.0, -16.0, -12.0], [16.0, 16.0, 16.0]),
    hull([-8.0, -8.0, -8.0], [8.0, 8.0, 8.0]),
    hull([-28.0, -28.0, -40.0], [28.0, 28.0, 40.0]),
];

/// Identifies the target game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    #[default]
    Quake,
    Hexen2,
    Quake2,
}

impl GameId {
    /// Creates the contents policy for this game.
    pub fn policy(self) -> Box<dyn GamePolicy> {
        match self {
            GameId::Quake | GameId::Hexen2 => Box::new(QuakePolicy::new(self)),
            GameId::Quake2 => Box::new(Quake2Policy),
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameId::Quake => "quake",
            GameId::Hexen2 => "hexen2",
            GameId::Quake2 => "quake2",
        })
    }
}

impl FromStr for GameId {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quake" | "q1" => Ok(GameId::Quake),
            "hexen2" | "h2" => Ok(GameId::Hexen2),
            "quake2" | "q2" => Ok(GameId::Quake2),
            _ => Err(CompileError::UnknownGame(s.to_string())),
        }
    }
}

/// Strategy interface over the contents rules of a game.
pub trait GamePolicy: fmt::Debug {
    fn id(&self) -> GameId;

    /// Collision hull sizes, hull 0 first. Empty when the game collides
    /// against brushes directly.
    fn hull_sizes(&self) -> &'static [HullSize];

    /// Whether brush entities other than the world keep their own contents.
    fn allow_contented_bmodels(&self) -> bool;

    /// Whether the collision brush lump is written for this game.
    fn exports_brush_list(&self) -> bool;

    /// Contents given to every face of a `func_areaportal`, if the game has them.
    fn area_portal_contents(&self) -> Option<ContentFlags> {
        None
    }

    fn create_empty_contents(&self) -> ContentFlags;
    fn create_solid_contents(&self) -> ContentFlags;
    fn create_detail_solid_contents(&self, original: ContentFlags) -> ContentFlags;
    fn create_detail_fence_contents(&self, original: ContentFlags) -> ContentFlags;
    fn create_detail_illusionary_contents(&self, original: ContentFlags) -> ContentFlags;

    /// Whether a face with these surface flags marks its brush as a hint.
    fn is_hint_surface(&self, flags: &SurfaceFlags) -> bool {
        flags.is_hint()
    }

    /// Derives the contents a single face contributes to its brush.
    fn face_get_contents(&self, texname: &str, flags: &SurfaceFlags, raw: &ContentFlags) -> ContentFlags;

    fn is_empty(&self, contents: &ContentFlags) -> bool;
    fn is_solid(&self, contents: &ContentFlags) -> bool;
    fn is_sky(&self, contents: &ContentFlags) -> bool;
    fn is_liquid(&self, contents: &ContentFlags) -> bool;
    fn is_clip(&self, contents: &ContentFlags) -> bool;
    fn is_origin(&self, contents: &ContentFlags) -> bool;

    /// Whether two values describe the same kind of contents.
    fn types_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool;

    /// General validity predicate for a finished brush contents value.
    fn is_valid(&self, contents: &ContentFlags, allow_empty: bool) -> bool;

    fn contents_to_string(&self, contents: &ContentFlags) -> String;

    fn count_contents_in_stats(&self, contents: &ContentFlags, stats: &mut ContentStats) {
        if contents.is_detail_illusionary() {
            stats.detail_illusionary += 1;
        } else if contents.is_detail_fence() {
            stats.detail_fence += 1;
        } else if contents.is_detail_solid() {
            stats.detail += 1;
        } else if self.is_solid(contents) {
            stats.solid += 1;
        } else if self.is_sky(contents) {
            stats.sky += 1;
        } else if self.is_liquid(contents) {
            stats.liquid += 1;
        } else {
            stats.other += 1;
        }
    }

    fn print_content_stats(&self, stats: &ContentStats, what: &str) {
        stats.log(what);
    }
}

/// Extended bits that make an otherwise empty value meaningful.
const NON_EMPTY_EXTENDED: ExtendedContents = ExtendedContents::HINT
    .union(ExtendedContents::CLIP)
    .union(ExtendedContents::ORIGIN)
    .union(ExtendedContents::DETAIL_MASK);

fn append_extended(mut name: String, extended: ExtendedContents) -> String {
    if !extended.is_empty() {
        name.push_str(" | ");
        name.push_str(&extended.to_string());
    }
    name
}

fn with_detail(original: ContentFlags, native: i32, detail: ExtendedContents) -> ContentFlags {
    let mut contents = original;
    contents.native = native;
    contents.extended = (original.extended - ExtendedContents::DETAIL_MASK) | detail;
    contents
}

/// Quake and Hexen II: negative native codes, tool textures by name.
#[derive(Debug, Clone, Copy)]
pub struct QuakePolicy {
    id: GameId,
}

impl QuakePolicy {
    /// # Panics
    /// Panics if `id` is not a Quake-family game.
    pub fn new(id: GameId) -> Self {
        assert!(
            matches!(id, GameId::Quake | GameId::Hexen2),
            "QuakePolicy only covers Quake and Hexen II"
        );
        Self { id }
    }
}

impl GamePolicy for QuakePolicy {
    fn id(&self) -> GameId {
        self.id
    }

    fn hull_sizes(&self) -> &'static [HullSize] {
        match self.id {
            GameId::Hexen2 => &HEXEN2_HULLS,
            _ => &QUAKE_HULLS,
        }
    }

    fn allow_contented_bmodels(&self) -> bool {
        false
    }

    fn exports_brush_list(&self) -> bool {
        false
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags::new(q1::CONTENTS_EMPTY)
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags::new(q1::CONTENTS_SOLID)
    }

    fn create_detail_solid_contents(&self, original: ContentFlags) -> ContentFlags {
        with_detail(original, q1::CONTENTS_SOLID, ExtendedContents::DETAIL)
    }

    fn create_detail_fence_contents(&self, original: ContentFlags) -> ContentFlags {
        with_detail(original, q1::CONTENTS_SOLID, ExtendedContents::DETAIL_FENCE)
    }

    fn create_detail_illusionary_contents(&self, original: ContentFlags) -> ContentFlags {
        with_detail(original, q1::CONTENTS_EMPTY, ExtendedContents::DETAIL_ILLUSIONARY)
    }

    fn face_get_contents(&self, texname: &str, flags: &SurfaceFlags, _raw: &ContentFlags) -> ContentFlags {
        let lower = texname.to_ascii_lowercase();

        if flags.is_skip() {
            self.create_empty_contents()
        } else if flags.is_hint() || lower == "hint" {
            ContentFlags::with_extended(q1::CONTENTS_EMPTY, ExtendedContents::HINT)
        } else if lower == "origin" {
            ContentFlags::with_extended(q1::CONTENTS_EMPTY, ExtendedContents::ORIGIN)
        } else if lower == "clip" {
            ContentFlags::with_extended(q1::CONTENTS_EMPTY, ExtendedContents::CLIP)
        } else if lower.starts_with("*lava") {
            ContentFlags::new(q1::CONTENTS_LAVA)
        } else if lower.starts_with("*slime") {
            ContentFlags::new(q1::CONTENTS_SLIME)
        } else if lower.starts_with('*') {
            ContentFlags::new(q1::CONTENTS_WATER)
        } else if lower.starts_with("sky") {
            ContentFlags::new(q1::CONTENTS_SKY)
        } else {
            self.create_solid_contents()
        }
    }

    fn is_empty(&self, contents: &ContentFlags) -> bool {
        contents.native == q1::CONTENTS_EMPTY && !contents.extended.intersects(NON_EMPTY_EXTENDED)
    }

    fn is_solid(&self, contents: &ContentFlags) -> bool {
        contents.native == q1::CONTENTS_SOLID
            && !contents.extended.intersects(ExtendedContents::DETAIL_MASK)
    }

    fn is_sky(&self, contents: &ContentFlags) -> bool {
        contents.native == q1::CONTENTS_SKY
            && !contents.extended.intersects(ExtendedContents::DETAIL_MASK)
    }

    fn is_liquid(&self, contents: &ContentFlags) -> bool {
        matches!(
            contents.native,
            q1::CONTENTS_WATER | q1::CONTENTS_SLIME | q1::CONTENTS_LAVA
        )
    }

    fn is_clip(&self, contents: &ContentFlags) -> bool {
        contents.extended.contains(ExtendedContents::CLIP)
    }

    fn is_origin(&self, contents: &ContentFlags) -> bool {
        contents.extended.contains(ExtendedContents::ORIGIN)
    }

    fn types_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        a.native == b.native && a.extended == b.extended
    }

    fn is_valid(&self, contents: &ContentFlags, allow_empty: bool) -> bool {
        if !allow_empty && self.is_empty(contents) {
            return false;
        }
        let details = contents.extended & ExtendedContents::DETAIL_MASK;
        if details.bits().count_ones() > 1 {
            return false;
        }
        (q1::CONTENTS_CLIP..=q1::CONTENTS_EMPTY).contains(&contents.native)
    }

    fn contents_to_string(&self, contents: &ContentFlags) -> String {
        let name = match contents.native {
            q1::CONTENTS_EMPTY => "EMPTY".to_string(),
            q1::CONTENTS_SOLID => "SOLID".to_string(),
            q1::CONTENTS_WATER => "WATER".to_string(),
            q1::CONTENTS_SLIME => "SLIME".to_string(),
            q1::CONTENTS_LAVA => "LAVA".to_string(),
            q1::CONTENTS_SKY => "SKY".to_string(),
            q1::CONTENTS_CLIP => "CLIP".to_string(),
            other => format!("UNKNOWN({other})"),
        };
        append_extended(name, contents.extended)
    }
}

const Q2_VISIBLE: i32 = q2::CONTENTS_SOLID
    | q2::CONTENTS_WINDOW
    | q2::CONTENTS_AUX
    | q2::CONTENTS_LIQUID
    | q2::CONTENTS_MIST;

const Q2_DECLARED: i32 =
    Q2_VISIBLE | q2::CONTENTS_CLIP | q2::CONTENTS_AREAPORTAL | q2::CONTENTS_ORIGIN;

const Q2_TYPE_MASK: i32 = Q2_DECLARED | q2::CONTENTS_DETAIL;

const Q2_NAMES: [(i32, &str); 14] = [
    (q2::CONTENTS_SOLID, "SOLID"),
    (q2::CONTENTS_WINDOW, "WINDOW"),
    (q2::CONTENTS_AUX, "AUX"),
    (q2::CONTENTS_LAVA, "LAVA"),
    (q2::CONTENTS_SLIME, "SLIME"),
    (q2::CONTENTS_WATER, "WATER"),
    (q2::CONTENTS_MIST, "MIST"),
    (q2::CONTENTS_AREAPORTAL, "AREAPORTAL"),
    (q2::CONTENTS_PLAYERCLIP, "PLAYERCLIP"),
    (q2::CONTENTS_MONSTERCLIP, "MONSTERCLIP"),
    (q2::CONTENTS_ORIGIN, "ORIGIN"),
    (q2::CONTENTS_DETAIL, "DETAIL"),
    (q2::CONTENTS_TRANSLUCENT, "TRANSLUCENT"),
    (q2::CONTENTS_EMPTY, "EMPTY"),
];

/// Quake II: contents bits come from the map faces. Sky is a surface flag
/// there, not a contents type, so [`GamePolicy::is_sky`] never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quake2Policy;

impl GamePolicy for Quake2Policy {
    fn id(&self) -> GameId {
        GameId::Quake2
    }

    fn hull_sizes(&self) -> &'static [HullSize] {
        &[]
    }

    fn allow_contented_bmodels(&self) -> bool {
        true
    }

    fn exports_brush_list(&self) -> bool {
        true
    }

    fn area_portal_contents(&self) -> Option<ContentFlags> {
        Some(ContentFlags::new(q2::CONTENTS_AREAPORTAL))
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags::new(q2::CONTENTS_EMPTY)
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags::new(q2::CONTENTS_SOLID)
    }

    fn create_detail_solid_contents(&self, original: ContentFlags) -> ContentFlags {
        let native = original.native | q2::CONTENTS_DETAIL;
        with_detail(original, native, ExtendedContents::DETAIL)
    }

    fn create_detail_fence_contents(&self, original: ContentFlags) -> ContentFlags {
        let native = (original.native & !q2::CONTENTS_SOLID)
            | q2::CONTENTS_WINDOW
            | q2::CONTENTS_DETAIL;
        with_detail(original, native, ExtendedContents::DETAIL_FENCE)
    }

    fn create_detail_illusionary_contents(&self, original: ContentFlags) -> ContentFlags {
        let native = (original.native & !q2::CONTENTS_SOLID)
            | q2::CONTENTS_MIST
            | q2::CONTENTS_DETAIL;
        with_detail(original, native, ExtendedContents::DETAIL_ILLUSIONARY)
    }

    fn is_hint_surface(&self, flags: &SurfaceFlags) -> bool {
        flags.is_hint() || flags.native & q2::SURF_HINT != 0
    }

    fn face_get_contents(&self, _texname: &str, flags: &SurfaceFlags, raw: &ContentFlags) -> ContentFlags {
        if flags.is_skip() || flags.native & q2::SURF_SKIP != 0 {
            return self.create_empty_contents();
        }
        if self.is_hint_surface(flags) {
            return ContentFlags::with_extended(q2::CONTENTS_EMPTY, ExtendedContents::HINT);
        }

        let mut contents = ContentFlags::new(raw.native);

        // undeclared contents are solid
        if contents.native & Q2_DECLARED == 0 {
            contents.native |= q2::CONTENTS_SOLID;
        }

        if flags.native & (q2::SURF_TRANS33 | q2::SURF_TRANS66) != 0 {
            contents.native |= q2::CONTENTS_TRANSLUCENT;
            if contents.native & q2::CONTENTS_SOLID != 0 {
                contents.native = (contents.native & !q2::CONTENTS_SOLID) | q2::CONTENTS_WINDOW;
            }
        }

        if contents.native & (q2::CONTENTS_TRANSLUCENT | q2::CONTENTS_MIST | q2::CONTENTS_AUX) != 0 {
            contents.native |= q2::CONTENTS_DETAIL;
        }
        if contents.native & q2::CONTENTS_CLIP != 0 {
            contents.native |= q2::CONTENTS_DETAIL;
        }

        contents
    }

    fn is_empty(&self, contents: &ContentFlags) -> bool {
        contents.native & Q2_TYPE_MASK == 0 && !contents.extended.intersects(NON_EMPTY_EXTENDED)
    }

    fn is_solid(&self, contents: &ContentFlags) -> bool {
        contents.native & q2::CONTENTS_SOLID != 0 && contents.native & q2::CONTENTS_DETAIL == 0
    }

    fn is_sky(&self, _contents: &ContentFlags) -> bool {
        false
    }

    fn is_liquid(&self, contents: &ContentFlags) -> bool {
        contents.native & q2::CONTENTS_LIQUID != 0
    }

    fn is_clip(&self, contents: &ContentFlags) -> bool {
        contents.native & q2::CONTENTS_CLIP != 0
    }

    fn is_origin(&self, contents: &ContentFlags) -> bool {
        contents.native & q2::CONTENTS_ORIGIN != 0
    }

    fn types_equal(&self, a: &ContentFlags, b: &ContentFlags) -> bool {
        a.native & Q2_TYPE_MASK == b.native & Q2_TYPE_MASK && a.extended == b.extended
    }

    fn is_valid(&self, contents: &ContentFlags, allow_empty: bool) -> bool {
        if !allow_empty && self.is_empty(contents) {
            return false;
        }
        let solid = contents.native & q2::CONTENTS_SOLID != 0;
        !(solid && contents.native & (q2::CONTENTS_WINDOW | q2::CONTENTS_MIST) != 0)
    }

    fn contents_to_string(&self, contents: &ContentFlags) -> String {
        let names: Vec<&str> = Q2_NAMES
            .iter()
            .filter(|(bit, _)| *bit != 0 && contents.native & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        let name = if names.is_empty() {
            "EMPTY".to_string()
        } else {
            names.join(" | ")
        };
        append_extended(name, contents.extended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(policy: &dyn GamePolicy, name: &str) -> ContentFlags {
        policy.face_get_contents(name, &SurfaceFlags::for_texture(name, 0), &ContentFlags::new(0))
    }

    #[test]
    fn game_id_parsing() {
        assert_eq!("Q2".parse::<GameId>().unwrap(), GameId::Quake2);
        assert_eq!("hexen2".parse::<GameId>().unwrap(), GameId::Hexen2);
        assert!(matches!(
            "doom".parse::<GameId>(),
            Err(CompileError::UnknownGame(_))
        ));
    }

    #[test]
    fn quake_texture_contents() {
        let q = QuakePolicy::new(GameId::Quake);
        assert!(q.is_solid(&face(&q, "wall1")));
        assert!(q.is_sky(&face(&q, "sky4")));
        assert_eq!(face(&q, "*lava1").native, q1::CONTENTS_LAVA);
        assert_eq!(face(&q, "*slime0").native, q1::CONTENTS_SLIME);
        assert_eq!(face(&q, "*water2").native, q1::CONTENTS_WATER);
        assert!(q.is_clip(&face(&q, "CLIP")));
        assert!(q.is_origin(&face(&q, "origin")));
        assert!(q.is_empty(&face(&q, "skip")));
        assert!(!q.is_empty(&face(&q, "hint")));
    }

    #[test]
    fn quake_detail_transforms() {
        let q = QuakePolicy::new(GameId::Quake);
        let solid = q.create_solid_contents();

        let detail = q.create_detail_solid_contents(solid);
        assert!(detail.is_detail_solid());
        assert!(!q.is_solid(&detail));

        let fence = q.create_detail_fence_contents(detail);
        assert!(fence.is_detail_fence());
        assert!(!fence.is_detail_solid());

        let illusionary = q.create_detail_illusionary_contents(solid);
        assert_eq!(illusionary.native, q1::CONTENTS_EMPTY);
        assert!(!q.is_empty(&illusionary));
        assert!(q.is_valid(&illusionary, false));
    }

    #[test]
    fn quake_validity() {
        let q = QuakePolicy::new(GameId::Quake);
        assert!(!q.is_valid(&q.create_empty_contents(), false));
        assert!(q.is_valid(&q.create_empty_contents(), true));
        assert!(!q.is_valid(&ContentFlags::new(5), true));
        let both = ContentFlags::with_extended(
            q1::CONTENTS_SOLID,
            ExtendedContents::DETAIL | ExtendedContents::DETAIL_FENCE,
        );
        assert!(!q.is_valid(&both, false));
    }

    #[test]
    fn quake_strings() {
        let q = QuakePolicy::new(GameId::Quake);
        assert_eq!(q.contents_to_string(&q.create_solid_contents()), "SOLID");
        assert_eq!(
            q.contents_to_string(&q.create_detail_fence_contents(q.create_solid_contents())),
            "SOLID | DETAIL_FENCE"
        );
    }

    #[test]
    fn hexen2_has_six_hulls() {
        assert_eq!(GameId::Hexen2.policy().hull_sizes().len(), 6);
        assert_eq!(GameId::Quake.policy().hull_sizes().len(), 3);
        assert!(GameId::Quake2.policy().hull_sizes().is_empty());
    }

    #[test]
    fn quake2_face_contents() {
        let q = Quake2Policy;
        let plain = q.face_get_contents("e1u1/wall", &SurfaceFlags::new(0), &ContentFlags::new(0));
        assert!(q.is_solid(&plain));

        let water = q.face_get_contents(
            "e1u1/water",
            &SurfaceFlags::new(0),
            &ContentFlags::new(q2::CONTENTS_WATER),
        );
        assert!(q.is_liquid(&water));
        assert!(!q.is_solid(&water));

        let glass = q.face_get_contents(
            "e1u1/glass",
            &SurfaceFlags::new(q2::SURF_TRANS33),
            &ContentFlags::new(0),
        );
        assert_eq!(glass.native & q2::CONTENTS_SOLID, 0);
        assert_ne!(glass.native & q2::CONTENTS_WINDOW, 0);
        assert_ne!(glass.native & q2::CONTENTS_DETAIL, 0);

        let clip = q.face_get_contents(
            "e1u1/clip",
            &SurfaceFlags::new(0),
            &ContentFlags::new(q2::CONTENTS_PLAYERCLIP),
        );
        assert!(q.is_clip(&clip));
        assert!(!q.is_solid(&clip));

        let skip = q.face_get_contents("e1u1/skip", &SurfaceFlags::new(q2::SURF_SKIP), &ContentFlags::new(0));
        assert!(q.is_empty(&skip));
    }

    #[test]
    fn hint_surfaces_per_game() {
        let native_hint = SurfaceFlags::new(q2::SURF_HINT);
        assert!(Quake2Policy.is_hint_surface(&native_hint));
        assert!(Quake2Policy.is_hint_surface(&SurfaceFlags::for_texture("hint", 0)));

        let q = QuakePolicy::new(GameId::Quake);
        assert!(q.is_hint_surface(&SurfaceFlags::for_texture("HINT", 0)));
        assert!(!q.is_hint_surface(&native_hint));
    }

    #[test]
    fn stats_categories() {
        let q = QuakePolicy::new(GameId::Quake);
        let mut stats = ContentStats::default();
        let solid = q.create_solid_contents();
        q.count_contents_in_stats(&solid, &mut stats);
        q.count_contents_in_stats(&q.create_detail_solid_contents(solid), &mut stats);
        q.count_contents_in_stats(&q.create_detail_fence_contents(solid), &mut stats);
        q.count_contents_in_stats(&ContentFlags::new(q1::CONTENTS_WATER), &mut stats);
        q.count_contents_in_stats(&ContentFlags::new(q1::CONTENTS_SKY), &mut stats);
        q.count_contents_in_stats(&q.create_empty_contents(), &mut stats);

        assert_eq!(
            stats,
            ContentStats {
                solid: 1,
                sky: 1,
                detail: 1,
                detail_illusionary: 0,
                detail_fence: 1,
                liquid: 1,
                other: 1,
            }
        );
    }
}
