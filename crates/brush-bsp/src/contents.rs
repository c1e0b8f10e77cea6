//! Brush and face contents classification values.
//!
//! A [`ContentFlags`] value is a game-native contents code plus extended bits
//! the compiler tracks on top of it. Only a [`crate::GamePolicy`] knows how
//! to interpret the native part; everything else treats the value as opaque.

use std::fmt;

use bitflags::bitflags;

/// Quake / Hexen II native contents codes.
pub mod q1 {
    pub const CONTENTS_EMPTY: i32 = -1;
    pub const CONTENTS_SOLID: i32 = -2;
    pub const CONTENTS_WATER: i32 = -3;
    pub const CONTENTS_SLIME: i32 = -4;
    pub const CONTENTS_LAVA: i32 = -5;
    pub const CONTENTS_SKY: i32 = -6;
    pub const CONTENTS_CLIP: i32 = -8;
}

/// Quake II native contents bits.
pub mod q2 {
    pub const CONTENTS_EMPTY: i32 = 0;
    pub const CONTENTS_SOLID: i32 = 1;
    pub const CONTENTS_WINDOW: i32 = 2;
    pub const CONTENTS_AUX: i32 = 4;
    pub const CONTENTS_LAVA: i32 = 8;
    pub const CONTENTS_SLIME: i32 = 16;
    pub const CONTENTS_WATER: i32 = 32;
    pub const CONTENTS_MIST: i32 = 64;
    pub const CONTENTS_AREAPORTAL: i32 = 0x8000;
    pub const CONTENTS_PLAYERCLIP: i32 = 0x10000;
    pub const CONTENTS_MONSTERCLIP: i32 = 0x20000;
    pub const CONTENTS_ORIGIN: i32 = 0x0100_0000;
    pub const CONTENTS_DETAIL: i32 = 0x0800_0000;
    pub const CONTENTS_TRANSLUCENT: i32 = 0x1000_0000;

    pub const CONTENTS_LIQUID: i32 = CONTENTS_LAVA | CONTENTS_SLIME | CONTENTS_WATER;
    pub const CONTENTS_CLIP: i32 = CONTENTS_PLAYERCLIP | CONTENTS_MONSTERCLIP;

    pub const SURF_SKY: i32 = 0x4;
    pub const SURF_TRANS33: i32 = 0x10;
    pub const SURF_TRANS66: i32 = 0x20;
    pub const SURF_SKIP: i32 = 0x200;
    pub const SURF_HINT: i32 = 0x100;
}

bitflags! {
    /// Compiler-side contents bits carried next to the native value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExtendedContents: u32 {
        /// Solid that does not split the structural (vis) tree.
        const DETAIL = 1;
        /// See-through detail that still blocks movement.
        const DETAIL_FENCE = 1 << 1;
        /// Detail that is drawn but never collides.
        const DETAIL_ILLUSIONARY = 1 << 2;
        /// Splitting guidance only.
        const HINT = 1 << 3;
        /// Invisible movement blocker.
        const CLIP = 1 << 4;
        /// Rotation origin marker, never emitted.
        const ORIGIN = 1 << 5;

        const DETAIL_MASK = Self::DETAIL.bits()
            | Self::DETAIL_FENCE.bits()
            | Self::DETAIL_ILLUSIONARY.bits();
    }
}

bitflags! {
    /// Compiler-side surface bits derived from reserved texture names.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceExtended: u32 {
        const SKIP = 1;
        const HINT = 1 << 1;
        const HINTSKIP = 1 << 2;
    }
}

/// Per-texinfo surface flags: the game-native flag word plus extended bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceFlags {
    pub native: i32,
    pub extended: SurfaceExtended,
}

impl SurfaceFlags {
    pub fn new(native: i32) -> Self {
        Self {
            native,
            extended: SurfaceExtended::empty(),
        }
    }

    /// Builds flags for a texture, marking the reserved tool textures.
    pub fn for_texture(name: &str, native: i32) -> Self {
        let mut flags = Self::new(native);
        if name.eq_ignore_ascii_case("hint") {
            flags.extended |= SurfaceExtended::HINT;
        } else if name.eq_ignore_ascii_case("hintskip") {
            flags.extended |= SurfaceExtended::HINTSKIP;
        } else if name.eq_ignore_ascii_case("skip") {
            flags.extended |= SurfaceExtended::SKIP;
        }
        flags
    }

    #[inline]
    pub fn is_hint(&self) -> bool {
        self.extended.contains(SurfaceExtended::HINT)
    }

    #[inline]
    pub fn is_skip(&self) -> bool {
        self.extended
            .intersects(SurfaceExtended::SKIP | SurfaceExtended::HINTSKIP)
    }
}

/// A contents classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFlags {
    /// Game-native contents value.
    pub native: i32,
    pub extended: ExtendedContents,
    /// `_mirrorinside`: draw the inside faces as well. `None` = use the game default.
    pub mirror_inside: Option<bool>,
    /// Inverse of `_noclipfaces`: clip faces against brushes of the same type.
    pub clips_same_type: Option<bool>,
    /// `func_illusionary_visblocker`: non-solid that still blocks vis.
    pub illusionary_visblocker: bool,
}

impl ContentFlags {
    pub const fn new(native: i32) -> Self {
        Self {
            native,
            extended: ExtendedContents::empty(),
            mirror_inside: None,
            clips_same_type: None,
            illusionary_visblocker: false,
        }
    }

    pub const fn with_extended(native: i32, extended: ExtendedContents) -> Self {
        Self {
            native,
            extended,
            mirror_inside: None,
            clips_same_type: None,
            illusionary_visblocker: false,
        }
    }

    pub fn set_mirrored(&mut self, mirror_inside: Option<bool>) {
        self.mirror_inside = mirror_inside;
    }

    pub fn set_clips_same_type(&mut self, clips_same_type: Option<bool>) {
        self.clips_same_type = clips_same_type;
    }

    #[inline]
    pub fn is_detail_solid(&self) -> bool {
        self.extended.contains(ExtendedContents::DETAIL)
    }

    #[inline]
    pub fn is_detail_fence(&self) -> bool {
        self.extended.contains(ExtendedContents::DETAIL_FENCE)
    }

    #[inline]
    pub fn is_detail_illusionary(&self) -> bool {
        self.extended.contains(ExtendedContents::DETAIL_ILLUSIONARY)
    }
}

impl fmt::Display for ExtendedContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Per-category brush counters, accumulated while an entity is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub solid: usize,
    pub sky: usize,
    pub detail: usize,
    pub detail_illusionary: usize,
    pub detail_fence: usize,
    pub liquid: usize,
    pub other: usize,
}

impl ContentStats {
    pub fn total(&self) -> usize {
        self.solid
            + self.sky
            + self.detail
            + self.detail_illusionary
            + self.detail_fence
            + self.liquid
            + self.other
    }

    /// Logs every non-zero counter, `what` naming the counted things.
    pub fn log(&self, what: &str) {
        let rows = [
            (self.solid, "solid"),
            (self.sky, "sky"),
            (self.detail, "detail"),
            (self.detail_illusionary, "detail illusionary"),
            (self.detail_fence, "detail fence"),
            (self.liquid, "liquid"),
            (self.other, "other"),
        ];
        for (count, name) in rows {
            if count > 0 {
                log::info!("{count:8} {name} {what}");
            }
        }
    }
}
