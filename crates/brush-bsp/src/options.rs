use serde::{Deserialize, Serialize};

use crate::GameId;

/// Compiler settings.
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Distance below which points are considered coincident or on-plane.
    pub epsilon: f64,
    /// Largest absolute coordinate accepted in a face.
    pub world_extent: f64,
    pub game: GameId,
    /// Treat detail brushes as structural.
    pub nodetail: bool,
    /// Drop `func_detail` brushes.
    pub omitdetail: bool,
    /// Drop `func_detail_illusionary` brushes.
    pub omitdetailillusionary: bool,
    /// Drop `func_detail_fence` brushes.
    pub omitdetailfence: bool,
    /// Only build the draw hull.
    pub noclip: bool,
    /// Write the BSPX brush list lump.
    pub bspx_brushes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            epsilon: 0.0001,
            world_extent: 65536.0,
            game: GameId::Quake,
            nodetail: false,
            omitdetail: false,
            omitdetailillusionary: false,
            omitdetailfence: false,
            noclip: false,
            bspx_brushes: false,
        }
    }
}
