//! Brush loading for a Quake-family BSP compiler.
//!
//! Turns the convex brushes of a parsed map into per-hull brush lists: faces
//! are validated and healed, brush contents are classified through a
//! [`GamePolicy`], and entity rules decide which brushes each hull keeps.
//! Collision brushes can be exported with bevel planes or as a BSPX lump.

mod aabb;
mod error;
mod game;
mod options;
mod plane;
mod plane_table;
mod winding;

pub mod bevel;
pub mod brush;
pub mod bspx;
pub mod contents;
pub mod entity;
pub mod face;
pub mod hull;
pub mod map;

pub use aabb::Aabb;
pub use brush::Brush;
pub use contents::{ContentFlags, ContentStats};
pub use error::{CompileError, Result};
pub use game::{GameId, GamePolicy, HullSize, Quake2Policy, QuakePolicy};
pub use hull::{CollectingVisitor, CompileContext, FnVisitor, Hull, HullVisitor};
pub use options::Options;
pub use plane::{
    snap_vector, Classification, Plane, PlaneSide, PlaneType, DIST_EPSILON, NORMAL_EPSILON, ON_EPSILON,
};
pub use plane_table::PlaneTable;
pub use winding::Winding;
