//! Fatal compilation errors.

use crate::Hull;

/// Errors that abort the whole compilation.
///
/// Recoverable geometry problems (off-plane points, degenerate edges, mixed
/// contents) are logged as warnings and never surface here.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum CompileError {
    /// A face point lies outside the representable world.
    #[error("line {line}: coordinate out of range ({value})")]
    CoordinateOutOfRange {
        /// Source line of the offending face.
        line: usize,
        /// The out-of-range coordinate.
        value: f64,
    },
    /// The game policy produced a contents value it considers invalid.
    #[error("line {line}: invalid brush contents {contents}")]
    InvalidContents {
        /// Source line of the brush.
        line: usize,
        /// Printable form of the rejected contents.
        contents: String,
    },
    /// A hull other than the draw hull ended up with no brushes.
    #[error("entity {classname} has no valid brushes for {hull}")]
    EmptyCollisionHull {
        /// Classname of the entity.
        classname: String,
        /// The hull being built.
        hull: Hull,
    },
    /// The configured game name is not known.
    #[error("unknown game \"{0}\"")]
    UnknownGame(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, CompileError>;
