//! Error types for lattice construction.
//!
//! Contract violations (out-of-range queries, stepping a node below level 2,
//! mismatched child levels) panic instead of returning these.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GasError {
    /// A lattice needs at least one cell.
    #[error("lattice must contain at least one cell")]
    EmptyLattice,

    /// Row-major input was not a square grid.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Raw value outside `-1..=15`.
    #[error("invalid cell value {0} (expected -1 for a wall or 0..=15)")]
    InvalidCell(i32),

    /// The quad-tree for this lattice would exceed the supported depth.
    #[error("lattice of side {size} needs level {level}, which exceeds the maximum of {max}")]
    LevelTooLarge { size: usize, level: u32, max: u32 },
}
