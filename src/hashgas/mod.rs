//! Quad-tree lattice-gas engine advanced by recursive macro-steps.

mod arena;
mod engine;

pub use arena::{MAX_LEVEL, NodeArena, NodeId, NodeStats, QuadCell};
pub use engine::{HashGasConfig, HashGasLattice, advance_center};
