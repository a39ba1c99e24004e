//! Lattice-gas automaton (bounce-back walls, head-on collisions) with a
//! quad-tree macro-step engine and a flat reference lattice.

pub mod error;
pub mod hashgas;
pub mod lattice;

pub use error::GasError;
pub use hashgas::{HashGasConfig, HashGasLattice};
pub use lattice::{Cell, GasLattice, Lattice, LatticeConfig};
