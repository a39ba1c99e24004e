//! Lattice-gas rule and the flat reference lattice.

mod grid;
mod rules;

pub use grid::{GasLattice, LatticeConfig};
pub use rules::{Cell, collide, step1};

/// Read access to a square lattice of cells.
pub trait Lattice {
    /// Side length of the tracked square.
    fn size(&self) -> usize;

    /// Cell at `(x, y)`. Panics outside `[0, size)^2`.
    fn at(&self, x: usize, y: usize) -> Cell;
}

/// Total particles over all non-wall sites. The rule conserves this.
pub fn particle_count<L: Lattice + ?Sized>(lattice: &L) -> u64 {
    let n = lattice.size();
    let mut total = 0u64;
    for y in 0..n {
        for x in 0..n {
            total += lattice.at(x, y).particle_count() as u64;
        }
    }
    total
}

/// Average flow `(vx, vy)` over the `k x k` block starting at `(x0, y0)`.
///
/// Each `-X`/`-Y` bit counts -1 and each `+X`/`+Y` bit counts +1; walls
/// contribute nothing but still count toward the block area.
pub fn mean_flow<L: Lattice + ?Sized>(lattice: &L, x0: usize, y0: usize, k: usize) -> (f64, f64) {
    assert!(k > 0, "block size must be positive");
    let mut vx = 0i64;
    let mut vy = 0i64;
    for y in y0..y0 + k {
        for x in x0..x0 + k {
            let cell = lattice.at(x, y);
            vx += cell.has(Cell::X_POS) as i64 - cell.has(Cell::X_NEG) as i64;
            vy += cell.has(Cell::Y_POS) as i64 - cell.has(Cell::Y_NEG) as i64;
        }
    }
    let area = (k * k) as f64;
    (vx as f64 / area, vy as f64 / area)
}
