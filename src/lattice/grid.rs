//! Flat reference lattice, stepped one tick at a time.
//!
//! Every site is rewritten from the previous grid on each tick; sites outside
//! the square read as walls, which gives bounce-back at the domain edge.

use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::Lattice;
use super::rules::{Cell, step1};
use crate::error::GasError;

/// Lattices smaller than this (per side) step serially by default.
const DEFAULT_PARALLEL_MIN_SIDE: usize = 256;

/// Configuration for the reference lattice's row scheduler.
#[derive(Clone, Debug)]
pub struct LatticeConfig {
    /// Threads for the row pool. `None` means one per physical core.
    pub thread_count: Option<usize>,
    /// Side length at which stepping switches to the row pool.
    pub parallel_min_side: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            thread_count: None,
            parallel_min_side: DEFAULT_PARALLEL_MIN_SIDE,
        }
    }
}

impl LatticeConfig {
    /// Set an explicit thread count for the row pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    /// Step in parallel once the side reaches `side`.
    pub fn parallel_min_side(mut self, side: usize) -> Self {
        self.parallel_min_side = side.max(1);
        self
    }
}

fn resolve_thread_count(config: &LatticeConfig) -> usize {
    config
        .thread_count
        .unwrap_or_else(num_cpus::get_physical)
        .max(1)
}

pub struct GasLattice {
    n: usize,
    timestep: u64,
    /// Row-major, `cells[y * n + x]`.
    cells: Vec<Cell>,
    scratch: Vec<Cell>,
    pool: Option<rayon::ThreadPool>,
}

impl GasLattice {
    /// An empty `n x n` lattice.
    pub fn new(n: usize) -> Result<Self, GasError> {
        Self::with_config(n, LatticeConfig::default())
    }

    pub fn with_config(n: usize, config: LatticeConfig) -> Result<Self, GasError> {
        if n == 0 {
            return Err(GasError::EmptyLattice);
        }
        let pool = if n >= config.parallel_min_side {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(resolve_thread_count(&config))
                .build()
                .expect("failed to build lattice rayon thread pool");
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            n,
            timestep: 0,
            cells: vec![Cell::EMPTY; n * n],
            scratch: vec![Cell::EMPTY; n * n],
            pool,
        })
    }

    /// Build from row-major rows, `rows[y][x]`.
    pub fn from_rows(rows: &[Vec<Cell>]) -> Result<Self, GasError> {
        let n = rows.len();
        let mut lattice = Self::new(n)?;
        for (y, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(GasError::RaggedRows {
                    row: y,
                    expected: n,
                    found: row.len(),
                });
            }
            lattice.cells[y * n..(y + 1) * n].copy_from_slice(row);
        }
        Ok(lattice)
    }

    /// Random gas at `temperature` with a `+X` inflow stripe on the left edge.
    pub fn random(n: usize, temperature: f64, seed: u64) -> Result<Self, GasError> {
        Self::random_with_config(n, temperature, seed, LatticeConfig::default())
    }

    pub fn random_with_config(
        n: usize,
        temperature: f64,
        seed: u64,
        config: LatticeConfig,
    ) -> Result<Self, GasError> {
        let mut lattice = Self::with_config(n, config)?;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let tenth = n / 10;
        for x in 0..n {
            for y in 0..n {
                let cell = if x < tenth && tenth * 4 < y && y < tenth * 6 {
                    Cell::new(Cell::X_POS)
                } else if rng.random::<f64>() < temperature {
                    Cell::new(rng.random_range(1u8..16))
                } else {
                    Cell::EMPTY
                };
                lattice.cells[y * n + x] = cell;
            }
        }
        Ok(lattice)
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        assert!(x < self.n && y < self.n, "({x},{y}) outside {0}x{0} lattice", self.n);
        self.cells[y * self.n + x] = cell;
    }

    pub fn step(&mut self) {
        let n = self.n;
        let current = &self.cells;
        match &self.pool {
            Some(pool) => pool.install(|| {
                self.scratch
                    .par_chunks_mut(n)
                    .enumerate()
                    .for_each(|(y, row)| step_row(current, n, y, row));
            }),
            None => {
                for (y, row) in self.scratch.chunks_mut(n).enumerate() {
                    step_row(current, n, y, row);
                }
            }
        }
        std::mem::swap(&mut self.cells, &mut self.scratch);
        self.timestep += 1;
    }

    pub fn step_n(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }
}

#[inline]
fn step_row(current: &[Cell], n: usize, y: usize, row: &mut [Cell]) {
    let read = |x: usize, y: usize| current[y * n + x];
    for (x, out) in row.iter_mut().enumerate() {
        let left = if x > 0 { read(x - 1, y) } else { Cell::WALL };
        let right = if x + 1 < n { read(x + 1, y) } else { Cell::WALL };
        let bottom = if y > 0 { read(x, y - 1) } else { Cell::WALL };
        let top = if y + 1 < n { read(x, y + 1) } else { Cell::WALL };
        *out = step1(left, right, bottom, top, read(x, y));
    }
}

impl Lattice for GasLattice {
    fn size(&self) -> usize {
        self.n
    }

    fn at(&self, x: usize, y: usize) -> Cell {
        assert!(x < self.n && y < self.n, "({x},{y}) outside {0}x{0} lattice", self.n);
        self.cells[y * self.n + x]
    }
}
