//! Recursive macro-step and the region tracker built on it.

use super::arena::{MAX_LEVEL, NodeArena, NodeId, NodeStats, QuadCell};
use crate::error::GasError;
use crate::lattice::{Cell, Lattice, step1};

/// Levels kept free above the seed so padding never hits `MAX_LEVEL`.
const GROWTH_HEADROOM: u32 = 4;

/// Configuration for a `HashGasLattice`.
///
/// `HashGasConfig::default()` interns nodes and memoizes steps, which is
/// what makes repeated regions cheap. Turning either off never changes
/// results, only cost.
#[derive(Clone, Debug)]
pub struct HashGasConfig {
    /// Share one node id between structurally equal subtrees.
    pub intern: bool,
    /// Cache the center step of every node that has been advanced.
    pub memoize: bool,
    /// Rebuild the arena from the live tree once it holds more nodes than
    /// this. `None` keeps every node ever built.
    pub compact_threshold: Option<usize>,
}

impl Default for HashGasConfig {
    fn default() -> Self {
        Self {
            intern: true,
            memoize: true,
            compact_threshold: None,
        }
    }
}

impl HashGasConfig {
    pub fn intern(mut self, enabled: bool) -> Self {
        self.intern = enabled;
        self
    }

    pub fn memoize(mut self, enabled: bool) -> Self {
        self.memoize = enabled;
        self
    }

    pub fn compact_threshold(mut self, nodes: usize) -> Self {
        self.compact_threshold = Some(nodes.max(1));
        self
    }
}

/// Center quadrant of `cell` advanced by `2^(level-2)` ticks.
///
/// The result is one level below `cell`. Panics when `cell` is below level 2.
pub fn advance_center(arena: &mut NodeArena, cell: NodeId) -> NodeId {
    let level = arena.level(cell);
    assert!(level >= 2, "advance_center needs level >= 2, got {level}");
    if let Some(cached) = arena.cached_next(cell) {
        return cached;
    }
    let result = if level == 2 {
        step_block4(arena, cell)
    } else {
        step_recursive(arena, cell)
    };
    arena.store_next(cell, result);
    result
}

/// Grandchildren of a node laid out as a 4x4 grid, `g[y][x]`.
fn grandchildren(arena: &NodeArena, cell: NodeId) -> [[NodeId; 4]; 4] {
    let mut g = [[cell; 4]; 4];
    for (q, child) in arena.children(cell).into_iter().enumerate() {
        let (qx, qy) = (q & 1, q >> 1);
        for (i, grand) in arena.children(child).into_iter().enumerate() {
            g[qy * 2 + (i >> 1)][qx * 2 + (i & 1)] = grand;
        }
    }
    g
}

/// One tick of the four center leaves of a 4x4 block.
fn step_block4(arena: &mut NodeArena, cell: NodeId) -> NodeId {
    let leaves = grandchildren(arena, cell);
    let v = leaves.map(|row| row.map(|leaf| arena.value(leaf)));
    let tick = |x: usize, y: usize| {
        step1(v[y][x - 1], v[y][x + 1], v[y - 1][x], v[y + 1][x], v[y][x])
    };

    let c00 = arena.leaf(tick(1, 1));
    let c10 = arena.leaf(tick(2, 1));
    let c01 = arena.leaf(tick(1, 2));
    let c11 = arena.leaf(tick(2, 2));
    arena.node(c00, c10, c01, c11)
}

fn step_recursive(arena: &mut NodeArena, cell: NodeId) -> NodeId {
    let [c00, c10, c01, c11] = arena.children(cell);
    let g = grandchildren(arena, cell);

    // First half: nine overlapping windows, three per axis, each offset by
    // one grandchild. Corner windows are the children themselves.
    let mut t = [[cell; 3]; 3];
    for y in 0..3 {
        for x in 0..3 {
            let window = match (x, y) {
                (0, 0) => c00,
                (2, 0) => c10,
                (0, 2) => c01,
                (2, 2) => c11,
                _ => arena.node(g[y][x], g[y][x + 1], g[y + 1][x], g[y + 1][x + 1]),
            };
            t[y][x] = advance_center(arena, window);
        }
    }

    // Second half: four windows over the nine intermediate results.
    let mut out = [[cell; 2]; 2];
    for y in 0..2 {
        for x in 0..2 {
            let window = arena.node(t[y][x], t[y][x + 1], t[y + 1][x], t[y + 1][x + 1]);
            out[y][x] = advance_center(arena, window);
        }
    }

    arena.node(out[0][0], out[0][1], out[1][0], out[1][1])
}

/// Lattice-gas snapshot advanced by macro-steps.
///
/// Tracks a fixed `width x height` region of interest inside a quad-tree that
/// grows with wall padding as needed. Between calls the region always lies
/// inside the tree: `origin + extent <= 2^level` on both axes.
pub struct HashGasLattice {
    arena: NodeArena,
    root: NodeId,
    origin_x: usize,
    origin_y: usize,
    width: usize,
    height: usize,
    elapsed: u64,
    config: HashGasConfig,
}

impl HashGasLattice {
    /// Seed from a square lattice; sites outside it are walls.
    pub fn build<L: Lattice + ?Sized>(lattice: &L) -> Result<Self, GasError> {
        Self::build_with_config(lattice, HashGasConfig::default())
    }

    pub fn build_with_config<L: Lattice + ?Sized>(
        lattice: &L,
        config: HashGasConfig,
    ) -> Result<Self, GasError> {
        let n = lattice.size();
        if n == 0 {
            return Err(GasError::EmptyLattice);
        }
        let max = MAX_LEVEL - GROWTH_HEADROOM;
        let level = n
            .checked_next_power_of_two()
            .map_or(usize::BITS, |side| side.trailing_zeros());
        if level > max {
            return Err(GasError::LevelTooLarge { size: n, level, max });
        }

        let mut arena = NodeArena::new(config.intern, config.memoize);
        let root = seed(&mut arena, lattice, level, 0, 0);
        Ok(Self {
            arena,
            root,
            origin_x: 0,
            origin_y: 0,
            width: n,
            height: n,
            elapsed: 0,
            config,
        })
    }

    /// Pad, then advance by `2^(level-2)` ticks. Returns the ticks advanced.
    pub fn advance(&mut self) -> u64 {
        self.grow_until_steppable();

        let q = 1usize << (self.level() - 2);
        self.root = advance_center(&mut self.arena, self.root);
        self.origin_x -= q;
        self.origin_y -= q;
        self.elapsed += q as u64;
        debug_assert!(self.region_in_bounds());

        if let Some(limit) = self.config.compact_threshold {
            if self.arena.len() > limit {
                self.compact();
            }
        }
        q as u64
    }

    /// Advance until at least `ticks` more ticks have elapsed.
    ///
    /// Overshoots by whatever the last macro-step covers; returns the ticks
    /// actually advanced.
    pub fn advance_at_least(&mut self, ticks: u64) -> u64 {
        let start = self.elapsed;
        while self.elapsed - start < ticks {
            self.advance();
        }
        self.elapsed - start
    }

    /// Wrap the tree in wall quadrants until one macro-step covers the
    /// region.
    ///
    /// On even levels the tree becomes the low corner; on odd levels the
    /// high corner, shifting the origin by the old side. Alternating keeps
    /// the region near the center as the tree grows.
    pub fn grow_until_steppable(&mut self) {
        assert!(
            self.region_in_bounds(),
            "region ({}, {}) {}x{} escaped a level {} snapshot",
            self.origin_x,
            self.origin_y,
            self.width,
            self.height,
            self.level()
        );

        while !self.is_steppable() {
            let level = self.level();
            let wall = self.arena.wall(level);
            if level % 2 == 0 {
                self.root = self.arena.node(self.root, wall, wall, wall);
            } else {
                self.root = self.arena.node(wall, wall, wall, self.root);
                let side = 1usize << level;
                self.origin_x += side;
                self.origin_y += side;
            }
        }
    }

    /// Whether the region sits inside the middle half of the tree on both
    /// axes, the part a single `advance_center` produces.
    pub fn is_steppable(&self) -> bool {
        let level = self.level();
        if level < 2 {
            return false;
        }
        let q = 1usize << (level - 2);
        q <= self.origin_x
            && q <= self.origin_y
            && self.origin_x + self.width <= 3 * q
            && self.origin_y + self.height <= 3 * q
    }

    fn region_in_bounds(&self) -> bool {
        let side = 1usize << self.level();
        self.origin_x + self.width <= side && self.origin_y + self.height <= side
    }

    /// Cell at region-local `(x, y)`. Panics outside the region.
    pub fn cell_at(&self, x: usize, y: usize) -> Cell {
        assert!(
            x < self.width && y < self.height,
            "({x},{y}) outside the {}x{} region",
            self.width,
            self.height
        );
        let mut px = self.origin_x + x;
        let mut py = self.origin_y + y;
        let mut id = self.root;
        loop {
            match self.arena.get(id) {
                QuadCell::Leaf(cell) => return cell,
                QuadCell::Node { level, children } => {
                    let half = 1usize << (level - 1);
                    let high_x = px >= half;
                    let high_y = py >= half;
                    if high_x {
                        px -= half;
                    }
                    if high_y {
                        py -= half;
                    }
                    id = children[high_x as usize | (high_y as usize) << 1];
                }
            }
        }
    }

    /// Drop every node not reachable from the current root, along with the
    /// step cache.
    pub fn compact(&mut self) {
        let mut fresh = NodeArena::new(self.config.intern, self.config.memoize);
        self.root = self.arena.copy_tree(self.root, &mut fresh);
        self.arena = fresh;
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed
    }

    pub fn level(&self) -> u32 {
        self.arena.level(self.root)
    }

    /// Lower corner of the region in snapshot coordinates.
    pub fn origin(&self) -> (usize, usize) {
        (self.origin_x, self.origin_y)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stats(&self) -> NodeStats {
        self.arena.stats()
    }
}

fn seed<L: Lattice + ?Sized>(
    arena: &mut NodeArena,
    lattice: &L,
    level: u32,
    x0: usize,
    y0: usize,
) -> NodeId {
    let n = lattice.size();
    if x0 >= n || y0 >= n {
        return arena.wall(level);
    }
    if level == 0 {
        return arena.leaf(lattice.at(x0, y0));
    }
    let half = 1usize << (level - 1);
    let c00 = seed(arena, lattice, level - 1, x0, y0);
    let c10 = seed(arena, lattice, level - 1, x0 + half, y0);
    let c01 = seed(arena, lattice, level - 1, x0, y0 + half);
    let c11 = seed(arena, lattice, level - 1, x0 + half, y0 + half);
    arena.node(c00, c10, c01, c11)
}

impl Lattice for HashGasLattice {
    fn size(&self) -> usize {
        self.width
    }

    fn at(&self, x: usize, y: usize) -> Cell {
        self.cell_at(x, y)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::{HashGasConfig, HashGasLattice, advance_center, seed};
    use crate::hashgas::arena::{NodeArena, NodeId};
    use crate::lattice::{Cell, GasLattice, Lattice, step1};

    fn random_cell(rng: &mut rand::rngs::StdRng) -> Cell {
        if rng.random_bool(0.1) {
            Cell::WALL
        } else {
            Cell::new(rng.random_range(0u8..16))
        }
    }

    fn random_block(side: usize, seed: u64) -> Vec<Vec<Cell>> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..side)
            .map(|_| (0..side).map(|_| random_cell(&mut rng)).collect())
            .collect()
    }

    /// Step a finite block `ticks` times. Sites within `ticks` of the edge
    /// are unreliable afterwards; the rest are exact.
    fn brute_force(block: &[Vec<Cell>], ticks: usize) -> Vec<Vec<Cell>> {
        let side = block.len();
        let mut cur = block.to_vec();
        for _ in 0..ticks {
            let read = |x: isize, y: isize| {
                if x < 0 || y < 0 || x >= side as isize || y >= side as isize {
                    Cell::WALL
                } else {
                    cur[y as usize][x as usize]
                }
            };
            let mut next = cur.clone();
            for (y, row) in next.iter_mut().enumerate() {
                for (x, out) in row.iter_mut().enumerate() {
                    let (xi, yi) = (x as isize, y as isize);
                    *out = step1(
                        read(xi - 1, yi),
                        read(xi + 1, yi),
                        read(xi, yi - 1),
                        read(xi, yi + 1),
                        cur[y][x],
                    );
                }
            }
            cur = next;
        }
        cur
    }

    fn build_block(arena: &mut NodeArena, block: Vec<Vec<Cell>>) -> NodeId {
        let side = block.len();
        let level = side.trailing_zeros();
        let lattice = GasLattice::from_rows(&block).unwrap();
        seed(arena, &lattice, level, 0, 0)
    }

    fn read_node(arena: &NodeArena, id: NodeId, x: usize, y: usize) -> Cell {
        let level = arena.level(id);
        if level == 0 {
            return arena.value(id);
        }
        let half = 1usize << (level - 1);
        let children = arena.children(id);
        let q = (x >= half) as usize | ((y >= half) as usize) << 1;
        read_node(arena, children[q], x % half, y % half)
    }

    #[test]
    fn advance_center_matches_brute_force_window() {
        for level in 2u32..=5 {
            for seed_value in 0..4u64 {
                let side = 1usize << level;
                let block = random_block(side, seed_value * 31 + level as u64);
                let ticks = 1usize << (level - 2);
                let expected = brute_force(&block, ticks);

                for (intern, memoize) in [(true, true), (false, false)] {
                    let mut arena = NodeArena::new(intern, memoize);
                    let root = build_block(&mut arena, block.clone());
                    let result = advance_center(&mut arena, root);
                    assert_eq!(arena.level(result), level - 1);

                    let quarter = side / 4;
                    for y in 0..side / 2 {
                        for x in 0..side / 2 {
                            assert_eq!(
                                read_node(&arena, result, x, y),
                                expected[y + quarter][x + quarter],
                                "level {level} seed {seed_value} at ({x},{y})"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn memoized_step_is_reused() {
        let mut arena = NodeArena::new(true, true);
        let root = build_block(&mut arena, random_block(8, 5));
        let first = advance_center(&mut arena, root);
        let nodes = arena.len();
        let second = advance_center(&mut arena, root);
        assert_eq!(first, second);
        assert_eq!(arena.len(), nodes);
    }

    #[test]
    #[should_panic(expected = "advance_center needs level >= 2")]
    fn advance_center_rejects_small_nodes() {
        let mut arena = NodeArena::new(true, true);
        let leaf = arena.leaf(Cell::EMPTY);
        let node = arena.node(leaf, leaf, leaf, leaf);
        advance_center(&mut arena, node);
    }

    #[test]
    fn seeding_pads_with_walls() {
        let lattice = GasLattice::random(3, 0.5, 1).unwrap();
        let hash = HashGasLattice::build(&lattice).unwrap();
        assert_eq!(hash.level(), 2);
        assert_eq!(hash.origin(), (0, 0));
        assert_eq!((hash.width(), hash.height()), (3, 3));
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(hash.cell_at(x, y), lattice.at(x, y));
            }
        }
        assert_eq!(read_node(&hash.arena, hash.root, 3, 0), Cell::WALL);
        assert_eq!(read_node(&hash.arena, hash.root, 1, 3), Cell::WALL);
    }

    #[test]
    fn growth_alternates_corner_by_parity() {
        let lattice = GasLattice::new(2).unwrap();
        let mut hash = HashGasLattice::build(&lattice).unwrap();
        assert_eq!(hash.level(), 1);
        hash.grow_until_steppable();
        // Level 1 (odd) moved the tree high, level 2 (even) kept it low.
        assert_eq!(hash.level(), 3);
        assert_eq!(hash.origin(), (2, 2));
        assert!(hash.is_steppable());
    }

    #[test]
    fn compaction_keeps_the_tree_and_drops_garbage() {
        let lattice = GasLattice::random(16, 0.4, 3).unwrap();
        let mut hash = HashGasLattice::build(&lattice).unwrap();
        hash.advance();
        hash.advance();
        let before = hash.stats().nodes;
        let cells: Vec<Cell> = (0..16 * 16).map(|i| hash.cell_at(i % 16, i / 16)).collect();

        hash.compact();

        assert!(hash.stats().nodes < before);
        assert_eq!(hash.stats().memoized, 0);
        for (i, cell) in cells.into_iter().enumerate() {
            assert_eq!(hash.cell_at(i % 16, i / 16), cell);
        }
    }

    #[test]
    fn compaction_threshold_bounds_the_arena() {
        let lattice = GasLattice::random(16, 0.4, 8).unwrap();
        let config = HashGasConfig::default().compact_threshold(64);
        let mut hash = HashGasLattice::build_with_config(&lattice, config).unwrap();
        for _ in 0..4 {
            hash.advance();
            let live = hash.stats().nodes;
            let mut copy = NodeArena::new(true, true);
            let reachable = hash.arena.copy_tree(hash.root, &mut copy);
            assert_eq!(copy.level(reachable), hash.level());
            assert!(live <= 64 || live == copy.len(), "arena kept {live} nodes");
        }
    }

    #[test]
    #[should_panic(expected = "outside the 4x4 region")]
    fn cell_at_rejects_out_of_range() {
        let lattice = GasLattice::new(4).unwrap();
        let hash = HashGasLattice::build(&lattice).unwrap();
        hash.cell_at(0, 4);
    }
}
