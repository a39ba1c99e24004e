//! Node arena for the quad-tree.
//!
//! Nodes are immutable once pushed and are addressed by `NodeId`. With
//! interning enabled, structurally equal nodes share one id, which lets the
//! per-node step cache hit for every repeat of the same region.

use std::collections::HashMap;
use std::fmt;

use crate::lattice::Cell;

/// Deepest tree the arena will build. Side lengths stay well inside `usize`.
pub const MAX_LEVEL: u32 = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A square of side `2^level`: one cell, or four children one level down.
///
/// Children are ordered `c00, c10, c01, c11` (low-X/low-Y first, X varies
/// fastest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuadCell {
    Leaf(Cell),
    Node { level: u32, children: [NodeId; 4] },
}

impl QuadCell {
    #[inline]
    pub fn level(&self) -> u32 {
        match self {
            QuadCell::Leaf(_) => 0,
            QuadCell::Node { level, .. } => *level,
        }
    }
}

pub struct NodeArena {
    nodes: Vec<QuadCell>,
    /// Memoized center step, indexed like `nodes`.
    next: Vec<Option<NodeId>>,
    index: HashMap<QuadCell, NodeId>,
    /// All-wall subtree per level, built on demand.
    walls: Vec<NodeId>,
    intern: bool,
    memoize: bool,
}

impl NodeArena {
    pub fn new(intern: bool, memoize: bool) -> Self {
        Self {
            nodes: Vec::with_capacity(1_024),
            next: Vec::with_capacity(1_024),
            index: HashMap::new(),
            walls: Vec::new(),
            intern,
            memoize,
        }
    }

    fn push(&mut self, cell: QuadCell) -> NodeId {
        if self.intern {
            if let Some(&id) = self.index.get(&cell) {
                return id;
            }
        }
        let id = NodeId(
            u32::try_from(self.nodes.len()).expect("node arena exhausted the u32 id space"),
        );
        self.nodes.push(cell);
        self.next.push(None);
        if self.intern {
            self.index.insert(cell, id);
        }
        id
    }

    pub fn leaf(&mut self, cell: Cell) -> NodeId {
        self.push(QuadCell::Leaf(cell))
    }

    /// Compose four equal-level children into a node one level up.
    pub fn node(&mut self, c00: NodeId, c10: NodeId, c01: NodeId, c11: NodeId) -> NodeId {
        let level = self.level(c00);
        assert!(
            self.level(c10) == level && self.level(c01) == level && self.level(c11) == level,
            "children must share one level"
        );
        assert!(level < MAX_LEVEL, "quad-tree deeper than level {MAX_LEVEL}");
        self.push(QuadCell::Node {
            level: level + 1,
            children: [c00, c10, c01, c11],
        })
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> QuadCell {
        self.nodes[id.index()]
    }

    #[inline]
    pub fn level(&self, id: NodeId) -> u32 {
        self.nodes[id.index()].level()
    }

    /// Children of an internal node. Panics on a leaf.
    #[inline]
    pub fn children(&self, id: NodeId) -> [NodeId; 4] {
        match self.nodes[id.index()] {
            QuadCell::Node { children, .. } => children,
            QuadCell::Leaf(_) => panic!("leaf {id:?} has no children"),
        }
    }

    /// Value of a leaf. Panics on an internal node.
    #[inline]
    pub fn value(&self, id: NodeId) -> Cell {
        match self.nodes[id.index()] {
            QuadCell::Leaf(cell) => cell,
            QuadCell::Node { .. } => panic!("node {id:?} is not a leaf"),
        }
    }

    /// All-wall square of side `2^level`.
    pub fn wall(&mut self, level: u32) -> NodeId {
        while self.walls.len() <= level as usize {
            let id = match self.walls.last() {
                None => self.leaf(Cell::WALL),
                Some(&w) => self.node(w, w, w, w),
            };
            self.walls.push(id);
        }
        self.walls[level as usize]
    }

    #[inline]
    pub fn cached_next(&self, id: NodeId) -> Option<NodeId> {
        if self.memoize { self.next[id.index()] } else { None }
    }

    #[inline]
    pub fn store_next(&mut self, id: NodeId, result: NodeId) {
        if self.memoize {
            self.next[id.index()] = Some(result);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> NodeStats {
        let mut per_level = Vec::new();
        for node in &self.nodes {
            let level = node.level() as usize;
            if per_level.len() <= level {
                per_level.resize(level + 1, 0);
            }
            per_level[level] += 1;
        }
        NodeStats {
            nodes: self.nodes.len(),
            memoized: self.next.iter().filter(|n| n.is_some()).count(),
            per_level,
        }
    }

    /// Copy the tree under `root` into `target`, returning the new root id.
    pub fn copy_tree(&self, root: NodeId, target: &mut NodeArena) -> NodeId {
        let mut remap = HashMap::new();
        self.copy_rec(root, target, &mut remap)
    }

    fn copy_rec(
        &self,
        id: NodeId,
        target: &mut NodeArena,
        remap: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(&mapped) = remap.get(&id) {
            return mapped;
        }
        let mapped = match self.get(id) {
            QuadCell::Leaf(cell) => target.leaf(cell),
            QuadCell::Node { children, .. } => {
                let [c00, c10, c01, c11] = children.map(|c| self.copy_rec(c, target, remap));
                target.node(c00, c10, c01, c11)
            }
        };
        remap.insert(id, mapped);
        mapped
    }
}

/// Snapshot of arena occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStats {
    pub nodes: usize,
    /// Nodes with a cached center step.
    pub memoized: usize,
    /// Node count indexed by level.
    pub per_level: Vec<usize>,
}

impl fmt::Display for NodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "arena nodes={} memoized={}", self.nodes, self.memoized)?;
        for (level, count) in self.per_level.iter().enumerate() {
            if *count > 0 {
                writeln!(f, "  @{level}: {count}")?;
            }
        }
        Ok(())
    }
}
