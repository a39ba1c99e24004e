//! Cell encoding and the streaming/collision rule.

use std::fmt;

use crate::error::GasError;

/// One lattice site: the wall sentinel or a 4-bit flow field.
///
/// Bit layout (LSB first): `X-`, `X+`, `Y-`, `Y+`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell(u8);

impl Cell {
    pub const X_NEG: u8 = 1;
    pub const X_POS: u8 = 2;
    pub const Y_NEG: u8 = 4;
    pub const Y_POS: u8 = 8;

    pub const EMPTY: Cell = Cell(0);
    pub const WALL: Cell = Cell(WALL_BITS);

    /// Head-on pair along X.
    pub const HEAD_ON_X: Cell = Cell(Self::X_NEG | Self::X_POS);
    /// Head-on pair along Y.
    pub const HEAD_ON_Y: Cell = Cell(Self::Y_NEG | Self::Y_POS);

    #[inline]
    pub const fn new(bits: u8) -> Self {
        assert!(bits <= FLOW_MASK, "flow field has only four bits");
        Cell(bits)
    }

    /// Raw flow bits. Zero for walls.
    #[inline(always)]
    pub const fn bits(self) -> u8 {
        if self.is_wall() { 0 } else { self.0 }
    }

    #[inline(always)]
    pub const fn is_wall(self) -> bool {
        self.0 == WALL_BITS
    }

    #[inline(always)]
    pub const fn has(self, bit: u8) -> bool {
        !self.is_wall() && self.0 & bit != 0
    }

    /// Number of particles at this site.
    #[inline]
    pub const fn particle_count(self) -> u32 {
        self.bits().count_ones()
    }
}

const FLOW_MASK: u8 = 0x0f;
const WALL_BITS: u8 = 0xff;

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wall() {
            f.write_str("Cell(WALL)")
        } else {
            write!(f, "Cell({:#06b})", self.0)
        }
    }
}

impl TryFrom<i32> for Cell {
    type Error = GasError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(Cell::WALL),
            0..=15 => Ok(Cell(raw as u8)),
            other => Err(GasError::InvalidCell(other)),
        }
    }
}

impl From<Cell> for i32 {
    fn from(cell: Cell) -> i32 {
        if cell.is_wall() { -1 } else { cell.0 as i32 }
    }
}

/// Incoming bit from a neighbor, or the reflected own bit when the
/// neighbor is a wall.
#[inline(always)]
fn incoming(neighbor: Cell, neighbor_bit: u8, own: Cell, reflected_bit: u8) -> bool {
    if neighbor.is_wall() {
        own.0 & reflected_bit != 0
    } else {
        neighbor.0 & neighbor_bit != 0
    }
}

/// Advance one site by a tick given its four neighbors.
#[inline]
pub fn step1(left: Cell, right: Cell, bottom: Cell, top: Cell, own: Cell) -> Cell {
    if own.is_wall() {
        return Cell::WALL;
    }

    let mut s = 0u8;
    if incoming(left, Cell::X_POS, own, Cell::X_NEG) {
        s |= Cell::X_POS;
    }
    if incoming(right, Cell::X_NEG, own, Cell::X_POS) {
        s |= Cell::X_NEG;
    }
    if incoming(bottom, Cell::Y_POS, own, Cell::Y_NEG) {
        s |= Cell::Y_POS;
    }
    if incoming(top, Cell::Y_NEG, own, Cell::Y_POS) {
        s |= Cell::Y_NEG;
    }

    Cell(collide(s))
}

/// Head-on pairs rotate by 90 degrees; everything else passes through.
#[inline(always)]
pub const fn collide(bits: u8) -> u8 {
    match bits {
        3 => 12,
        12 => 3,
        other => other,
    }
}
