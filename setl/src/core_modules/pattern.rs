// THEORY:
// A `Pattern` is the fixed shape being hunted for. The search looks for it in
// four orientations, named by compass direction: North is the pattern as read
// from the file, and each following direction is a further 90 degree clockwise
// turn of the previous one.
//
// The coordinator derives the four variants exactly once and ships them to the
// workers verbatim, so every worker searches for bit-identical shapes.

use crate::core_modules::cell::cell::Cell;
use crate::error::{Result, SetlError};
use std::fmt;

/// Orientation of a pattern variant. The discriminant is the value carried in
/// packed matches and printed in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rotation {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::North,
        Rotation::East,
        Rotation::South,
        Rotation::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Rotation> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// A square block of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    size: usize,
    cells: Vec<Cell>,
}

impl Pattern {
    pub fn new(size: usize, cells: Vec<Cell>) -> Result<Self> {
        if size == 0 {
            return Err(SetlError::InvalidConfig("pattern size must be at least 1".into()));
        }
        if cells.len() != size * size {
            return Err(SetlError::InvalidConfig(format!(
                "pattern of size {size} needs {} cells, got {}",
                size * size,
                cells.len()
            )));
        }
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.size + col]
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.size..(row + 1) * self.size]
    }

    /// Turns the pattern 90 degrees clockwise: `rotated[col][size-1-row] = self[row][col]`.
    pub fn rotate90(&self) -> Pattern {
        let n = self.size;
        let mut cells = vec![Cell::Dead; n * n];
        for row in 0..n {
            for col in 0..n {
                cells[col * n + (n - 1 - row)] = self.get(row, col);
            }
        }
        Pattern { size: n, cells }
    }
}

/// The four orientations of one pattern, indexed by `Rotation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    variants: [Pattern; 4],
}

impl PatternSet {
    /// Derives East, South and West from the North pattern.
    pub fn from_north(north: Pattern) -> Self {
        let east = north.rotate90();
        let south = east.rotate90();
        let west = south.rotate90();
        Self {
            variants: [north, east, south, west],
        }
    }

    /// Reassembles a set received over the wire, rejecting mismatched sizes.
    pub fn from_variants(variants: [Pattern; 4]) -> Result<Self> {
        let size = variants[0].size();
        if variants.iter().any(|p| p.size() != size) {
            return Err(SetlError::InvalidConfig(
                "pattern variants have different sizes".into(),
            ));
        }
        Ok(Self { variants })
    }

    pub fn size(&self) -> usize {
        self.variants[0].size()
    }

    pub fn get(&self, rotation: Rotation) -> &Pattern {
        &self.variants[rotation.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rotation, &Pattern)> {
        Rotation::ALL.into_iter().zip(self.variants.iter())
    }
}
