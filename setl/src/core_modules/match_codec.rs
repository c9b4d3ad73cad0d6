// THEORY:
// A match is one detected occurrence of a pattern variant: which generation,
// where its top-left corner sits (0-based logical coordinates), and which
// rotation matched. Workers ship matches to the coordinator every generation,
// so they travel as a single packed integer:
//
//     value = rotation * 10^8 + row * 10^4 + col
//
// Ordering packed values numerically is exactly ordering by (rotation, row,
// col), which is the order the timeline is published in. The encoding only
// holds while row and col stay below 10^4, so encoding checks its inputs and
// the pipeline rejects worlds that could ever produce larger coordinates.

use crate::core_modules::pattern::Rotation;
use crate::error::{Result, SetlError};
use std::fmt;

/// Exclusive upper bound on packed row and column values.
pub const COORD_LIMIT: usize = 10_000;
const ROTATION_SCALE: u32 = 100_000_000;
const ROW_SCALE: u32 = 10_000;

/// One detected occurrence, in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchRecord {
    pub generation: usize,
    pub row: usize,
    pub col: usize,
    pub rotation: Rotation,
}

impl MatchRecord {
    /// The key the timeline is ordered by within a generation.
    pub fn sort_key(&self) -> (Rotation, usize, usize) {
        (self.rotation, self.row, self.col)
    }

    pub fn pack(&self) -> Result<PackedMatch> {
        PackedMatch::encode(self.row, self.col, self.rotation)
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.generation, self.row, self.col, self.rotation
        )
    }
}

/// The wire form of a match. The generation is implied by the report it
/// travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackedMatch(u32);

impl PackedMatch {
    pub fn encode(row: usize, col: usize, rotation: Rotation) -> Result<Self> {
        check_coord("row", row)?;
        check_coord("col", col)?;
        Ok(Self(
            rotation.index() as u32 * ROTATION_SCALE + row as u32 * ROW_SCALE + col as u32,
        ))
    }

    pub fn decode(self) -> (usize, usize, Rotation) {
        let mut value = self.0;
        let col = (value % ROW_SCALE) as usize;
        value /= ROW_SCALE;
        let row = (value % ROW_SCALE) as usize;
        value /= ROW_SCALE;
        // Only `encode` builds these, so the rotation digit is always 0..=3.
        let rotation = Rotation::ALL[value as usize];
        (row, col, rotation)
    }

    pub fn into_record(self, generation: usize) -> MatchRecord {
        let (row, col, rotation) = self.decode();
        MatchRecord {
            generation,
            row,
            col,
            rotation,
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

fn check_coord(what: &'static str, value: usize) -> Result<()> {
    if value >= COORD_LIMIT {
        return Err(SetlError::EncodingOverflow {
            what,
            value,
            limit: COORD_LIMIT,
        });
    }
    Ok(())
}

/// Fails if a logical `size` x `size` world could yield unencodable coordinates.
pub fn check_world_size(size: usize) -> Result<()> {
    if size > COORD_LIMIT {
        return Err(SetlError::EncodingOverflow {
            what: "world size",
            value: size,
            limit: COORD_LIMIT,
        });
    }
    Ok(())
}
