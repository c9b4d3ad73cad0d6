// THEORY:
// The search slides each of the four pattern variants over every anchor
// position a worker is responsible for and records exact matches. A position
// matches only if *every* cell agrees, dead cells included.
//
// Anchors are restricted to the worker's own band rows. The pattern body may
// still extend into the halo below the band (that is what the halo is for), but
// a match whose top-left row belongs to another band is that band's match. The
// anchor must also leave room for the whole pattern inside the logical world.

use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec::MatchRecord;
use crate::core_modules::partition::Band;
use crate::core_modules::pattern::{Pattern, PatternSet, Rotation};

/// Appends every match of every rotation anchored in `band` to `out`.
///
/// Records are emitted rotation by rotation, then row-major, in 0-based
/// logical coordinates.
pub fn search_band(
    grid: &Grid,
    band: &Band,
    patterns: &PatternSet,
    generation: usize,
    out: &mut Vec<MatchRecord>,
) {
    for (rotation, pattern) in patterns.iter() {
        search_single(grid, band, pattern, rotation, generation, out);
    }
}

fn search_single(
    grid: &Grid,
    band: &Band,
    pattern: &Pattern,
    rotation: Rotation,
    generation: usize,
    out: &mut Vec<MatchRecord>,
) {
    let size = grid.logical_size();
    let p = pattern.size();
    if p > size {
        return;
    }
    // Last padded row/col where a pattern still fits.
    let last_anchor = size - p + 1;
    let rows = band.rows.start..band.rows.end.min(last_anchor + 1);

    for row in rows {
        for col in 1..=last_anchor {
            if matches_at(grid, pattern, row, col) {
                out.push(MatchRecord {
                    generation,
                    row: row - 1,
                    col: col - 1,
                    rotation,
                });
            }
        }
    }
}

fn matches_at(grid: &Grid, pattern: &Pattern, row: usize, col: usize) -> bool {
    let p = pattern.size();
    (0..p).all(|dr| &grid.row(row + dr)[col..col + p] == pattern.row(dr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::cell::cell::Cell;
    use crate::core_modules::partition::Partition;

    fn glider() -> Pattern {
        let rows = ["OXO", "OOX", "XXX"];
        let cells = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| Cell::from_char(c).unwrap()))
            .collect();
        Pattern::new(3, cells).unwrap()
    }

    /// Stamps `pattern` into a padded world with its top-left at 0-based (row, col).
    fn plant(world: &mut Grid, pattern: &Pattern, row: usize, col: usize) {
        for dr in 0..pattern.size() {
            for dc in 0..pattern.size() {
                world.set(row + 1 + dr, col + 1 + dc, pattern.get(dr, dc));
            }
        }
    }

    fn search_all(world: &Grid, workers: usize, patterns: &PatternSet) -> Vec<MatchRecord> {
        let partition = Partition::new(world.logical_size(), workers, patterns.size()).unwrap();
        let mut out = Vec::new();
        for band in partition.bands() {
            if band.is_empty() {
                continue;
            }
            let slice = world.window(band.view.clone()).unwrap();
            search_band(&slice, band, patterns, 0, &mut out);
        }
        out
    }

    #[test]
    fn finds_each_rotation_once() {
        let patterns = PatternSet::from_north(glider());
        for rotation in Rotation::ALL {
            let mut world = Grid::padded(12).unwrap();
            plant(&mut world, patterns.get(rotation), 4, 7);
            let found = search_all(&world, 1, &patterns);
            assert_eq!(
                found,
                vec![MatchRecord { generation: 0, row: 4, col: 7, rotation }]
            );
        }
    }

    #[test]
    fn straddling_match_is_reported_once() {
        let patterns = PatternSet::from_north(glider());
        // With 2 workers on 10 rows the band boundary sits between logical rows 4 and 5.
        for top in 2..=5 {
            let mut world = Grid::padded(10).unwrap();
            plant(&mut world, patterns.get(Rotation::East), top, 3);
            for workers in 1..=6 {
                let found = search_all(&world, workers, &patterns);
                assert_eq!(
                    found,
                    vec![MatchRecord { generation: 0, row: top, col: 3, rotation: Rotation::East }],
                    "top={top} workers={workers}"
                );
            }
        }
    }

    #[test]
    fn pattern_must_fit_inside_world() {
        // An all-dead pattern matches everywhere it fits, and nowhere past the edge.
        let dead = Pattern::new(2, vec![Cell::Dead; 4]).unwrap();
        let patterns = PatternSet::from_north(dead);
        let world = Grid::padded(3).unwrap();
        let found = search_all(&world, 2, &patterns);
        // 2x2 anchors in a 3x3 world, four identical rotations.
        assert_eq!(found.len(), 4 * 4);
        assert!(found.iter().all(|m| m.row <= 1 && m.col <= 1));
    }

    #[test]
    fn oversized_pattern_never_matches() {
        let patterns = PatternSet::from_north(Pattern::new(4, vec![Cell::Dead; 16]).unwrap());
        let world = Grid::padded(3).unwrap();
        assert!(search_all(&world, 1, &patterns).is_empty());
    }
}
