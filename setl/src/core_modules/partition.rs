// THEORY:
// The partitioner is the single source of truth for "who owns which rows".
// It is a pure function of (world size S, worker count W, pattern size P), so
// the coordinator and every worker compute the exact same layout locally and
// no layout ever needs to be transmitted.
//
// Key architectural principles:
// 1.  **Exclusive evolution**: rows 1..=S of the padded world are split into W
//     contiguous bands in rank order. The first `S mod W` bands get one extra
//     row. Every row is evolved by exactly one worker.
// 2.  **Overlapping visibility**: a pattern whose top-left corner is in a band
//     can reach P-1 rows past the band's end, and evolving the band's edge rows
//     needs one row on each side. The union of those needs is the worker's
//     *view*; the part of the view outside its own band is its *halo*.
// 3.  **Exclusive reporting**: a match is reported only by the worker whose band
//     holds the match's top-left row, so a match visible to two workers is
//     still reported once.
// 4.  **Halo plan**: every halo row inside the logical world belongs to exactly
//     one band, so the set of (from, to, rows) transfers needed each generation
//     is also derived here. With bands at least P-1 rows tall these links only
//     join row-adjacent neighbours; thinner bands pull rows from further away.
// 5.  **Asymmetric halo**: searches only read downward from their anchor, so
//     the halo above a band is the single row evolution needs, while the halo
//     below is max(1, P-1) rows.

use crate::error::{Result, SetlError};
use std::ops::Range;

/// One worker's share of the world, in global padded row numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub rank: usize,
    /// Rows this worker evolves and owns matches for.
    pub rows: Range<usize>,
    /// Rows a pattern anchored in `rows` may touch.
    pub search_rows: Range<usize>,
    /// Everything the worker holds locally: band, halo and any frame rows.
    pub view: Range<usize>,
}

impl Band {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A block of rows that `from` must send to `to` after every evolve step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloLink {
    pub from: usize,
    pub to: usize,
    pub rows: Range<usize>,
}

/// The complete row layout for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    size: usize,
    pattern_size: usize,
    bands: Vec<Band>,
}

impl Partition {
    pub fn new(size: usize, workers: usize, pattern_size: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SetlError::InvalidConfig("at least one worker is required".into()));
        }
        let base = size / workers;
        let extra = size % workers;
        let overlap = pattern_size.saturating_sub(1);

        let mut bands = Vec::with_capacity(workers);
        let mut start = 1;
        for rank in 0..workers {
            let height = base + usize::from(rank < extra);
            let end = start + height;
            let search_end = (end + overlap).min(size + 1);
            let view = if height == 0 {
                start..start
            } else {
                start - 1..(end + 1).max(search_end)
            };
            bands.push(Band {
                rank,
                rows: start..end,
                search_rows: start..search_end,
                view,
            });
            start = end;
        }

        Ok(Self {
            size,
            pattern_size,
            bands,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pattern_size(&self) -> usize {
        self.pattern_size
    }

    pub fn workers(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, rank: usize) -> Option<&Band> {
        self.bands.get(rank)
    }

    /// Every per-generation halo transfer, ordered by receiver then row.
    pub fn halo_links(&self) -> Vec<HaloLink> {
        let logical = 1..self.size + 1;
        let mut links = Vec::new();
        for target in &self.bands {
            if target.is_empty() {
                continue;
            }
            let above = target.view.start..target.rows.start;
            let below = target.rows.end..target.view.end;
            for wanted in [above, below] {
                let wanted = intersect(&wanted, &logical);
                if wanted.is_empty() {
                    continue;
                }
                for source in &self.bands {
                    let rows = intersect(&wanted, &source.rows);
                    if !rows.is_empty() {
                        links.push(HaloLink {
                            from: source.rank,
                            to: target.rank,
                            rows,
                        });
                    }
                }
            }
        }
        links
    }
}

fn intersect(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    if start < end { start..end } else { start..start }
}
