// THEORY:
// The `Coordinator` is an orchestrator, not a simulator. It hands the world out
// once and from then on only listens: it never evolves or even holds grid state
// after the initial transfer.
//
// Key architectural principles:
// 1.  **One-time distribution**: run parameters, the four pattern variants and
//     each worker's initial slice (band plus initial halo) are sent exactly
//     once, in that order.
// 2.  **Per-generation aggregation**: for generation g it waits for exactly one
//     report from every worker, merges them and sorts the merged list by the
//     packed value, i.e. by (rotation, row, col). The result is independent of
//     which worker answered first.
// 3.  **Monotonic timeline**: sorted generation lists are appended in
//     generation order and never revisited.

use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec::{MatchRecord, PackedMatch};
use crate::core_modules::partition::Partition;
use crate::core_modules::pattern::{Pattern, PatternSet};
use crate::error::{Result, SetlError};
use crate::protocol::{Endpoint, Payload, SetupInfo, Tag};
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Every match of a run, ordered by generation and then (rotation, row, col).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    records: Vec<MatchRecord>,
    /// `records[spans[g]]` are the matches of generation g.
    spans: Vec<Range<usize>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one generation's merged matches, sorting them first.
    ///
    /// Generations must be appended in order starting from 0.
    pub fn push_generation(&mut self, generation: usize, mut packed: Vec<PackedMatch>) {
        debug_assert_eq!(generation, self.spans.len());
        packed.sort_unstable();
        let start = self.records.len();
        self.records
            .extend(packed.into_iter().map(|p| p.into_record(generation)));
        self.spans.push(start..self.records.len());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of generations recorded, including ones without matches.
    pub fn generations(&self) -> usize {
        self.spans.len()
    }

    pub fn generation(&self, generation: usize) -> &[MatchRecord] {
        match self.spans.get(generation) {
            Some(span) => &self.records[span.clone()],
            None => &[],
        }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord> {
        self.records.iter()
    }
}

/// The final output of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub timeline: Timeline,
    pub elapsed: Duration,
}

pub struct Coordinator {
    endpoint: Endpoint,
    workers: usize,
}

impl Coordinator {
    /// The coordinator's endpoint must be rank `workers`.
    pub fn new(endpoint: Endpoint, workers: usize) -> Self {
        Self { endpoint, workers }
    }

    pub async fn run(mut self, world: &Grid, north: Pattern, generations: usize) -> Result<RunReport> {
        let started = Instant::now();
        let size = world.logical_size();
        let patterns = PatternSet::from_north(north);
        let partition = Partition::new(size, self.workers, patterns.size())?;

        self.distribute(world, &patterns, &partition, generations).await?;

        let mut timeline = Timeline::new();
        for generation in 0..generations {
            let mut merged = Vec::new();
            for rank in 0..self.workers {
                merged.extend(self.endpoint.recv_report(rank, generation).await?);
            }
            debug!(generation, matches = merged.len(), "generation merged");
            timeline.push_generation(generation, merged);
        }

        let elapsed = started.elapsed();
        info!(matches = timeline.len(), ?elapsed, "run complete");
        Ok(RunReport { timeline, elapsed })
    }

    async fn distribute(
        &self,
        world: &Grid,
        patterns: &PatternSet,
        partition: &Partition,
        generations: usize,
    ) -> Result<()> {
        let setup = SetupInfo {
            size: partition.size(),
            generations,
            pattern_size: partition.pattern_size(),
        };
        for rank in 0..self.workers {
            self.endpoint.send(rank, Tag::Setup, Payload::Setup(setup)).await?;
        }
        for (rotation, pattern) in patterns.iter() {
            for rank in 0..self.workers {
                self.endpoint
                    .send(rank, Tag::Pattern(rotation), Payload::Pattern(pattern.clone()))
                    .await?;
            }
        }
        for band in partition.bands() {
            if band.view.end > world.row_span().end {
                return Err(SetlError::InvalidConfig(format!(
                    "band {} needs rows {:?} but the world has {:?}",
                    band.rank,
                    band.view,
                    world.row_span()
                )));
            }
            let slice = world.window(band.view.clone())?;
            self.endpoint
                .send(band.rank, Tag::InitialBand, Payload::Band(slice))
                .await?;
        }
        info!(workers = self.workers, size = setup.size, generations, "setup distributed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::cell::cell::Cell;
    use crate::core_modules::pattern::Rotation;
    use crate::protocol::Fabric;

    fn packed(row: usize, col: usize, rotation: Rotation) -> PackedMatch {
        PackedMatch::encode(row, col, rotation).unwrap()
    }

    #[test]
    fn timeline_orders_within_generation() {
        let mut timeline = Timeline::new();
        timeline.push_generation(
            0,
            vec![
                packed(3, 1, Rotation::East),
                packed(9, 9, Rotation::North),
                packed(3, 0, Rotation::East),
            ],
        );
        timeline.push_generation(1, vec![]);
        timeline.push_generation(2, vec![packed(0, 0, Rotation::West)]);

        let keys: Vec<_> = timeline.generation(0).iter().map(|m| m.sort_key()).collect();
        assert_eq!(
            keys,
            vec![(Rotation::North, 9, 9), (Rotation::East, 3, 0), (Rotation::East, 3, 1)]
        );
        assert!(timeline.generation(1).is_empty());
        assert_eq!(timeline.generation(2)[0].generation, 2);
        assert_eq!(timeline.generations(), 3);
        assert_eq!(timeline.len(), 4);
    }

    #[tokio::test]
    async fn merge_ignores_arrival_order() {
        let mut endpoints = Fabric::new(3, 32);
        let coordinator = Coordinator::new(endpoints.pop().unwrap(), 2);
        let mut late = endpoints.pop().unwrap();
        let mut early = endpoints.pop().unwrap();

        let world = Grid::padded(4).unwrap();
        let north = Pattern::new(1, vec![Cell::Alive]).unwrap();
        let run = tokio::spawn(async move { coordinator.run(&world, north, 2).await });

        // Both fake workers drain their setup, then rank 1 reports before rank 0.
        for ep in [&mut early, &mut late] {
            ep.recv_setup(2).await.unwrap();
            for rotation in Rotation::ALL {
                ep.recv_pattern(2, rotation).await.unwrap();
            }
            ep.recv_band(2).await.unwrap();
        }
        late.send_report(2, 0, vec![packed(2, 0, Rotation::North)]).await.unwrap();
        late.send_report(2, 1, vec![]).await.unwrap();
        early
            .send_report(2, 0, vec![packed(0, 1, Rotation::South), packed(0, 3, Rotation::North)])
            .await
            .unwrap();
        early.send_report(2, 1, vec![]).await.unwrap();

        let report = run.await.unwrap().unwrap();
        let lines: Vec<_> = report.timeline.iter().map(|m| m.to_string()).collect();
        assert_eq!(lines, vec!["0:0:3:0", "0:2:0:0", "0:0:1:2"]);
        assert_eq!(report.timeline.generations(), 2);
    }
}
