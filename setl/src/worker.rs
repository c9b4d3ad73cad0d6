// THEORY:
// A `Worker` owns one row band of the world for the entire run. After a
// one-time setup it repeats the same four phases every generation:
//
//   Searching  -> look for all four pattern variants anchored in the band
//   Evolving   -> compute the next generation of the band into a spare buffer
//   Exchanging -> ship freshly evolved edge rows out, pull fresh halo rows in
//   Reporting  -> send this generation's matches (possibly none) upstream
//
// The worker never sees the rest of the world. Everything it knows about rows
// outside its band arrives through the halo exchange, which is why the
// exchange must complete before the next Searching phase reads those rows.
// Blocking receives provide that ordering; there is no global barrier.

use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec::{self, MatchRecord, PackedMatch};
use crate::core_modules::partition::{Band, HaloLink, Partition};
use crate::core_modules::pattern::{PatternSet, Rotation};
use crate::core_modules::search::search_band;
use crate::error::{Result, SetlError};
use crate::protocol::{Endpoint, HaloRows, Payload, Rank, SetupInfo, Tag};
use tracing::{debug, trace};

/// Everything a worker holds once setup has completed.
struct WorkerState {
    setup: SetupInfo,
    patterns: PatternSet,
    band: Band,
    /// Transfers this worker sends every generation.
    outgoing: Vec<HaloLink>,
    /// Transfers this worker receives every generation.
    incoming: Vec<HaloLink>,
    current: Grid,
    next: Grid,
    matches: Vec<MatchRecord>,
}

pub struct Worker {
    endpoint: Endpoint,
    coordinator: Rank,
    workers: usize,
}

impl Worker {
    /// `workers` is the total worker count; the coordinator is rank `workers`.
    pub fn new(endpoint: Endpoint, workers: usize) -> Self {
        Self {
            endpoint,
            coordinator: workers,
            workers,
        }
    }

    pub fn rank(&self) -> Rank {
        self.endpoint.rank()
    }

    pub async fn run(mut self) -> Result<()> {
        let mut state = self.initialize().await?;
        let rank = self.rank();
        debug!(rank, rows = ?state.band.rows, view = ?state.band.view, "worker ready");

        for generation in 0..state.setup.generations {
            search_band(
                &state.current,
                &state.band,
                &state.patterns,
                generation,
                &mut state.matches,
            );

            state
                .current
                .evolve_into(&mut state.next, state.band.rows.clone());
            std::mem::swap(&mut state.current, &mut state.next);

            self.exchange(&mut state, generation).await?;

            let report = state
                .matches
                .drain(..)
                .map(|m| m.pack())
                .collect::<Result<Vec<PackedMatch>>>()?;
            debug!(rank, generation, matches = report.len(), "reporting");
            self.endpoint
                .send_report(self.coordinator, generation, report)
                .await?;
        }

        debug!(rank, "worker finished");
        Ok(())
    }

    async fn initialize(&mut self) -> Result<WorkerState> {
        let rank = self.rank();
        if self.endpoint.ranks() != self.workers + 1 {
            return Err(SetlError::protocol(
                rank,
                format!(
                    "fabric has {} ranks, expected {} workers and a coordinator",
                    self.endpoint.ranks(),
                    self.workers
                ),
            ));
        }
        let setup = self.endpoint.recv_setup(self.coordinator).await?;
        match_codec::check_world_size(setup.size)?;

        let mut variants = Vec::with_capacity(4);
        for rotation in Rotation::ALL {
            let pattern = self.endpoint.recv_pattern(self.coordinator, rotation).await?;
            if pattern.size() != setup.pattern_size {
                return Err(SetlError::protocol(
                    rank,
                    format!(
                        "pattern {rotation:?} has size {} but setup announced {}",
                        pattern.size(),
                        setup.pattern_size
                    ),
                ));
            }
            variants.push(pattern);
        }
        let variants: [_; 4] = variants
            .try_into()
            .map_err(|_| SetlError::protocol(rank, "expected four pattern variants"))?;
        let patterns = PatternSet::from_variants(variants)?;

        let partition = Partition::new(setup.size, self.workers, setup.pattern_size)?;
        let band = partition
            .band(rank)
            .cloned()
            .ok_or_else(|| SetlError::protocol(rank, "rank has no band in the partition"))?;
        let (outgoing, incoming): (Vec<HaloLink>, Vec<HaloLink>) = partition
            .halo_links()
            .into_iter()
            .filter(|l| l.from == rank || l.to == rank)
            .partition(|l| l.from == rank);

        let current = self.endpoint.recv_band(self.coordinator).await?;
        if current.row_span() != band.view || current.width() != setup.size + 2 {
            return Err(SetlError::protocol(
                rank,
                format!(
                    "initial band covers rows {:?} x {} cols, expected {:?} x {}",
                    current.row_span(),
                    current.width(),
                    band.view,
                    setup.size + 2
                ),
            ));
        }
        let next = current.try_clone()?;

        Ok(WorkerState {
            setup,
            patterns,
            band,
            outgoing,
            incoming,
            current,
            next,
            matches: Vec::new(),
        })
    }

    /// Sends every outgoing halo block, then installs every incoming one.
    async fn exchange(&mut self, state: &mut WorkerState, generation: usize) -> Result<()> {
        let rank = self.rank();
        let tag = Tag::Halo { generation };

        for link in &state.outgoing {
            let rows = HaloRows {
                first_row: link.rows.start,
                cells: state.current.rows_slice(link.rows.clone()).to_vec(),
            };
            trace!(rank, to = link.to, rows = ?link.rows, generation, "halo out");
            self.endpoint.send(link.to, tag, Payload::Halo(rows)).await?;
        }

        for link in &state.incoming {
            let halo = self.endpoint.recv_halo(link.from, generation).await?;
            if halo.first_row != link.rows.start
                || halo.cells.len() != link.rows.len() * state.current.width()
                || !state.current.write_rows(halo.first_row, &halo.cells)
            {
                return Err(SetlError::protocol(
                    rank,
                    format!(
                        "halo from rank {} for generation {generation} does not cover rows {:?}",
                        link.from, link.rows
                    ),
                ));
            }
            trace!(rank, from = link.from, rows = ?link.rows, generation, "halo in");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::cell::cell::Cell;
    use crate::core_modules::pattern::Pattern;
    use crate::protocol::Fabric;

    fn single_cell_patterns() -> PatternSet {
        PatternSet::from_north(Pattern::new(1, vec![Cell::Alive]).unwrap())
    }

    async fn send_setup(coordinator: &Endpoint, to: Rank, setup: SetupInfo, patterns: &PatternSet) {
        coordinator.send(to, Tag::Setup, Payload::Setup(setup)).await.unwrap();
        for (rotation, pattern) in patterns.iter() {
            coordinator
                .send(to, Tag::Pattern(rotation), Payload::Pattern(pattern.clone()))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn lone_worker_reports_every_generation() {
        let mut endpoints = Fabric::new(2, 16);
        let mut coordinator = endpoints.pop().unwrap();
        let worker = Worker::new(endpoints.pop().unwrap(), 1);
        let handle = tokio::spawn(worker.run());

        let setup = SetupInfo { size: 4, generations: 3, pattern_size: 1 };
        send_setup(&coordinator, 0, setup, &single_cell_patterns()).await;
        let mut world = Grid::padded(4).unwrap();
        world.set(2, 3, Cell::Alive);
        coordinator
            .send(0, Tag::InitialBand, Payload::Band(world.window(0..6).unwrap()))
            .await
            .unwrap();

        // Generation 0 sees the lone cell four times (one per rotation), then it dies.
        let first = coordinator.recv_report(0, 0).await.unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|m| m.decode().0 == 1 && m.decode().1 == 2));
        assert!(coordinator.recv_report(0, 1).await.unwrap().is_empty());
        assert!(coordinator.recv_report(0, 2).await.unwrap().is_empty());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rejects_band_of_the_wrong_shape() {
        let mut endpoints = Fabric::new(2, 16);
        let coordinator = endpoints.pop().unwrap();
        let worker = Worker::new(endpoints.pop().unwrap(), 1);
        let handle = tokio::spawn(worker.run());

        let setup = SetupInfo { size: 4, generations: 1, pattern_size: 1 };
        send_setup(&coordinator, 0, setup, &single_cell_patterns()).await;
        let short = Grid::padded(4).unwrap().window(0..3).unwrap();
        coordinator
            .send(0, Tag::InitialBand, Payload::Band(short))
            .await
            .unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(SetlError::ProtocolViolation { rank: 0, .. })
        ));
    }

    #[tokio::test]
    async fn rejects_fabric_of_the_wrong_size() {
        let mut endpoints = Fabric::new(3, 4);
        let worker = Worker::new(endpoints.remove(0), 1);
        assert!(matches!(
            worker.run().await,
            Err(SetlError::ProtocolViolation { rank: 0, .. })
        ));
    }

    #[tokio::test]
    async fn rejects_unencodable_world() {
        let mut endpoints = Fabric::new(2, 4);
        let coordinator = endpoints.pop().unwrap();
        let worker = Worker::new(endpoints.pop().unwrap(), 1);
        let handle = tokio::spawn(worker.run());

        let setup = SetupInfo { size: 20_000, generations: 1, pattern_size: 1 };
        coordinator.send(0, Tag::Setup, Payload::Setup(setup)).await.unwrap();
        assert!(matches!(
            handle.await.unwrap(),
            Err(SetlError::EncodingOverflow { .. })
        ));
    }
}
