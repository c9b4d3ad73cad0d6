// THEORY:
// The `pipeline` module is the top-level API for the whole engine. It wires one
// coordinator and a pool of workers onto a fresh message fabric, runs them to
// completion and hands back the match timeline.
//
// Every worker runs as its own tokio task and the coordinator runs on the
// caller's task. The roles share nothing but the fabric. A run is a closed
// batch: if any participant fails, every other task is aborted and the first
// error is returned. Nothing is retried and no partial timeline is kept.

use crate::coordinator::{Coordinator, RunReport};
use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec;
use crate::core_modules::pattern::Pattern;
use crate::error::{Result, SetlError};
use crate::protocol::{Fabric, Rank};
use crate::worker::Worker;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::{AbortHandle, JoinError};
use tracing::{error, info, warn};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Run parameters. Everything else is derived from the world and pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker tasks (row bands).
    pub workers: usize,
    /// Number of generations to search and evolve.
    pub generations: usize,
    /// Inbox size per rank before senders start waiting.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            generations: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn new(generations: usize) -> Self {
        Self {
            generations,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Rejects any run that could not complete, before a task is spawned.
    pub fn validate(&self, world: &Grid, pattern: &Pattern) -> Result<()> {
        if self.workers == 0 {
            return Err(SetlError::InvalidConfig("at least one worker is required".into()));
        }
        if world.first_row() != 0 || world.height() != world.width() {
            return Err(SetlError::InvalidConfig(format!(
                "world must be a full padded square, got {} rows from {} x {} cols",
                world.height(),
                world.first_row(),
                world.width()
            )));
        }
        let size = world.logical_size();
        if size == 0 {
            return Err(SetlError::InvalidConfig("world size must be at least 1".into()));
        }
        match_codec::check_world_size(size)?;
        if pattern.size() > size {
            warn!(pattern = pattern.size(), size, "pattern is larger than the world and can never match");
        }
        Ok(())
    }
}

pub struct SearchPipeline {
    config: PipelineConfig,
}

impl SearchPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole simulation over `world` (a padded grid) searching for
    /// `pattern` in all four rotations.
    pub async fn run(&self, world: &Grid, pattern: Pattern) -> Result<RunReport> {
        self.config.validate(world, &pattern)?;
        let workers = self.config.workers;
        info!(
            workers,
            size = world.logical_size(),
            generations = self.config.generations,
            pattern = pattern.size(),
            "starting run"
        );

        let mut endpoints = Fabric::new(workers + 1, self.config.channel_capacity);
        let coordinator_endpoint = endpoints
            .pop()
            .ok_or_else(|| SetlError::InvalidConfig("fabric has no coordinator rank".into()))?;
        let coordinator = Coordinator::new(coordinator_endpoint, workers);

        let mut abort_handles = Vec::with_capacity(workers);
        let mut tasks = FuturesUnordered::new();
        for endpoint in endpoints {
            let rank = endpoint.rank();
            let handle = tokio::spawn(Worker::new(endpoint, workers).run());
            abort_handles.push(handle.abort_handle());
            tasks.push(async move { (rank, handle.await) });
        }

        let coordination = coordinator.run(world, pattern, self.config.generations);
        supervise(coordination, tasks, &abort_handles, workers).await
    }
}

type Joined = std::result::Result<Result<()>, JoinError>;

/// Drives the coordinator and waits on every worker. The first failure on
/// either side aborts all workers and is returned.
async fn supervise<C, F>(
    coordination: C,
    mut tasks: FuturesUnordered<F>,
    abort_handles: &[AbortHandle],
    workers: usize,
) -> Result<RunReport>
where
    C: Future<Output = Result<RunReport>>,
    F: Future<Output = (Rank, Joined)>,
{
    tokio::pin!(coordination);

    let mut report = None;
    while report.is_none() || !tasks.is_empty() {
        tokio::select! {
            outcome = &mut coordination, if report.is_none() => match outcome {
                Ok(done) => report = Some(done),
                Err(err) => {
                    error!(%err, "coordinator failed");
                    abort_all(abort_handles);
                    return Err(err);
                }
            },
            Some((rank, joined)) = tasks.next() => {
                if let Err(err) = worker_outcome(rank, joined) {
                    error!(rank, %err, "worker failed, aborting run");
                    abort_all(abort_handles);
                    return Err(err);
                }
            }
            else => break,
        }
    }

    report.ok_or_else(|| SetlError::protocol(workers, "run ended without a timeline"))
}

fn worker_outcome(rank: Rank, joined: Joined) -> Result<()> {
    match joined {
        Ok(outcome) => outcome,
        Err(join_err) => Err(SetlError::WorkerFailed {
            rank,
            reason: join_err.to_string(),
        }),
    }
}

fn abort_all(handles: &[AbortHandle]) {
    for handle in handles {
        handle.abort();
    }
}
