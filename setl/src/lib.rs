// THEORY:
// This file is the entry point for the `setl` library crate: a Game of Life
// simulation split across a pool of workers by row bands, which at every
// generation searches the whole world for one pattern in all four rotations.
//
// The public surface is the `SearchPipeline` (with its `PipelineConfig`) plus
// the loader and report helpers a driver needs. The core modules (grid,
// partitioner, search, match codec) are public too, since the coordinator and
// workers are built only from them and tests exercise them directly.

pub mod coordinator;
pub mod core_modules;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod protocol;
pub mod report;
pub mod worker;

pub use coordinator::{RunReport, Timeline};
pub use core_modules::cell::cell::Cell;
pub use core_modules::grid::Grid;
pub use core_modules::match_codec::MatchRecord;
pub use core_modules::pattern::{Pattern, Rotation};
pub use core_modules::snapshot::snapshot::save_png;
pub use error::{Result, SetlError};
pub use pipeline::{PipelineConfig, SearchPipeline};
