pub mod cell;
pub mod grid;
pub mod match_codec;
pub mod partition;
pub mod pattern;
pub mod search;
pub mod snapshot;
