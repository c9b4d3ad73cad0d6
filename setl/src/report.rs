//! Human-readable output of a run.

use crate::coordinator::{RunReport, Timeline};
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "List size = {}", self.len())?;
        for record in self.iter() {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

/// The lines echoed before a run starts.
pub fn startup_banner(size: usize, generations: usize, pattern_size: usize) -> String {
    format!("World Size = {size}\nIterations = {generations}\nPattern size = {pattern_size}\n")
}

pub fn elapsed_line(elapsed: Duration) -> String {
    format!("Parallel SETL took {:.2} seconds", elapsed.as_secs_f64())
}

/// Writes the timeline followed by the elapsed time.
pub fn write_report(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    write!(out, "{}", report.timeline)?;
    writeln!(out, "{}", elapsed_line(report.elapsed))
}
