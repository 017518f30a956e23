//! Progress reporting for written files.

use std::io::{self, Stdout, Write};
use std::path::Path;
use std::time::Instant;

/// Reports each written file and the time elapsed since `started`.
///
/// The start instant is supplied by the caller, so the elapsed time covers
/// whatever span the caller chooses to measure.
#[derive(Debug)]
pub struct ProgressReporter<W: Write> {
    started: Instant,
    out: W,
}

impl ProgressReporter<Stdout> {
    /// Creates a reporter writing to standard output.
    pub fn stdout(started: Instant) -> Self {
        Self::new(started, io::stdout())
    }
}

impl<W: Write> ProgressReporter<W> {
    /// Creates a reporter writing to `out`.
    pub fn new(started: Instant, out: W) -> Self {
        Self { started, out }
    }

    /// Seconds since the reporter's start instant.
    pub fn elapsed_sec(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Prints the written path and elapsed time.
    ///
    /// Progress output is best effort: a closed stdout does not fail the run,
    /// the write error is logged at debug level instead.
    pub fn file_written(&mut self, path: &Path) {
        let elapsed = self.elapsed_sec();
        if let Err(e) = self.write_lines(path, elapsed) {
            tracing::debug!(path = %path.display(), "progress output failed: {}", e);
        }
        tracing::debug!(path = %path.display(), elapsed, "file written");
    }

    fn write_lines(&mut self, path: &Path, elapsed: f64) -> io::Result<()> {
        writeln!(self.out, "Generated {}.", path.display())?;
        writeln!(self.out, "Elapsed time: {:.2}", elapsed)?;
        self.out.flush()
    }

    /// Consumes the reporter and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
