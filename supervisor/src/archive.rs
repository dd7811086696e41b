use crate::error::ArchiveError;
use crate::params::RunName;
use crate::sink::LogSink;
use std::path::{Path, PathBuf};

/// File name of the per-run log snapshot inside `<results-root>/<run>/`.
pub const ARCHIVE_FILE_NAME: &str = "inference.log";

/// Copies the live log into the directory the detection tool created for a run.
#[derive(Clone, Debug)]
pub struct RunArchiver {
    results_root: PathBuf,
}

impl RunArchiver {
    pub fn new(results_root: impl Into<PathBuf>) -> Self {
        Self {
            results_root: results_root.into(),
        }
    }

    pub fn results_root(&self) -> &Path {
        &self.results_root
    }

    pub fn run_dir(&self, run_name: &RunName) -> PathBuf {
        self.results_root.join(run_name)
    }

    pub fn destination(&self, run_name: &RunName) -> PathBuf {
        self.run_dir(run_name).join(ARCHIVE_FILE_NAME)
    }

    /// Snapshot the sink into the run directory, then truncate it.
    ///
    /// The sink is truncated even when the copy fails, so a failed archive never leaks
    /// into the next run's snapshot.
    pub fn archive(&self, sink: &LogSink, run_name: &RunName) -> Result<PathBuf, ArchiveError> {
        let run_dir = self.run_dir(run_name);
        let copied = if run_dir.is_dir() {
            let dest = run_dir.join(ARCHIVE_FILE_NAME);
            match sink.snapshot_to(&dest) {
                Ok(_) => Ok(dest),
                Err(source) => Err(ArchiveError::Copy { path: dest, source }),
            }
        } else {
            Err(ArchiveError::MissingRunDir(run_dir))
        };
        let truncated = sink.truncate();
        let archived = copied?;
        truncated.map_err(ArchiveError::Truncate)?;
        Ok(archived)
    }
}
