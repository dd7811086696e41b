use std::{io, path::PathBuf, result};
use thiserror;

/// A `start` request was refused before anything was spawned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no parameters were given")]
    EmptyParameters,
    #[error("parameter `{key}` is not set (got `{value}`)")]
    UnresolvedParameter { key: String, value: String },
    #[error("parameter `{0}` is set by the supervisor and cannot be overridden")]
    ReservedParameter(String),
    #[error("run name must not be empty")]
    EmptyRunName,
    #[error("run name `{0}` must be a plain directory name")]
    InvalidRunName(String),
    #[error("output directory {} already exists", .0.display())]
    RunExists(PathBuf),
    #[error("run `{0}` is the job currently running")]
    RunActive(String),
}

/// The log of a finished job could not be copied into its run directory.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("run directory {} does not exist", .0.display())]
    MissingRunDir(PathBuf),
    #[error("failed to copy the log to {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to truncate the live log: {0}")]
    Truncate(#[source] io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("the supervisor has shut down")]
    SupervisorGone,
}

pub type Result<T> = result::Result<T, Error>;
