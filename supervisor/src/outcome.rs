//! What `start`, `stop` and `status` report back to callers.
use crate::actors::job::Terminated;
use crate::error::ArchiveError;
use crate::events::JobStatus;
use crate::params::RunName;
use crate::types::{JobId, Pid};
use std::fmt;
use std::path::PathBuf;

/// A job was accepted and is running in the background.
#[derive(Debug)]
pub struct Started {
    pub job_id: JobId,
    pub pid: Pid,
    pub run_name: RunName,
    pub command: String,
    /// The job that was still running and had to make room.
    pub replaced: Option<Stopped>,
}

/// A job that has been ended and archived.
#[derive(Debug)]
pub struct Stopped {
    pub pid: Pid,
    pub run_name: RunName,
    pub terminated: Terminated,
    pub archive: Result<PathBuf, ArchiveError>,
    /// The run a stop request asked for, when it was not this one.
    pub requested: Option<String>,
}

#[derive(Debug)]
pub enum StopOutcome {
    NothingToStop,
    /// Nothing was running, but the last job had exited without being archived yet.
    AlreadyFinished(Stopped),
    Stopped(Stopped),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorStatus {
    Idle,
    Running {
        job_id: JobId,
        pid: Pid,
        run_name: RunName,
        command: String,
    },
    /// The process is gone but its log has not been archived yet.
    Exited {
        pid: Pid,
        run_name: RunName,
        status: JobStatus,
    },
}

impl fmt::Display for Started {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accepted run `{}`: PID {} is running `{}`",
            self.run_name, self.pid, self.command
        )?;
        if let Some(replaced) = &self.replaced {
            write!(f, " (replaced: {})", replaced)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.terminated {
            Terminated::AlreadyExited(status) => write!(f, "PID {} had {}", self.pid, status)?,
            Terminated::Graceful(_) => write!(f, "PID {} was terminated", self.pid)?,
            Terminated::Forced(_) => write!(f, "PID {} was force-terminated", self.pid)?,
        }
        match &self.archive {
            Ok(path) => write!(f, "; log archived to {}", path.display())?,
            Err(err) => write!(f, "; log for run `{}` was not archived: {}", self.run_name, err)?,
        }
        if let Some(requested) = &self.requested {
            write!(
                f,
                "; no run `{}` was active, stopped run `{}` instead",
                requested, self.run_name
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::NothingToStop => write!(f, "Nothing to stop."),
            StopOutcome::AlreadyFinished(stopped) => write!(f, "Nothing to stop: {}.", stopped),
            StopOutcome::Stopped(stopped) => write!(f, "{}.", stopped),
        }
    }
}

impl fmt::Display for SupervisorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorStatus::Idle => write!(f, "Idle"),
            SupervisorStatus::Running { pid, run_name, .. } => {
                write!(f, "Running run `{}` as PID {}", run_name, pid)
            }
            SupervisorStatus::Exited {
                pid,
                run_name,
                status,
            } => write!(f, "Run `{}` (PID {}) {}, archiving", run_name, pid, status),
        }
    }
}
