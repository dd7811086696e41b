use crate::types::OutputLine;
use std::fmt;
use std::process::ExitStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Exited { code: i32 },
    Killed { signal: i32 },
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running)
    }
}

impl From<ExitStatus> for JobStatus {
    fn from(exit_status: ExitStatus) -> Self {
        if let Some(code) = exit_status.code() {
            return JobStatus::Exited { code };
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = exit_status.signal() {
                return JobStatus::Killed { signal };
            }
        }
        // neither a code nor a signal, only possible for stopped/continued children
        JobStatus::Exited { code: -1 }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Exited { code } => write!(f, "exited with code {}", code),
            JobStatus::Killed { signal } => write!(f, "killed by signal {}", signal),
        }
    }
}

/// One line of job output, tagged with the pipe it came from.
#[derive(Clone, Debug)]
pub enum Output {
    Stdout(OutputLine),
    Stderr(OutputLine),
}

impl Output {
    pub fn line(&self) -> &OutputLine {
        match self {
            Output::Stdout(line) | Output::Stderr(line) => line,
        }
    }

    pub fn stream_name(&self) -> &'static str {
        match self {
            Output::Stdout(_) => "stdout",
            Output::Stderr(_) => "stderr",
        }
    }
}
