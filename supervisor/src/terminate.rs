//! Platform capability for ending a job: a polite request first, then a forced kill.
use std::io;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Graceful,
    Forced,
}

pub trait Terminate: Send + Sync {
    fn terminate(&self, mode: Termination) -> io::Result<()>;

    /// Whether anything this terminator would signal is still around.
    fn has_members(&self) -> bool;
}

/// Signals every process in a process group, so helpers spawned by the tool go down with it.
#[cfg(unix)]
#[derive(Clone, Copy, Debug)]
pub struct ProcessGroup {
    pgid: nix::unistd::Pid,
}

#[cfg(unix)]
impl ProcessGroup {
    pub fn new(pgid: u32) -> Self {
        Self {
            pgid: nix::unistd::Pid::from_raw(pgid as i32),
        }
    }

    pub fn id(&self) -> i32 {
        self.pgid.as_raw()
    }
}

#[cfg(unix)]
impl Terminate for ProcessGroup {
    fn terminate(&self, mode: Termination) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};

        let signal = match mode {
            Termination::Graceful => Signal::SIGTERM,
            Termination::Forced => Signal::SIGKILL,
        };
        match killpg(self.pgid, signal) {
            // the whole group is already gone
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    fn has_members(&self) -> bool {
        // EPERM means the id now names a group we do not own
        nix::sys::signal::killpg(self.pgid, None).is_ok()
    }
}

/// Fallback without process groups: asks the reaper task to kill the direct child.
#[cfg(not(unix))]
#[derive(Clone, Debug)]
pub struct DirectChild {
    kill_tx: tokio::sync::mpsc::UnboundedSender<()>,
}

#[cfg(not(unix))]
impl DirectChild {
    pub fn new(kill_tx: tokio::sync::mpsc::UnboundedSender<()>) -> Self {
        Self { kill_tx }
    }
}

#[cfg(not(unix))]
impl Terminate for DirectChild {
    fn terminate(&self, _mode: Termination) -> io::Result<()> {
        // a closed channel means the child was already reaped
        let _ = self.kill_tx.send(());
        Ok(())
    }

    fn has_members(&self) -> bool {
        !self.kill_tx.is_closed()
    }
}
