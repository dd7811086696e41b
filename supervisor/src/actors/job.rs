mod reader;
mod reaper;

use crate::events::{JobStatus, Output};
use crate::params::RunName;
use crate::terminate::{Terminate, Termination};
use crate::types::{JobId, Pid};
use std::{io, path::Path, process::Stdio, time::Duration};
use tokio::{
    process,
    sync::{mpsc, watch},
    time,
};
use tracing::{debug, warn};

/// How a job came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminated {
    /// The process had exited before anyone asked it to.
    AlreadyExited(JobStatus),
    /// The process exited within the grace period after the graceful signal.
    Graceful(JobStatus),
    /// The grace period ran out and the process group was killed. `None` when even the
    /// kill was not confirmed in time.
    Forced(Option<JobStatus>),
}

/// One invocation of the detection tool.
///
/// The child itself is owned by a reaper task which publishes its status; the handle keeps
/// the ids needed to signal it and a receiver for the status.
pub struct JobHandle {
    id: JobId,
    pid: Pid,
    run_name: RunName,
    command: String,
    status_rx: watch::Receiver<JobStatus>,
    terminator: Box<dyn Terminate>,
}

impl JobHandle {
    /// Launch `shell -c command` in a new process group, piping both output streams into
    /// `output_tx` line by line.
    pub fn spawn(
        shell: &Path,
        command: String,
        run_name: RunName,
        output_tx: mpsc::UnboundedSender<Output>,
    ) -> io::Result<Self> {
        let mut cmd = process::Command::new(shell);
        cmd.arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child was reaped at spawn"))?;

        // grab stdout and stderr, they feed the same channel
        if let Some(stdout) = child.stdout.take() {
            reader::spawn(stdout, output_tx.clone(), Output::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            reader::spawn(stderr, output_tx, Output::Stderr);
        }

        #[cfg(unix)]
        let (terminator, kill_rx): (Box<dyn Terminate>, Option<mpsc::UnboundedReceiver<()>>) = (
            Box::new(crate::terminate::ProcessGroup::new(pid)),
            None,
        );
        #[cfg(not(unix))]
        let (terminator, kill_rx): (Box<dyn Terminate>, Option<mpsc::UnboundedReceiver<()>>) = {
            let (kill_tx, kill_rx) = mpsc::unbounded_channel();
            (
                Box::new(crate::terminate::DirectChild::new(kill_tx)),
                Some(kill_rx),
            )
        };

        let (status_tx, status_rx) = watch::channel(JobStatus::Running);
        reaper::spawn(child, pid, status_tx, kill_rx);

        Ok(Self {
            id: uuid::Uuid::new_v4(),
            pid,
            run_name,
            command,
            status_rx,
            terminator,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The child leads its own group, so the group id is its pid.
    pub fn process_group(&self) -> Pid {
        self.pid
    }

    pub fn run_name(&self) -> &RunName {
        &self.run_name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn status(&self) -> JobStatus {
        *self.status_rx.borrow()
    }

    /// Wait up to `limit` for the process to exit.
    pub async fn wait_for_exit(&mut self, limit: Duration) -> Option<JobStatus> {
        let waited = time::timeout(
            limit,
            self.status_rx.wait_for(|status| !status.is_running()),
        )
        .await
        .map(|result| result.map(|status| *status));
        match waited {
            Ok(Ok(status)) => Some(status),
            // the reaper is gone, whatever it published last is final
            Ok(Err(_)) => Some(self.status()).filter(|status| !status.is_running()),
            Err(_) => None,
        }
    }

    pub fn terminate(&self, mode: Termination) -> io::Result<()> {
        self.terminator.terminate(mode)
    }

    /// Ask the process group to exit, and kill it if the child is still there after `grace`.
    ///
    /// Once the child is gone whatever it left behind in its group is killed outright.
    pub async fn shutdown(&mut self, grace: Duration) -> Terminated {
        let status = self.status();
        if !status.is_running() {
            self.sweep();
            return Terminated::AlreadyExited(status);
        }

        debug!(pid = self.pid, "sending graceful termination");
        if let Err(err) = self.terminate(Termination::Graceful) {
            warn!(pid = self.pid, %err, "graceful termination failed, escalating");
        } else if let Some(exited) = self.wait_for_exit(grace).await {
            self.sweep();
            return Terminated::Graceful(exited);
        }

        warn!(pid = self.pid, "job ignored graceful termination, killing its process group");
        if let Err(err) = self.terminate(Termination::Forced) {
            warn!(pid = self.pid, %err, "forced termination failed");
        }
        let exited = self.wait_for_exit(grace).await;
        if exited.is_none() {
            warn!(pid = self.pid, "job has not been reaped after a forced kill");
        }
        Terminated::Forced(exited)
    }

    /// Kill any stragglers left in the group by an exited child.
    ///
    /// The group id stays reserved while any member lives. Once the group is empty the
    /// id may be reused, so an empty group is left alone.
    fn sweep(&self) {
        if !self.terminator.has_members() {
            debug!(pid = self.pid, "process group already empty");
            return;
        }
        if let Err(err) = self.terminate(Termination::Forced) {
            debug!(pid = self.pid, %err, "could not sweep the process group");
        }
    }
}
