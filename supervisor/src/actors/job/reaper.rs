use crate::events::JobStatus;
use crate::types::Pid;
use tokio::{
    process::Child,
    select,
    sync::{mpsc, watch},
};
use tracing::{debug, error};

/// Own `child` until it exits and publish its final status.
///
/// `kill_rx` is only used where the platform cannot signal a process group.
pub fn spawn(
    mut child: Child,
    pid: Pid,
    status_tx: watch::Sender<JobStatus>,
    mut kill_rx: Option<mpsc::UnboundedReceiver<()>>,
) {
    tokio::spawn(async move {
        loop {
            select! {
                // listen for a kill request
                Some(()) = recv_kill(&mut kill_rx) => {
                    if let Err(err) = child.start_kill() {
                        debug!(pid, %err, "kill request for an exiting child");
                    }
                }
                // wait for the child to finish and clean up its resources
                exit_status = child.wait() => {
                    let status = match exit_status {
                        Ok(exit_status) => JobStatus::from(exit_status),
                        Err(err) => {
                            error!(pid, %err, "failed to wait on job");
                            JobStatus::Exited { code: -1 }
                        }
                    };
                    debug!(pid, %status, "job reaped");
                    status_tx.send_replace(status);
                    break;
                }
            }
        }
    });
}

async fn recv_kill(kill_rx: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match kill_rx {
        Some(kill_rx) => kill_rx.recv().await,
        None => None,
    }
}
