use crate::cancel::CancellationWatcher;
use crate::events::Output;
use crate::sink::LogSink;
use crate::types::{JobId, Pid};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::{select, sync::mpsc, task::JoinHandle};
use tracing::{debug, error, Level};

/// Why a streaming task stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every writer closed its pipe: the job is done.
    Drained,
    /// The cancellation signal was set.
    Cancelled,
    /// Writing to the sink failed or the task panicked.
    Failed,
}

/// Drain a job's merged output into the sink until the job closes its pipes or the
/// signal is set.
///
/// The job id is reported on `finished_tx` however the task ends, so the supervisor can
/// retire the job even when nobody asked it to stop.
pub fn spawn(
    job_id: JobId,
    pid: Pid,
    output_rx: mpsc::UnboundedReceiver<Output>,
    sink: Arc<LogSink>,
    cancel: CancellationWatcher,
    finished_tx: mpsc::UnboundedSender<JobId>,
) -> JoinHandle<StreamEnd> {
    tokio::spawn(async move {
        let end = match AssertUnwindSafe(pump(pid, output_rx, &sink, cancel))
            .catch_unwind()
            .await
        {
            Ok(end) => end,
            Err(_) => {
                error!(pid, "output streaming panicked");
                StreamEnd::Failed
            }
        };
        debug!(pid, ?end, "output stream closed");
        let _ = finished_tx.send(job_id);
        end
    })
}

async fn pump(
    pid: Pid,
    mut output_rx: mpsc::UnboundedReceiver<Output>,
    sink: &LogSink,
    mut cancel: CancellationWatcher,
) -> StreamEnd {
    loop {
        select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            maybe_output = output_rx.recv() => {
                let Some(output) = maybe_output else {
                    return StreamEnd::Drained;
                };
                if cancel.is_set() {
                    return StreamEnd::Cancelled;
                }
                let line = String::from_utf8_lossy(output.line());
                debug!(target: "inference_supervisor::job", pid, stream = output.stream_name(), "{}", line);
                if let Err(err) = sink.record(Level::INFO, &line) {
                    error!(pid, %err, "failed to write job output to the log");
                    return StreamEnd::Failed;
                }
            }
        }
    }
}
