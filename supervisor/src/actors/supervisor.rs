mod actor;
mod messages;

use self::{
    actor::Supervisor,
    messages::SupervisorMessage::{self, GetStatus, Start, Stop},
};
use crate::config::SupervisorConfig;
use crate::error::{self, Error};
use crate::outcome::{Started, StopOutcome, SupervisorStatus};
use crate::params::{RunName, RunParameters};
use crate::sink::LogSink;
use std::{io, sync::Arc};
use tokio::sync::{mpsc, oneshot};

/// A `Supervisor` which starts, replaces and stops the single detection job.
///
/// This struct is actually an actor handle, the real work is done in the actor spawned by
/// `SupervisorHandle::spawn`. Every request is queued to that one actor, so overlapping
/// `start`/`stop` calls are applied one after the other and never race over the job.
/// The handle can be cloned freely; when the last clone is dropped the actor stops any
/// running job, archives its log and exits.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
    sink: Arc<LogSink>,
}

impl SupervisorHandle {
    /// Open the live log and spawn a new supervisor. Must be called within a tokio runtime.
    pub fn spawn(config: SupervisorConfig) -> io::Result<Self> {
        let sink = LogSink::open(&config.log_path, config.rotation, config.log_backups)?;
        Ok(Self::with_sink(config, Arc::new(sink)))
    }

    pub fn with_sink(config: SupervisorConfig, sink: Arc<LogSink>) -> Self {
        let (sender, receiver) = mpsc::channel(config.message_capacity.max(1));
        Supervisor::spawn(receiver, config, Arc::clone(&sink));
        Self { sender, sink }
    }

    /// Start a new job, replacing the running one if there is any.
    ///
    /// Returns once the job has been spawned; its output is streamed in the background.
    pub async fn start(&self, params: &str, run_name: &str) -> error::Result<Started> {
        let params = RunParameters::parse(params)?;
        let run_name = RunName::new(run_name)?;
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Start {
                params,
                run_name,
                response: tx,
            })
            .await
            .map_err(|_| Error::SupervisorGone)?;
        rx.await.map_err(|_| Error::SupervisorGone)?
    }

    /// Stop the running job and archive its log. Returns after the archive is written.
    ///
    /// `run_name` only labels the request; the log is always archived under the name the
    /// job was started with.
    pub async fn stop(&self, run_name: &str) -> error::Result<StopOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Stop {
                requested: run_name.trim().to_string(),
                response: tx,
            })
            .await
            .map_err(|_| Error::SupervisorGone)?;
        rx.await.map_err(|_| Error::SupervisorGone)
    }

    pub async fn status(&self) -> error::Result<SupervisorStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(GetStatus { response: tx })
            .await
            .map_err(|_| Error::SupervisorGone)?;
        rx.await.map_err(|_| Error::SupervisorGone)
    }

    /// The live log the jobs write into.
    pub fn log(&self) -> &LogSink {
        &self.sink
    }
}
