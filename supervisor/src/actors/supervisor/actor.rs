use super::messages::SupervisorMessage;
use crate::actors::job::{JobHandle, Terminated};
use crate::actors::stream::{self, StreamEnd};
use crate::archive::RunArchiver;
use crate::cancel::CancellationSignal;
use crate::config::SupervisorConfig;
use crate::error::{self, Error, ValidationError};
use crate::outcome::{Started, StopOutcome, Stopped, SupervisorStatus};
use crate::params::{RunName, RunParameters};
use crate::sink::LogSink;
use crate::types::JobId;
use std::sync::Arc;
use tokio::{select, sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn, Level};

/// The job currently owned by the supervisor, with the task draining its output.
struct ActiveJob {
    handle: JobHandle,
    stream: JoinHandle<StreamEnd>,
}

pub struct Supervisor {
    inbox: mpsc::Receiver<SupervisorMessage>,
    finished_tx: mpsc::UnboundedSender<JobId>,
    finished_rx: mpsc::UnboundedReceiver<JobId>,
    config: SupervisorConfig,
    sink: Arc<LogSink>,
    archiver: RunArchiver,
    cancel: CancellationSignal,
    current: Option<ActiveJob>,
}

impl Supervisor {
    pub fn spawn(
        inbox: mpsc::Receiver<SupervisorMessage>,
        config: SupervisorConfig,
        sink: Arc<LogSink>,
    ) {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let actor = Self {
            inbox,
            finished_tx,
            finished_rx,
            archiver: RunArchiver::new(config.results_root.clone()),
            config,
            sink,
            cancel: CancellationSignal::new(),
            current: None,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::SupervisorMessage::*;
        loop {
            select! {
                maybe_msg = self.inbox.recv() => {
                    let Some(msg) = maybe_msg else {
                        break;
                    };
                    match msg {
                        Start {
                            params,
                            run_name,
                            response,
                        } => {
                            let _ = response.send(self.start(params, run_name).await);
                        }
                        Stop {
                            requested,
                            response,
                        } => {
                            let _ = response.send(self.stop(requested).await);
                        }
                        GetStatus { response } => {
                            let _ = response.send(self.status());
                        }
                    }
                }
                // finished_tx lives in self, so this channel never closes
                Some(job_id) = self.finished_rx.recv() => {
                    self.finish(job_id).await;
                }
            }
        }

        // every handle dropped, make sure the job does not outlive us
        if let Some(job) = self.current.take() {
            info!(pid = job.handle.pid(), "supervisor shutting down, stopping job");
            self.retire(job).await;
        }
    }

    async fn start(&mut self, params: RunParameters, run_name: RunName) -> error::Result<Started> {
        self.check_collision(&run_name)?;

        let replaced = match self.current.take() {
            Some(job) => {
                warn!(
                    pid = job.handle.pid(),
                    run = %job.handle.run_name(),
                    "replacing the job that is still running"
                );
                Some(self.retire(job).await)
            }
            None => None,
        };

        self.cancel.clear();
        let command = self.config.command_line(&params, &run_name);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let handle = match JobHandle::spawn(self.config.shell(), command.clone(), run_name, output_tx)
        {
            Ok(handle) => handle,
            Err(source) => {
                error!(%command, %source, "failed to launch job");
                return Err(Error::Spawn { command, source });
            }
        };

        let pid = handle.pid();
        info!(
            pid,
            pgid = handle.process_group(),
            run = %handle.run_name(),
            "job started"
        );
        self.note(Level::WARN, &format!("PID {} Start. {}", pid, handle.command()));

        let stream = stream::spawn(
            handle.id(),
            pid,
            output_rx,
            Arc::clone(&self.sink),
            self.cancel.watch(),
            self.finished_tx.clone(),
        );
        let started = Started {
            job_id: handle.id(),
            pid,
            run_name: handle.run_name().clone(),
            command,
            replaced,
        };
        self.current = Some(ActiveJob { handle, stream });
        Ok(started)
    }

    fn check_collision(&self, run_name: &RunName) -> Result<(), ValidationError> {
        if let Some(job) = &self.current {
            if job.handle.run_name() == run_name {
                return Err(ValidationError::RunActive(run_name.to_string()));
            }
        }
        let run_dir = self.config.run_dir(run_name);
        if run_dir.exists() {
            return Err(ValidationError::RunExists(run_dir));
        }
        Ok(())
    }

    async fn stop(&mut self, requested: String) -> StopOutcome {
        self.cancel.set();
        let Some(job) = self.current.take() else {
            warn!("no job to stop");
            return StopOutcome::NothingToStop;
        };
        let mismatch = !requested.is_empty() && requested != job.handle.run_name().as_str();
        if mismatch {
            warn!(
                requested = %requested,
                run = %job.handle.run_name(),
                "stop named another run, stopping the active one"
            );
        }
        let mut stopped = self.retire(job).await;
        if mismatch {
            stopped.requested = Some(requested);
        }
        match stopped.terminated {
            Terminated::AlreadyExited(_) => StopOutcome::AlreadyFinished(stopped),
            _ => StopOutcome::Stopped(stopped),
        }
    }

    fn status(&self) -> SupervisorStatus {
        match &self.current {
            None => SupervisorStatus::Idle,
            Some(ActiveJob { handle, .. }) => {
                let status = handle.status();
                if status.is_running() {
                    SupervisorStatus::Running {
                        job_id: handle.id(),
                        pid: handle.pid(),
                        run_name: handle.run_name().clone(),
                        command: handle.command().to_string(),
                    }
                } else {
                    SupervisorStatus::Exited {
                        pid: handle.pid(),
                        run_name: handle.run_name().clone(),
                        status,
                    }
                }
            }
        }
    }

    /// The streaming task for `job_id` has ended on its own.
    async fn finish(&mut self, job_id: JobId) {
        let is_current = matches!(&self.current, Some(job) if job.handle.id() == job_id);
        if !is_current {
            debug!(%job_id, "stream ended for a job that was already retired");
            return;
        }
        let Some(mut job) = self.current.take() else {
            return;
        };
        // output is closed, give the process the grace period to exit by itself
        if job.handle.wait_for_exit(self.config.grace_period).await.is_none() {
            warn!(pid = job.handle.pid(), "job closed its output but is still running");
        }
        let stopped = self.retire(job).await;
        info!(pid = stopped.pid, run = %stopped.run_name, "job finished");
    }

    /// Terminate `job` if needed, wait for its output to stop, then archive its log.
    async fn retire(&mut self, mut job: ActiveJob) -> Stopped {
        self.cancel.set();
        let terminated = job.handle.shutdown(self.config.grace_period).await;
        match (&mut job.stream).await {
            Ok(end) => debug!(pid = job.handle.pid(), ?end, "output stream joined"),
            Err(err) => error!(pid = job.handle.pid(), %err, "output stream task failed"),
        }

        let pid = job.handle.pid();
        match terminated {
            Terminated::AlreadyExited(status) => {
                self.note(Level::INFO, &format!("PID {} {}.", pid, status))
            }
            Terminated::Graceful(_) => self.note(Level::WARN, &format!("PID {} was terminated.", pid)),
            Terminated::Forced(_) => {
                self.note(Level::WARN, &format!("PID {} was force-terminated.", pid))
            }
        }

        let run_name = job.handle.run_name().clone();
        let archive = self.archiver.archive(&self.sink, &run_name);
        match &archive {
            Ok(path) => info!(pid, run = %run_name, path = %path.display(), "log archived"),
            Err(err) => warn!(pid, run = %run_name, %err, "log not archived"),
        }
        Stopped {
            pid,
            run_name,
            terminated,
            archive,
            requested: None,
        }
    }

    /// Write a supervisor line into the live log.
    fn note(&self, level: Level, message: &str) {
        if let Err(err) = self.sink.record(level, message) {
            warn!(%err, "failed to write to the log");
        }
    }
}
