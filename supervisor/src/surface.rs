use crate::actors::supervisor::SupervisorHandle;
use tracing::warn;

/// The operations offered to a front end. Every call ends in a human-readable line.
#[derive(Clone)]
pub struct RequestSurface {
    supervisor: SupervisorHandle,
}

impl RequestSurface {
    pub fn new(supervisor: SupervisorHandle) -> Self {
        Self { supervisor }
    }

    pub async fn start(&self, params: &str, run_name: &str) -> String {
        match self.supervisor.start(params, run_name).await {
            Ok(started) => started.to_string(),
            Err(err) => {
                warn!(run = run_name, %err, "start rejected");
                format!("Start rejected: {}", err)
            }
        }
    }

    pub async fn stop(&self, run_name: &str) -> String {
        match self.supervisor.stop(run_name).await {
            Ok(outcome) => outcome.to_string(),
            Err(err) => format!("Stop failed: {}", err),
        }
    }

    pub async fn status(&self) -> String {
        match self.supervisor.status().await {
            Ok(status) => status.to_string(),
            Err(err) => format!("Status unavailable: {}", err),
        }
    }

    /// The last `lines` lines of the live log, or why they could not be read.
    pub fn log_tail(&self, lines: usize) -> String {
        match self.supervisor.log().tail(lines) {
            Ok(lines) => lines.join("\n"),
            Err(err) => format!(
                "Cannot read {}: {}",
                self.supervisor.log().path().display(),
                err
            ),
        }
    }
}
