use crate::error;
use crate::outcome::{Started, StopOutcome, SupervisorStatus};
use crate::params::{RunName, RunParameters};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum SupervisorMessage {
    Start {
        params: RunParameters,
        run_name: RunName,
        response: oneshot::Sender<error::Result<Started>>,
    },
    Stop {
        requested: String,
        response: oneshot::Sender<StopOutcome>,
    },
    GetStatus {
        response: oneshot::Sender<SupervisorStatus>,
    },
}
