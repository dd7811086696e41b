use crate::params::{RunName, RunParameters};
use crate::sink::Rotation;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supervisor configuration.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Shell used to run the assembled command line
    pub shell: PathBuf,
    /// The detection tool, as it would be typed in a shell
    pub tool: String,
    pub task: String,
    pub mode: String,
    /// Where the tool writes `<run>/`, and where run logs are archived
    pub results_root: PathBuf,
    /// The live log file
    pub log_path: PathBuf,
    pub rotation: Rotation,
    /// Rotated log files kept next to the live one
    pub log_backups: usize,
    /// How long a job gets to exit after the graceful signal before it is killed
    pub grace_period: Duration,
    /// Capacity of the supervisor's request queue
    pub message_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
            tool: "yolo".into(),
            task: "detect".into(),
            mode: "predict".into(),
            results_root: PathBuf::from("runs/detect"),
            log_path: PathBuf::from("inference.log"),
            rotation: Rotation::Daily,
            log_backups: 1,
            grace_period: Duration::from_secs(5),
            message_capacity: 32,
        }
    }
}

impl SupervisorConfig {
    /// `<tool> <task> <mode> <params> project=<results-root> name=<run>`
    pub fn command_line(&self, params: &RunParameters, run_name: &RunName) -> String {
        format!(
            "{} {} {} {} project={} name={}",
            self.tool,
            self.task,
            self.mode,
            params,
            shell_quote(&self.results_root.to_string_lossy()),
            shell_quote(run_name.as_str()),
        )
    }

    pub fn run_dir(&self, run_name: &RunName) -> PathBuf {
        self.results_root.join(run_name)
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
