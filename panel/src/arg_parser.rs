use clap::{Parser, Subcommand, ValueEnum};
use inference_supervisor::sink::Rotation;
use inference_supervisor::SupervisorConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Launch and supervise object-detection runs
#[derive(Debug, Parser)]
#[command(name = "panel", version)]
pub struct ArgParser {
    /// The detection tool, as it would be typed in a shell
    #[arg(long, env = "PANEL_TOOL", default_value = "yolo")]
    pub tool: String,

    /// Task passed to the tool
    #[arg(long, env = "PANEL_TASK", default_value = "detect")]
    pub task: String,

    /// Mode passed to the tool
    #[arg(long, env = "PANEL_MODE", default_value = "predict")]
    pub mode: String,

    /// Directory the tool writes `<run>/` into
    #[arg(long, env = "PANEL_RESULTS_ROOT", default_value = "runs/detect")]
    pub results_root: PathBuf,

    /// The live log file
    #[arg(long, env = "PANEL_LOG_FILE", default_value = "inference.log")]
    pub log_file: PathBuf,

    /// When the live log rolls over
    #[arg(long, value_enum, env = "PANEL_ROTATION", default_value_t = RotationArg::Daily)]
    pub rotation: RotationArg,

    /// Size limit for `--rotation size`
    #[arg(long, env = "PANEL_MAX_LOG_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_log_bytes: u64,

    /// Rotated log files to keep
    #[arg(long, env = "PANEL_LOG_BACKUPS", default_value_t = 1)]
    pub log_backups: usize,

    /// How long a job gets to exit after a stop before it is killed, e.g. `5s`
    #[arg(long, env = "PANEL_GRACE_PERIOD", default_value = "5s", value_parser = humantime::parse_duration)]
    pub grace_period: Duration,

    /// The sub-command to use, `interactive` when omitted
    #[command(subcommand)]
    pub sub_command: Option<SubCommand>,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// read start/stop/status/log commands from stdin
    Interactive,
    /// run one job in the foreground, Ctrl-C stops it
    Run {
        /// name of the run, and of its results directory
        run_name: String,

        /// arguments for the tool, e.g. model=yolov10n.pt source=video.mp4
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        params: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RotationArg {
    /// never roll over
    Never,
    /// roll over at midnight
    Daily,
    /// roll over at --max-log-bytes
    Size,
}

impl ArgParser {
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let rotation = match self.rotation {
            RotationArg::Never => Rotation::Never,
            RotationArg::Daily => Rotation::Daily,
            RotationArg::Size => Rotation::MaxBytes(self.max_log_bytes),
        };
        SupervisorConfig {
            tool: self.tool.clone(),
            task: self.task.clone(),
            mode: self.mode.clone(),
            results_root: self.results_root.clone(),
            log_path: self.log_file.clone(),
            rotation,
            log_backups: self.log_backups,
            grace_period: self.grace_period,
            ..SupervisorConfig::default()
        }
    }
}
