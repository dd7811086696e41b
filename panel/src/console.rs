use futures::FutureExt;
use inference_supervisor::RequestSurface;
use std::{io, str::FromStr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::error;

pub const HELP: &str = "\
commands:
  start <run> <params...>   start a run, replacing the running one
  stop [run]                stop the running job and archive its log
  status                    show what is running
  log [lines]               show the end of the live log (default 10 lines)
  help                      show this text
  quit                      stop the running job and exit";

const DEFAULT_TAIL: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start { run_name: String, params: String },
    Stop { run_name: String },
    Status,
    Log { lines: usize },
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match verb {
            "start" => {
                // the params keep their quoting, they go to a shell untouched
                let (run_name, params) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: start <run> <params...>".to_string())?;
                Ok(Command::Start {
                    run_name: run_name.to_string(),
                    params: params.trim().to_string(),
                })
            }
            "stop" => Ok(Command::Stop {
                run_name: rest.to_string(),
            }),
            "status" => Ok(Command::Status),
            "log" if rest.is_empty() => Ok(Command::Log {
                lines: DEFAULT_TAIL,
            }),
            "log" => rest
                .parse()
                .map(|lines| Command::Log { lines })
                .map_err(|_| format!("not a line count: {}", rest)),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command `{}`, try `help`", other)),
        }
    }
}

/// Answer one command. Start and stop may run concurrently with each other.
pub async fn dispatch(surface: &RequestSurface, command: Command) -> String {
    match command {
        Command::Start { run_name, params } => surface.start(&params, &run_name).await,
        Command::Stop { run_name } => surface.stop(&run_name).await,
        Command::Status => surface.status().await,
        Command::Log { lines } => surface.log_tail(lines),
        Command::Help => HELP.to_string(),
        Command::Quit => surface.stop("").await,
    }
}

/// Read commands from stdin until `quit` or end of input. Every command runs as its own
/// task, the way requests from a front end would arrive.
pub async fn interactive(surface: RequestSurface) -> io::Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => {
                let surface = surface.clone();
                requests.spawn(async move {
                    println!("{}", dispatch(&surface, command).await);
                });
            }
            Err(err) => println!("{}", err),
        }
        // collect the requests that already answered
        while let Some(Some(joined)) = requests.join_next().now_or_never() {
            if let Err(err) = joined {
                error!(%err, "request task failed");
            }
        }
    }

    while let Some(joined) = requests.join_next().await {
        if let Err(err) = joined {
            error!(%err, "request task failed");
        }
    }
    println!("{}", dispatch(&surface, Command::Quit).await);
    Ok(())
}
