mod arg_parser;
mod console;

use arg_parser::{ArgParser, SubCommand};
use inference_supervisor::outcome::SupervisorStatus;
use inference_supervisor::{RequestSurface, Supervisor};

use clap::Parser;
use std::{error, time::Duration};
use tokio::{select, signal, time};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inference_supervisor=info,panel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.supervisor_config();
    info!(
        tool = %config.tool,
        results_root = %config.results_root.display(),
        log = %config.log_path.display(),
        "starting panel"
    );
    let supervisor = Supervisor::spawn(config)?;
    let surface = RequestSurface::new(supervisor.clone());

    match args.sub_command.unwrap_or(SubCommand::Interactive) {
        SubCommand::Interactive => console::interactive(surface).await?,
        SubCommand::Run { run_name, params } => {
            run_once(&supervisor, &surface, &run_name, &params.join(" ")).await?
        }
    }

    Ok(())
}

/// Start one run and wait until it has finished and been archived.
async fn run_once(
    supervisor: &Supervisor,
    surface: &RequestSurface,
    run_name: &str,
    params: &str,
) -> Result<(), Box<dyn error::Error>> {
    let started = supervisor.start(params, run_name).await?;
    println!("{}", started);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = time::interval(POLL_INTERVAL);
    loop {
        select! {
            _ = &mut ctrl_c => {
                println!("{}", surface.stop(run_name).await);
                break;
            }
            _ = poll.tick() => {
                if supervisor.status().await? == SupervisorStatus::Idle {
                    println!("Run `{}` finished.", run_name);
                    break;
                }
            }
        }
    }
    Ok(())
}
