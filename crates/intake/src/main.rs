use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::app::{App, Commands};

mod cli;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = App::parse();
    match app.cmd {
        Commands::Sanitize(arg) => cli::sanitize::run(&arg)?,
        Commands::Check(arg) => return cli::check::run(&arg),
        Commands::Limits(arg) => cli::limits::run(&arg)?,
    }
    Ok(ExitCode::SUCCESS)
}
