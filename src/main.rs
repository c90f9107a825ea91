mod claude;
mod cli;
mod commands;
mod config;
mod constants;
mod context;
mod context_info;
mod error;
mod git;
mod hook;
mod init;
mod manager;
mod notify;
mod process;
mod settings_merge;
mod ui;
mod workspace;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::Config;
use tracing_subscriber::EnvFilter;
use ui::OutputMode;

const LOG_ENV: &str = "CLAUDECTL_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mode = OutputMode::from_flag(cli.json);

    if let Err(err) = run(cli) {
        ui::render_error(mode, &err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mode = OutputMode::from_flag(cli.json);
    commands::run(cli.command, &config, mode, cli.verbose)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("claudectl=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("claudectl=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
