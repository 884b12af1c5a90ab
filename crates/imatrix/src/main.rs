mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, ColorMode, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr; stdout carries command output only. `--quiet`
/// drops warnings unless `-v` is also given.
fn init_tracing(cli: &Cli) {
    let filter = match (cli.global.verbose, cli.global.quiet) {
        (0, true) => "error",
        (0, false) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_ansi(!matches!(cli.global.color, ColorMode::Never))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without an account connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "imatrix", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let hub_config = config::build_hub_config(&cli.global)?;
            tracing::debug!(command = ?cmd, email = %hub_config.email, "dispatching command");
            commands::dispatch(cmd, hub_config, &cli.global).await
        }
    }
}
