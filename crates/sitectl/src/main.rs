mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sitectl_core::SiteController;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::ConsoleReporter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;

            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "sitectl", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = sitectl_config::load_config()?;
            let conn = config::resolve_server(&cfg, None, &global)?;
            let reporter = Arc::new(ConsoleReporter::new(
                global.quiet,
                output::should_color(global.color),
                global.output,
            ));
            let controller =
                SiteController::new(conn, reporter).with_project_dir(global.project.clone());

            let ctx = Context {
                cfg: &cfg,
                global: &global,
                controller: &controller,
            };
            commands::dispatch(cmd, &ctx).await
        }
    }
}
