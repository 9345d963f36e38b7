mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::Session;
use output::print_error;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let format = cli.format.unwrap_or_default();
    let config = cli.config.as_deref();
    let open = |permissions: &str| Session::open(config, permissions, &cli.user_id, &cli.token);

    match &cli.command {
        Commands::Compile(args) => {
            let session = open(args.permissions.as_str())?;
            commands::compile::compile(&session, format)?;
        }
        Commands::Evaluate(args) => {
            let session = open(args.permissions.as_str())?;
            commands::evaluate::evaluate(&session, args, format)?;
        }
        Commands::Filter(args) => {
            let session = open(args.permissions.as_str())?;
            commands::filter::filter(&session, args)?;
        }
        Commands::Match(args) => {
            let session = open(args.permissions.as_str())?;
            commands::matching::check(&session, args)?;
        }
    }

    Ok(())
}
