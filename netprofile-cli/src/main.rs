use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use console::style;
use netprofile_cli::cli::{Cli, Commands};
use netprofile_cli::commands::{check::check, list::list, resolve::resolve};
use netprofile_config::Config;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Cli::parse();

    let load_config = |path: &Option<PathBuf>| {
        match path {
            None => Config::nearest(),
            Some(file) => Config::from_file(file),
        }
        .wrap_err("Could not load config")
    };

    match args.command {
        Commands::Resolve {
            network,
            config,
            secrets,
            show_endpoint,
            json,
        } => {
            let cfg = load_config(&config)?;
            resolve(&cfg, network.as_deref(), &secrets, show_endpoint, json)?;
            // keep JSON output parseable
            if json {
                return Ok(());
            }
        }
        Commands::List { config, json } => {
            let cfg = load_config(&config)?;
            list(&cfg, json)?;
            return Ok(());
        }
        Commands::Check { config, secrets } => {
            let cfg = load_config(&config)?;
            check(&cfg, &secrets)?;
        }
    }

    println!("{}", style("Done!").bold().green());
    Ok(())
}
