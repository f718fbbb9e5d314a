#![doc(html_no_source)]
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate_to, Shell};
use clap_mangen::Man;
use color_eyre::eyre::Result;
use netprofile_cli::cli::{Cli as NetprofileCli, BINARY_NAME};

use std::fs;
use std::path::{Path, PathBuf};

mod generate_schema;

#[derive(Debug, Parser)]
#[clap(about = "xtasks for netprofile", long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Produce auto completion files for the netprofile CLI
    GenerateAutoComplete,
    /// Produce man pages for the netprofile CLI
    GenerateMan,
    /// Generate the JSON schema of the config file
    GenerateSchema {
        /// Output directory
        #[clap(value_parser)]
        out: PathBuf,
    },
}

fn root_path() -> PathBuf {
    let xtask_path = env!("CARGO_MANIFEST_DIR").to_string();
    Path::new(&xtask_path)
        .parent()
        .expect("Root directory exists")
        .into()
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();
    match args.command {
        Commands::GenerateAutoComplete => {
            let complete_path = root_path().join("complete");
            fs::create_dir_all(&complete_path)?;
            for shell in [Shell::Bash, Shell::Fish, Shell::Zsh] {
                generate_to(
                    shell,
                    &mut NetprofileCli::command(),
                    BINARY_NAME,
                    &complete_path,
                )?;
            }
        }
        Commands::GenerateMan => {
            let man_path = root_path().join("man");
            fs::create_dir_all(&man_path)?;

            let man = Man::new(NetprofileCli::command());
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            fs::write(man_path.join(format!("{BINARY_NAME}.1")), buffer)?;
        }
        Commands::GenerateSchema { out } => {
            generate_schema::run(&out)?;
        }
    }

    Ok(())
}
