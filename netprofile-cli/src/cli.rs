use clap::{Args, Parser, Subcommand};
use std::fmt::Debug;
use std::path::PathBuf;

pub const BINARY_NAME: &str = "netprofile";

#[derive(Debug, Parser)]
#[clap(name = BINARY_NAME, about = "Resolve network profiles for contract deployments", long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Where secrets are looked up
#[derive(Debug, Clone, Args)]
pub struct SecretArgs {
    /// Directory with one file per secret, consulted before the environment
    #[clap(long = "secrets-dir", value_parser, value_hint = clap::ValueHint::DirPath)]
    pub secrets_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a network into its connection and signing profile
    Resolve {
        /// Network to resolve (defaults to `default_network` or NETPROFILE_NETWORK)
        #[clap(value_parser)]
        network: Option<String>,
        /// Explicit config file
        #[clap(short = 'c', long = "config", value_parser, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,
        #[clap(flatten)]
        secrets: SecretArgs,
        /// Print the endpoint with secrets substituted instead of its template
        #[clap(long, action, default_value = "false")]
        show_endpoint: bool,
        /// Print JSON
        #[clap(short = 'j', long = "json")]
        json: bool,
    },
    /// List configured networks
    List {
        /// Explicit config file
        #[clap(short = 'c', long = "config", value_parser, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Print JSON
        #[clap(short = 'j', long = "json")]
        json: bool,
    },
    /// Resolve every configured network and report the ones that fail
    Check {
        /// Explicit config file
        #[clap(short = 'c', long = "config", value_parser, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,
        #[clap(flatten)]
        secrets: SecretArgs,
    },
}
