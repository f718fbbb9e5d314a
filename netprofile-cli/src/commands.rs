use netprofile_config::secret::{ChainedSecretProvider, EnvSecretProvider, FileSecretProvider};

use crate::cli::SecretArgs;

pub mod check;
pub mod list;
pub mod resolve;

/// Secrets directory (if any) first, then the environment.
pub fn secret_provider(args: &SecretArgs) -> ChainedSecretProvider {
    let chain = ChainedSecretProvider::new();
    let chain = match &args.secrets_dir {
        Some(dir) => {
            tracing::debug!("Reading secrets from {}", dir.display());
            chain.with(FileSecretProvider::new(dir))
        }
        None => chain,
    };
    chain.with(EnvSecretProvider)
}
