use console::style;
use eyre::{bail, Result};
use netprofile_config::secret::Secp256k1KeyValidator;
use netprofile_config::{Config, NetworkProfileResolver};

use crate::cli::SecretArgs;
use crate::commands::secret_provider;
use crate::stylist;

/// Command that resolves every configured network.  Fails if any of them cannot be resolved.
pub fn check(cfg: &Config, secrets: &SecretArgs) -> Result<()> {
    let resolver = NetworkProfileResolver::new(secret_provider(secrets), Secp256k1KeyValidator);
    let results = resolver.resolve_all(&cfg.networks);
    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(_) => println!(
                "{} {}",
                style("ok    ").bold().green(),
                stylist::network(name)
            ),
            Err(e) => {
                failed += 1;
                println!(
                    "{} {}: {e}",
                    stylist::failure("FAILED"),
                    stylist::network(name)
                );
            }
        }
    }
    if failed > 0 {
        bail!(
            "{failed} of {} network(s) could not be resolved",
            results.len()
        );
    }
    Ok(())
}
