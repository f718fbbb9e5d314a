use eyre::Result;
use netprofile_config::secret::Secp256k1KeyValidator;
use netprofile_config::{Config, ResolvedProfile, SigningKind};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::cli::SecretArgs;
use crate::commands::secret_provider;
use crate::stylist;

/// What gets printed about a resolved profile.  Keys are only ever counted.
#[derive(Debug, Serialize)]
pub struct ProfileReport {
    pub network: String,
    pub endpoint: String,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    pub signing: SigningKind,
    pub signing_keys: usize,
}

impl ProfileReport {
    /// Unless `show_endpoint` is set, the endpoint is reported as its template so that
    /// substituted secrets (e.g., API keys) stay out of terminals and logs.
    pub fn new(cfg: &Config, profile: &ResolvedProfile, show_endpoint: bool) -> Self {
        let endpoint = if show_endpoint {
            profile.endpoint().expose_secret().clone()
        } else {
            cfg.networks
                .get(profile.network())
                .map(|def| def.url.to_string())
                .unwrap_or_default()
        };
        Self {
            network: profile.network().to_string(),
            endpoint,
            chain_id: profile.chain_id().get(),
            gas_price: profile.gas_price(),
            signing: profile.signing(),
            signing_keys: profile.signing_keys().len(),
        }
    }

    fn print(&self) {
        println!(
            "{} network {}",
            console::style("Resolved").bold().green(),
            stylist::network(&self.network)
        );
        println!("  {} {}", stylist::label("endpoint: "), self.endpoint);
        println!("  {} {}", stylist::label("chain id: "), self.chain_id);
        match self.gas_price {
            Some(price) => println!("  {} {price}", stylist::label("gas price:")),
            None => println!("  {} chain default", stylist::label("gas price:")),
        }
        match self.signing {
            SigningKind::Explicit => println!(
                "  {} {} key(s) loaded",
                stylist::label("signing:  "),
                self.signing_keys
            ),
            SigningKind::ExternalManual => println!(
                "  {} external signer, no keys loaded",
                stylist::label("signing:  ")
            ),
        }
    }
}

/// Command that resolves one network (the default one if `network` is `None`).
///
/// # Arguments
///
/// * `cfg`           - Project configuration
/// * `network`       - Network to resolve
/// * `secrets`       - Where to look up secrets
/// * `show_endpoint` - Print the substituted endpoint rather than its template
/// * `json`          - Print JSON instead of text
pub fn resolve(
    cfg: &Config,
    network: Option<&str>,
    secrets: &SecretArgs,
    show_endpoint: bool,
    json: bool,
) -> Result<()> {
    let profile = cfg.resolve(network, secret_provider(secrets), Secp256k1KeyValidator)?;
    let report = ProfileReport::new(cfg, &profile, show_endpoint);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}
