use eyre::Result;
use netprofile_config::{Config, SigningKind};
use serde::Serialize;

use crate::stylist;

#[derive(Debug, Serialize)]
struct NetworkEntry<'a> {
    name: &'a str,
    url: String,
    chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<u64>,
    signing: SigningKind,
    default: bool,
}

/// Command that lists the configured networks without resolving anything.
pub fn list(cfg: &Config, json: bool) -> Result<()> {
    let entries: Vec<_> = cfg
        .networks
        .iter()
        .map(|(name, def)| NetworkEntry {
            name,
            url: def.url.to_string(),
            chain_id: def.chain_id.get(),
            gas_price: def.gas_price,
            signing: def.signing.kind(),
            default: cfg.default_network.as_deref() == Some(name.as_str()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("{}", stylist::warning("No networks configured"));
    }
    for e in entries {
        println!(
            "{} {} {} {} {}",
            if e.default { "*" } else { " " },
            stylist::network(e.name),
            stylist::label(format!("chain {}", e.chain_id)),
            e.signing,
            e.url
        );
    }
    Ok(())
}
