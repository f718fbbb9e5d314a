use std::{collections::BTreeMap, fmt::Display, num::NonZeroU64};

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::{
    interpolation::EndpointTemplate,
    secret::{SecretRef, SecretValue},
    NetworkName,
};

/// Named network definitions, ordered by name.
pub type NetworkCatalog = BTreeMap<NetworkName, NetworkDefinition>;

/// How transactions sent to a network get signed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    /// The tool signs with the private keys stored under these secret
    /// references (at least one is required).
    Explicit(Vec<SecretRef>),
    /// Signing happens in an out-of-process signer (e.g., a hardware
    /// wallet or a browser extension); no key is ever looked up.
    ExternalManual,
}

impl SigningMode {
    /// The variant, without the key references.
    pub fn kind(&self) -> SigningKind {
        match self {
            Self::Explicit(_) => SigningKind::Explicit,
            Self::ExternalManual => SigningKind::ExternalManual,
        }
    }
}

/// Field-less counterpart of [`SigningMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SigningKind {
    /// See [`SigningMode::Explicit`]
    Explicit,
    /// See [`SigningMode::ExternalManual`]
    ExternalManual,
}

impl Display for SigningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::ExternalManual => "external_manual",
        })
    }
}

/// Static definition of one target network.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NetworkDefinition {
    /// RPC endpoint; may embed secrets via `${NAME}` placeholders
    pub url: EndpointTemplate,
    /// Chain id of the target chain
    pub chain_id: NonZeroU64,
    /// Gas price override; absent means "use chain default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    /// How transactions get signed
    pub signing: SigningMode,
}

lazy_static! {
    /// Opaque tokens that look like API keys: long, and mixing letters with digits.
    static ref KEY_LIKE: Regex = Regex::new(r"^[A-Za-z0-9_\-]{20,}$").unwrap();
    static ref HAS_DIGIT: Regex = Regex::new(r"[0-9]").unwrap();
    static ref HAS_ALPHA: Regex = Regex::new(r"[A-Za-z]").unwrap();
}

fn looks_like_key(s: &str) -> bool {
    KEY_LIKE.is_match(s) && HAS_DIGIT.is_match(s) && HAS_ALPHA.is_match(s)
}

impl NetworkDefinition {
    /// Returns `true` if the endpoint has no placeholders but points at
    /// a remote host with a path segment or query value that looks like
    /// an embedded API key.  Such secrets belong behind a `${NAME}`
    /// placeholder instead of in the config file.
    pub fn has_literal_secret(&self) -> bool {
        if !self.url.is_literal() {
            return false;
        }
        let Ok(url) = Url::parse(&self.url.to_string()) else {
            return false;
        };
        let remote = match url.host() {
            Some(Host::Domain(d)) => d != "localhost",
            Some(Host::Ipv4(ip)) => !ip.is_loopback(),
            Some(Host::Ipv6(ip)) => !ip.is_loopback(),
            None => false,
        };
        if !remote {
            return false;
        }
        let in_path = url
            .path_segments()
            .map(|mut segs| segs.any(looks_like_key))
            .unwrap_or(false);
        in_path || url.query_pairs().any(|(_, v)| looks_like_key(&v))
    }
}

/// A fully resolved, validated connection and signing configuration
/// for one network.
///
/// Only the resolver creates these, so every instance satisfies:
/// - `endpoint` contains no placeholder tokens;
/// - `signing_keys` is empty iff the signing kind is
///   [`SigningKind::ExternalManual`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedProfile {
    pub(crate) network: NetworkName,
    pub(crate) endpoint: SecretValue,
    pub(crate) chain_id: NonZeroU64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) gas_price: Option<u64>,
    pub(crate) signing: SigningKind,
    pub(crate) signing_keys: Vec<SecretValue>,
}

impl ResolvedProfile {
    /// Name of the network this profile was resolved from.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Endpoint with all placeholders substituted.  May contain
    /// secrets (e.g., an API key), hence wrapped.
    pub fn endpoint(&self) -> &SecretValue {
        &self.endpoint
    }

    /// Chain id.
    pub fn chain_id(&self) -> NonZeroU64 {
        self.chain_id
    }

    /// Gas price override, if any.
    pub fn gas_price(&self) -> Option<u64> {
        self.gas_price
    }

    /// How transactions for this network get signed.
    pub fn signing(&self) -> SigningKind {
        self.signing
    }

    /// Private keys in declaration order (empty for external signing).
    pub fn signing_keys(&self) -> &[SecretValue] {
        &self.signing_keys
    }
}
