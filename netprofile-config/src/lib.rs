#![warn(missing_docs)]

//! This crate exposes the network profile configuration interface [`Config`] and the
//! [`NetworkProfileResolver`] that turns a named network into a ready-to-use connection and
//! signing profile.
//!
//! Projects keep a JSON config file `netprofile.json`, which specifies:
//! - [`compiler`](Config::compiler): the contract compiler version to build with,
//! - [`networks`](Config::networks): named network definitions (see [network configuration](network)),
//! - [`default_network`](Config::default_network): network used when none is requested (can be
//!   overridden via the `NETPROFILE_NETWORK` env var).
//!
//! Example JSON file:
//! ```
//! # use netprofile_config::Config;
//! # use serde_json::{from_str, json};
//! # let cfg_json = json!(
//! {
//!    "compiler": { "version": "0.8.27" },
//!    "networks": {
//!      "local": {
//!        "url": "http://localhost:8545",
//!        "chain_id": 43112,
//!        "gas_price": 1,
//!        "signing": "external_manual"
//!      },
//!      "sepolia": {
//!        "url": "https://eth-sepolia.g.alchemy.com/v2/${ALCHEMY_API_KEY}",
//!        "chain_id": 11155111,
//!        "signing": "external_manual"
//!      },
//!      "mainnet": {
//!        "url": "https://eth-mainnet.g.alchemy.com/v2/${ALCHEMY_API_KEY}",
//!        "chain_id": 1,
//!        "signing": { "explicit": ["DEPLOY_KEY"] }
//!      }
//!    },
//!    "default_network": "local"
//! }
//! # );
//! # let cfg: Config = from_str(&cfg_json.to_string()).unwrap();
//! ```
//!
//! You can load config files with [`Config::nearest`], which finds the JSON file in the current
//! directory or any parent directory:
//!
//! ```no_run
//! use netprofile_config::Config;
//! let cfg = Config::nearest().unwrap();
//! ```
//! Alternatively, [`Config::from_dir`] loads the default config file in a given directory and
//! [`Config::from_file`] loads an explicitly named file.
//!
//! Resolving the selected network:
//!
//! ```no_run
//! use netprofile_config::{Config, secret::{EnvSecretProvider, Secp256k1KeyValidator}};
//! let cfg = Config::nearest().unwrap();
//! let profile = cfg.resolve(None, EnvSecretProvider, Secp256k1KeyValidator).unwrap();
//! println!("chain id: {}", profile.chain_id());
//! ```

pub use network::{NetworkCatalog, NetworkDefinition, ResolvedProfile, SigningKind, SigningMode};
pub use resolver::{NetworkProfileResolver, ResolutionError};

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secret::{CredentialValidator, SecretProvider};
use thiserror::Error;

/// This module exposes the network definition interface [`NetworkDefinition`].
///
/// Each definition has:
///
/// - [`url`](NetworkDefinition::url): RPC endpoint, possibly containing `${NAME}` placeholders
/// - [`chain_id`](NetworkDefinition::chain_id): id of the target chain (must be positive)
/// - [`gas_price`](NetworkDefinition::gas_price): optional gas price override
/// - [`signing`](NetworkDefinition::signing): how transactions get signed
///   ([`SigningMode`](crate::network::SigningMode))
///
/// # Signing
///
/// A network either lists the secret references of the private keys the tool signs with,
/// ```
/// # use netprofile_config::*;
/// # use serde_json::json;
/// # let def: NetworkDefinition = serde_json::from_value(json!(
/// {
///   "url": "https://rpc.example/prod",
///   "chain_id": 43114,
///   "signing": { "explicit": ["DEPLOY_KEY", "BACKUP_KEY"] }
/// }
/// # )).unwrap();
/// # assert_eq!(SigningKind::Explicit, def.signing.kind());
/// ```
/// or states that signing happens elsewhere (a hardware wallet, a browser extension, ...):
/// ```
/// # use netprofile_config::*;
/// # use serde_json::json;
/// # let def: NetworkDefinition = serde_json::from_value(json!(
/// {
///   "url": "http://localhost:8545",
///   "chain_id": 43112,
///   "gas_price": 1,
///   "signing": "external_manual"
/// }
/// # )).unwrap();
/// # assert_eq!(SigningKind::ExternalManual, def.signing.kind());
/// ```
/// In the latter case no key is ever looked up, whatever secrets happen to be available.
///
/// # Secrets in endpoints
///
/// Instead of hardcoding an API key into the plain-text config file, use a `${NAME}`
/// placeholder, e.g., `https://eth-sepolia.g.alchemy.com/v2/${ALCHEMY_API_KEY}`.  The value is
/// looked up via a [`SecretProvider`](crate::secret::SecretProvider) when the profile is
/// resolved.
pub mod network;

/// Endpoint templates with secret placeholders
pub mod interpolation;
/// Resolution of network profiles
pub mod resolver;
/// Secret providers and credential validators
pub mod secret;

/// Default config filename
pub const DEFAULT_FILENAME: &str = "netprofile.json";

/// Environment variable overriding [`Config::default_network`]
pub const NETWORK_ENV_VAR: &str = "NETPROFILE_NETWORK";

/// Errors raised handling configurations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error raised when we can't find the config file
    #[error("Could not find config file {}", DEFAULT_FILENAME)]
    FileNotFound,
    /// Error raised when deserialization/serialization of the config file fails.
    #[error("Malformed config {0}")]
    MalformedConfig(PathBuf, #[source] serde_json::Error),
    /// Generic path-related error, not caused by a filesystem error.
    #[error("{0}. Path: {1}")]
    PathError(&'static str, PathBuf),
    /// Generic filesystem error
    #[error("{0}. Path: {1}")]
    FsError(&'static str, PathBuf, #[source] std::io::Error),
    /// Error raised when the compiler version is not of the form `MAJOR.MINOR.PATCH`.
    #[error("Invalid compiler version '{0}'; expected MAJOR.MINOR.PATCH")]
    InvalidCompilerVersion(String),
    /// Error raised when `default_network` names a network that is not defined under `networks`.
    #[error("Specified network ('{0}') not found")]
    MissingNetwork(NetworkName),
    /// Error raised when no network was requested and no default is configured.
    #[error("No network selected; pass one explicitly or set `default_network`")]
    NoNetworkSelected,
    /// Error raised when resolving a network profile fails.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Result with error type defaulting to [`ConfigError`].
pub type Result<T, E = ConfigError> = core::result::Result<T, E>;
/// Type alias for "network name" to be used in maps
pub type NetworkName = String;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
}

/// The contract compiler to build with.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Compiler version, e.g., `0.8.27`
    pub version: String,
}

/// Top-level project configuration.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Absolute path to the file corresponding to this configuration.
    #[serde(skip_serializing, skip_deserializing)]
    pub config_path: PathBuf,
    /// Contract compiler selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerConfig>,
    /// Named network definitions.
    pub networks: NetworkCatalog,
    /// Network used when none is requested explicitly.  If set, a network with the same name
    /// must be defined in `networks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_network: Option<NetworkName>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            config_path: PathBuf::from(DEFAULT_FILENAME),
            compiler: None,
            networks: Default::default(),
            default_network: None,
        }
    }
}

impl Config {
    /// Create an empty configuration that will be saved in directory `dir`.
    ///
    /// # Example
    ///
    /// ```
    /// use netprofile_config::Config;
    /// use tempfile::tempdir;
    ///
    /// let dir = tempdir().unwrap();
    /// let cfg = Config::new(&dir).unwrap();
    /// assert!(cfg.networks.is_empty());
    ///
    /// // Save config file to disk and load it back
    /// cfg.to_file(false).unwrap();
    /// let cfg2 = Config::from_file(&cfg.config_path).unwrap();
    /// assert_eq!(cfg.config_path, cfg2.config_path);
    /// ```
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let actual_dir = fs::canonicalize(dir.as_ref()).map_err(|e| {
            ConfigError::FsError("Failed to canonicalize path", dir.as_ref().into(), e)
        })?;
        Ok(Config {
            config_path: actual_dir.join(DEFAULT_FILENAME),
            ..Default::default()
        })
    }

    /// Create configuration from config file in the current directory or some parent directory.
    pub fn nearest() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            ConfigError::FsError("Failed to get current working directory", ".".into(), e)
        })?;
        Config::from_file(find_file(DEFAULT_FILENAME, cwd)?)
    }

    /// Create configuration from directory (really from [`DEFAULT_FILENAME`] file in the directory).
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Config::from_file(dir.as_ref().join(DEFAULT_FILENAME))
    }

    /// Create configuration from JSON file.  The default network can be overridden via the
    /// `NETPROFILE_NETWORK` environment variable.
    ///
    /// This function serves as the deserializer to all the other loaders (namely
    /// [`Self::nearest`] and [`Self::from_dir`]).
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FsError("Failed to read config file", path.into(), e))?;
        let mut cfg: Config = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::MalformedConfig(path.into(), e))?;
        cfg.config_path = fs::canonicalize(path)
            .map_err(|e| ConfigError::FsError("Failed to canonicalize path", path.into(), e))?;
        cfg.merge_from_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Update config properties from environment variables.
    fn merge_from_env(&mut self) {
        if let Ok(network) = env::var(NETWORK_ENV_VAR) {
            tracing::debug!("Setting default network from {NETWORK_ENV_VAR} to {network}");
            self.default_network = Some(network);
        }
    }

    /// Save configuration to its `config_path`, refusing to overwrite an existing file unless
    /// `force` is set.
    pub fn to_file(&self, force: bool) -> Result<()> {
        if !force && self.config_path.is_file() {
            return Err(ConfigError::PathError(
                "Config file already exists",
                self.config_path.clone(),
            ));
        }
        let pretty = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::MalformedConfig(self.config_path.clone(), e))?;
        fs::write(&self.config_path, pretty).map_err(|e| {
            ConfigError::FsError(
                "Failed to write config to file",
                self.config_path.clone(),
                e,
            )
        })
    }

    /// Returns `requested` if given, otherwise the default network.
    pub fn selected_network<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        requested
            .or(self.default_network.as_deref())
            .ok_or(ConfigError::NoNetworkSelected)
    }

    /// Resolves the `requested` network (or the default one) into a [`ResolvedProfile`].
    pub fn resolve<P, V>(
        &self,
        requested: Option<&str>,
        secrets: P,
        validator: V,
    ) -> Result<ResolvedProfile>
    where
        P: SecretProvider,
        V: CredentialValidator,
    {
        let name = self.selected_network(requested)?;
        let resolver = NetworkProfileResolver::new(secrets, validator);
        Ok(resolver.resolve(&self.networks, name)?)
    }

    /// Check that the config is valid.
    fn validate(&self) -> Result<()> {
        if let Some(compiler) = &self.compiler {
            if !VERSION_REGEX.is_match(&compiler.version) {
                return Err(ConfigError::InvalidCompilerVersion(
                    compiler.version.clone(),
                ));
            }
        }
        if let Some(network) = &self.default_network {
            if !self.networks.contains_key(network) {
                return Err(ConfigError::MissingNetwork(network.clone()));
            }
        }
        for (name, def) in &self.networks {
            if def.has_literal_secret() {
                tracing::warn!(
                    "Endpoint of network '{name}' appears to embed a literal API key; \
                     move it behind a ${{NAME}} placeholder"
                );
            }
        }
        Ok(())
    }
}

/// Find file starting from directory.
///
/// # Errors
///
/// Fails with [`ConfigError::FileNotFound`] if we cannot find the file.
fn find_file(file: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let mut path: PathBuf = PathBuf::from(dir.as_ref());

    loop {
        let candidate = path.join(file.as_ref());
        if candidate.is_file() {
            break Ok(candidate);
        }
        if !path.pop() {
            break Err(ConfigError::FileNotFound);
        }
    }
}
