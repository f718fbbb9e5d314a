use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    io::ErrorKind,
    path::PathBuf,
};

use k256::SecretKey;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

/// Marker for redacted text
pub const REDACTED: &str = "***REDACTED SECRET***";

/// Symbolic name under which a secret is stored (e.g., `DEPLOY_KEY`).
pub type SecretRef = String;

/// A secret value returned by a [`SecretProvider`].
///
/// `Debug` and `Serialize` never reveal the value; use
/// [`ExposeSecret::expose_secret`] to get at it.  Two values are equal
/// if their exposed contents are equal.
#[derive(Clone)]
pub struct SecretValue(SecretString);

impl SecretValue {
    /// Wraps a plain string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into()))
    }

    /// Whether the secret is empty or consists only of whitespace.  Such
    /// values are treated as absent.
    pub fn is_blank(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }
}

impl ExposeSecret<String> for SecretValue {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

impl Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretValue({REDACTED})")
    }
}

impl Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED)
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Redact the actual secret value
impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

// ==================== SecretProvider ====================

/// Read-only lookup of secret values by reference.
///
/// Implementations must not have side effects beyond reading from
/// their backing store.  Returning `None` means the secret is absent.
pub trait SecretProvider {
    /// Looks up the secret stored under `reference`.
    fn get(&self, reference: &str) -> Option<SecretValue>;
}

impl<P: SecretProvider + ?Sized> SecretProvider for &P {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        (**self).get(reference)
    }
}

impl<P: SecretProvider + ?Sized> SecretProvider for Box<P> {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        (**self).get(reference)
    }
}

/// Secrets are environment variables.  If found, a `.env` file is
/// automatically loaded first.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        dotenv::var(reference).ok().map(SecretValue::from)
    }
}

/// Secrets are files in a directory, one file per reference (the
/// layout used by docker and kubernetes secret mounts).
///
/// A single trailing newline is stripped from the file contents.
#[derive(Clone, Debug)]
pub struct FileSecretProvider {
    dir: PathBuf,
}

impl FileSecretProvider {
    /// Creates a provider reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SecretProvider for FileSecretProvider {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        // references are bare file names; anything else could escape `dir`
        if reference.is_empty()
            || reference.contains(['/', '\\'])
            || reference == "."
            || reference == ".."
        {
            tracing::warn!("Ignoring secret reference '{reference}': not a plain file name");
            return None;
        }
        let file = self.dir.join(reference);
        match std::fs::read_to_string(&file) {
            Ok(mut contents) => {
                if contents.ends_with('\n') {
                    contents.pop();
                    if contents.ends_with('\r') {
                        contents.pop();
                    }
                }
                Some(contents.into())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read secret file {}: {e}", file.display());
                None
            }
        }
    }
}

/// In-memory secrets.
#[derive(Clone, Debug, Default)]
pub struct MapSecretProvider {
    secrets: HashMap<SecretRef, SecretValue>,
}

impl MapSecretProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Default::default()
    }
}

impl<R: Into<SecretRef>, V: Into<SecretValue>> FromIterator<(R, V)> for MapSecretProvider {
    fn from_iter<I: IntoIterator<Item = (R, V)>>(iter: I) -> Self {
        Self {
            secrets: iter
                .into_iter()
                .map(|(r, v)| (r.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretProvider for MapSecretProvider {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        self.secrets.get(reference).cloned()
    }
}

/// Consults each provider in order; the first one that has the
/// secret wins.
#[derive(Default)]
pub struct ChainedSecretProvider {
    providers: Vec<Box<dyn SecretProvider + Send + Sync>>,
}

impl ChainedSecretProvider {
    /// Creates an empty chain (which never finds anything).
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a provider to the end of the chain.
    #[must_use]
    pub fn with(mut self, provider: impl SecretProvider + Send + Sync + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl SecretProvider for ChainedSecretProvider {
    fn get(&self, reference: &str) -> Option<SecretValue> {
        self.providers.iter().find_map(|p| p.get(reference))
    }
}

// ==================== CredentialValidator ====================

/// Format check applied to every signing key before it ends up in a
/// resolved profile.
pub trait CredentialValidator {
    /// Returns `Ok(())` if `secret` is acceptable, otherwise the
    /// reason why it is not.  The reason must not contain the secret.
    fn validate(&self, secret: &str) -> Result<(), String>;
}

impl<V: CredentialValidator + ?Sized> CredentialValidator for &V {
    fn validate(&self, secret: &str) -> Result<(), String> {
        (**self).validate(secret)
    }
}

pub(crate) const INVALID_KEY_HEX_ERR: &str = "Invalid private key; expected hex string";
pub(crate) const INVALID_KEY_LEN_ERR: &str = "Invalid private key length";
pub(crate) const INVALID_SECP256K1_ERR: &str = "Invalid secp256k1 secret key";

/// Accepts hex strings encoding exactly `len` bytes, with or without
/// a leading `0x`.
#[derive(Clone, Copy, Debug)]
pub struct HexKeyValidator {
    len: usize,
}

impl HexKeyValidator {
    /// Length of an ethereum-style private key in bytes.
    pub const DEFAULT_KEY_LEN: usize = 32;

    /// Validator for keys of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self { len }
    }

    fn decode(&self, secret: &str) -> Result<Vec<u8>, String> {
        let digits = secret.strip_prefix("0x").unwrap_or(secret);
        if digits.len() != 2 * self.len {
            return Err(format!(
                "{INVALID_KEY_LEN_ERR}: expected {} hex characters, got {}",
                2 * self.len,
                digits.len()
            ));
        }
        // FromHexError names the offending character, which is part of the key
        hex::decode(digits).map_err(|_| INVALID_KEY_HEX_ERR.to_string())
    }
}

impl Default for HexKeyValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEY_LEN)
    }
}

impl CredentialValidator for HexKeyValidator {
    fn validate(&self, secret: &str) -> Result<(), String> {
        self.decode(secret).map(|_| ())
    }
}

/// Hex-encoded 32-byte key that is also a valid secp256k1 scalar
/// (non-zero and below the curve order).
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1KeyValidator;

impl CredentialValidator for Secp256k1KeyValidator {
    fn validate(&self, secret: &str) -> Result<(), String> {
        let bytes = HexKeyValidator::default().decode(secret)?;
        SecretKey::from_be_bytes(&bytes)
            .map(|_| ())
            .map_err(|e| format!("{INVALID_SECP256K1_ERR}: {e}"))
    }
}

/// Performs no format check at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl CredentialValidator for AcceptAll {
    fn validate(&self, _secret: &str) -> Result<(), String> {
        Ok(())
    }
}

// ==================== unit tests ====================
