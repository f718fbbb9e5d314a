//! Turns a named [`NetworkDefinition`] into a [`ResolvedProfile`].

use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::{
    interpolation::find_placeholder,
    network::{NetworkCatalog, NetworkDefinition, ResolvedProfile, SigningMode},
    secret::{CredentialValidator, SecretProvider, SecretRef, SecretValue},
    NetworkName,
};

/// Errors raised when resolving a network profile.
///
/// Every variant is terminal: the caller never receives a partially
/// resolved profile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Requested network is not in the catalog.
    #[error("Unknown network '{0}'")]
    UnknownNetwork(NetworkName),
    /// An endpoint placeholder has no (or a blank) secret value.
    #[error("Missing secret for endpoint placeholder '{0}'")]
    MissingSecret(SecretRef),
    /// A signing key is absent, blank, or rejected by the credential validator.
    #[error("Invalid credential '{reference}': {reason}")]
    InvalidCredential {
        /// Secret reference of the offending key
        reference: SecretRef,
        /// Why the key was rejected
        reason: String,
    },
    /// Explicit signing was configured without any key references.
    #[error("Network '{0}' uses explicit signing but lists no signing keys")]
    EmptySigningKeySet(NetworkName),
    /// The substituted endpoint is not a usable URL.
    #[error("Invalid endpoint for network '{network}': {reason}")]
    InvalidEndpoint {
        /// Network whose endpoint is invalid
        network: NetworkName,
        /// What is wrong with it (never includes secret values)
        reason: String,
    },
}

/// Resolves network profiles against a [`SecretProvider`] and a
/// [`CredentialValidator`].
///
/// The resolver holds no state besides its two collaborators, so it can
/// be shared across threads whenever they can.
#[derive(Clone, Debug)]
pub struct NetworkProfileResolver<P, V> {
    secrets: P,
    validator: V,
}

impl<P: SecretProvider, V: CredentialValidator> NetworkProfileResolver<P, V> {
    /// Create a resolver.
    pub fn new(secrets: P, validator: V) -> Self {
        Self { secrets, validator }
    }

    /// Resolves network `name` from `catalog`.
    ///
    /// The endpoint placeholders are substituted left to right.  For
    /// [`SigningMode::Explicit`] every key reference is then looked up and
    /// validated in declaration order; for [`SigningMode::ExternalManual`]
    /// the secret provider is never asked for a key.
    ///
    /// # Errors
    ///
    /// The first failure encountered, see [`ResolutionError`].
    pub fn resolve(
        &self,
        catalog: &NetworkCatalog,
        name: &str,
    ) -> Result<ResolvedProfile, ResolutionError> {
        let def = catalog
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownNetwork(name.to_string()))?;
        self.resolve_definition(name, def)
    }

    /// Resolves every network in `catalog`, in catalog order.  A failure
    /// for one network does not affect the others.
    pub fn resolve_all<'a>(
        &self,
        catalog: &'a NetworkCatalog,
    ) -> Vec<(&'a NetworkName, Result<ResolvedProfile, ResolutionError>)> {
        catalog
            .iter()
            .map(|(name, def)| (name, self.resolve_definition(name, def)))
            .collect()
    }

    /// Resolves a single definition registered under `name`.
    pub fn resolve_definition(
        &self,
        name: &str,
        def: &NetworkDefinition,
    ) -> Result<ResolvedProfile, ResolutionError> {
        tracing::debug!("Resolving network profile '{name}'");
        let endpoint = self.endpoint(name, def)?;
        let signing_keys = match &def.signing {
            SigningMode::Explicit(refs) => self.signing_keys(name, refs)?,
            SigningMode::ExternalManual => {
                tracing::debug!("Network '{name}' uses an external signer; not loading keys");
                vec![]
            }
        };
        Ok(ResolvedProfile {
            network: name.to_string(),
            endpoint,
            chain_id: def.chain_id,
            gas_price: def.gas_price,
            signing: def.signing.kind(),
            signing_keys,
        })
    }

    fn endpoint(
        &self,
        name: &str,
        def: &NetworkDefinition,
    ) -> Result<SecretValue, ResolutionError> {
        let endpoint = def
            .url
            .substitute(&self.secrets)
            .map_err(|e| ResolutionError::MissingSecret(e.0))?;
        let invalid = |reason: String| ResolutionError::InvalidEndpoint {
            network: name.to_string(),
            reason,
        };
        // secret values are inserted verbatim and could themselves look like placeholders
        if let Some(token) = find_placeholder(endpoint.expose_secret()) {
            return Err(invalid(format!(
                "unresolved placeholder '{token}' after substitution"
            )));
        }
        // the parser would trim or percent-encode these, so the profile
        // would carry a different string than the one that was validated
        if endpoint.expose_secret().contains(is_unsafe_url_char) {
            return Err(invalid(format!(
                "contains whitespace or characters not allowed in a URL (template: {})",
                def.url
            )));
        }
        // the parse error never echoes the input, so it is safe to report
        Url::parse(endpoint.expose_secret())
            .map_err(|e| invalid(format!("{e} (template: {})", def.url)))?;
        Ok(endpoint)
    }

    fn signing_keys(
        &self,
        name: &str,
        refs: &[SecretRef],
    ) -> Result<Vec<SecretValue>, ResolutionError> {
        if refs.is_empty() {
            return Err(ResolutionError::EmptySigningKeySet(name.to_string()));
        }
        let invalid = |reference: &SecretRef, reason: String| ResolutionError::InvalidCredential {
            reference: reference.clone(),
            reason,
        };
        let mut keys = Vec::with_capacity(refs.len());
        for reference in refs {
            let key = self
                .secrets
                .get(reference)
                .ok_or_else(|| invalid(reference, "secret not found".into()))?;
            if key.is_blank() {
                return Err(invalid(reference, "secret is empty".into()));
            }
            self.validator
                .validate(key.expose_secret())
                .map_err(|reason| invalid(reference, reason))?;
            keys.push(key);
        }
        tracing::debug!("Loaded {} signing key(s) for network '{name}'", keys.len());
        Ok(keys)
    }
}

fn is_unsafe_url_char(c: char) -> bool {
    !c.is_ascii_graphic() || matches!(c, '"' | '<' | '>' | '`')
}

#[cfg(test)]
mod test {
    use std::{num::NonZeroU64, sync::Mutex};

    use super::*;
    use crate::{
        network::SigningKind,
        secret::{AcceptAll, HexKeyValidator, MapSecretProvider},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const KEY1: &str = "56289e99c94b6912bfc12adc093c9b51124f0dc54ac7a766b2bc5ccf558d8027";
    const KEY2: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    /// Records every reference it is asked for.
    #[derive(Default)]
    struct Recording {
        inner: MapSecretProvider,
        seen: Mutex<Vec<String>>,
    }

    impl SecretProvider for Recording {
        fn get(&self, reference: &str) -> Option<SecretValue> {
            self.seen.lock().unwrap().push(reference.to_string());
            self.inner.get(reference)
        }
    }

    fn network(
        url: &str,
        chain_id: u64,
        gas_price: Option<u64>,
        signing: SigningMode,
    ) -> NetworkDefinition {
        NetworkDefinition {
            url: url.parse().unwrap(),
            chain_id: NonZeroU64::new(chain_id).unwrap(),
            gas_price,
            signing,
        }
    }

    /// Network signed externally, without gas price override.
    fn external(url: &str, chain_id: u64) -> NetworkDefinition {
        network(url, chain_id, None, SigningMode::ExternalManual)
    }

    fn catalog(
        entries: impl IntoIterator<Item = (&'static str, NetworkDefinition)>,
    ) -> NetworkCatalog {
        entries.into_iter().map(|(n, d)| (n.to_string(), d)).collect()
    }

    fn explicit(refs: &[&str]) -> SigningMode {
        SigningMode::Explicit(refs.iter().map(|r| r.to_string()).collect())
    }

    fn secrets<const N: usize>(pairs: [(&str, &str); N]) -> MapSecretProvider {
        pairs.into_iter().collect()
    }

    #[test]
    fn unknown_network() {
        let cat = catalog([("local", external("http://localhost:8545", 43112))]);
        let resolver = NetworkProfileResolver::new(MapSecretProvider::new(), AcceptAll);
        for name in ["", "Local", "mainnet"] {
            assert_eq!(
                Err(ResolutionError::UnknownNetwork(name.into())),
                resolver.resolve(&cat, name)
            );
        }
        assert_eq!(
            Err(ResolutionError::UnknownNetwork("local".into())),
            resolver.resolve(&NetworkCatalog::new(), "local")
        );
    }

    #[test]
    fn local_external_manual() {
        let local = network(
            "http://localhost:8545",
            43112,
            Some(1),
            SigningMode::ExternalManual,
        );
        let cat = catalog([("local", local)]);
        let resolver = NetworkProfileResolver::new(MapSecretProvider::new(), AcceptAll);
        let profile = resolver.resolve(&cat, "local").unwrap();
        assert_eq!("local", profile.network());
        assert_eq!("http://localhost:8545", profile.endpoint().expose_secret());
        assert_eq!(43112, profile.chain_id().get());
        assert_eq!(Some(1), profile.gas_price());
        assert_eq!(SigningKind::ExternalManual, profile.signing());
        assert!(profile.signing_keys().is_empty());
    }

    #[test]
    fn external_manual_never_reads_keys() {
        let cat = catalog([(
            "sepolia",
            external("https://rpc.example/v2/${API_KEY}", 11155111),
        )]);
        let secrets = Recording {
            inner: secrets([
                ("API_KEY", "abc"),
                ("PRIVATE_KEY", KEY1),
                ("SEPOLIA_PRIVATE_KEY", KEY1),
                ("sepolia", KEY1),
            ]),
            ..Default::default()
        };
        let resolver = NetworkProfileResolver::new(&secrets, AcceptAll);
        let profile = resolver.resolve(&cat, "sepolia").unwrap();
        assert!(profile.signing_keys().is_empty());
        assert_eq!(
            "https://rpc.example/v2/abc",
            profile.endpoint().expose_secret()
        );
        assert_eq!(vec!["API_KEY".to_string()], *secrets.seen.lock().unwrap());
    }

    #[rstest]
    #[case::absent(&[])]
    #[case::empty(&[("API_KEY", "")])]
    #[case::blank(&[("API_KEY", "   ")])]
    #[case::newline(&[("API_KEY", "\n")])]
    fn missing_endpoint_secret(#[case] pairs: &[(&str, &str)]) {
        let cat = catalog([(
            "testnet",
            external("https://rpc.example/v2/${API_KEY}", 11155111),
        )]);
        let secrets: MapSecretProvider = pairs.iter().copied().collect();
        let resolver = NetworkProfileResolver::new(secrets, AcceptAll);
        assert_eq!(
            Err(ResolutionError::MissingSecret("API_KEY".into())),
            resolver.resolve(&cat, "testnet")
        );
    }

    #[test]
    fn missing_endpoint_secret_fails_before_keys() {
        let cat = catalog([(
            "prod",
            network("https://rpc.example/${A}/${B}", 1, None, explicit(&["KEY"])),
        )]);
        let secrets = Recording::default();
        let resolver = NetworkProfileResolver::new(&secrets, AcceptAll);
        assert_eq!(
            Err(ResolutionError::MissingSecret("A".into())),
            resolver.resolve(&cat, "prod")
        );
        assert_eq!(vec!["A".to_string()], *secrets.seen.lock().unwrap());
    }

    #[test]
    fn empty_signing_key_set() {
        let cat = catalog([(
            "prod",
            network("https://rpc.example/prod", 43114, None, explicit(&[])),
        )]);
        let resolver = NetworkProfileResolver::new(MapSecretProvider::new(), AcceptAll);
        assert_eq!(
            Err(ResolutionError::EmptySigningKeySet("prod".into())),
            resolver.resolve(&cat, "prod")
        );
    }

    #[test]
    fn explicit_keys_in_order() {
        let cat = catalog([(
            "prod",
            network(
                "https://rpc.example/prod",
                43114,
                Some(1),
                explicit(&["KEY2", "KEY1"]),
            ),
        )]);
        let secrets = secrets([("KEY1", KEY1), ("KEY2", KEY2)]);
        let resolver = NetworkProfileResolver::new(secrets, HexKeyValidator::default());
        let profile = resolver.resolve(&cat, "prod").unwrap();
        assert_eq!(SigningKind::Explicit, profile.signing());
        assert_eq!(
            vec![SecretValue::from(KEY2), SecretValue::from(KEY1)],
            profile.signing_keys()
        );
    }

    #[test]
    fn invalid_credential_names_reference() {
        let cat = catalog([(
            "prod",
            network(
                "https://rpc.example/prod",
                43114,
                None,
                explicit(&["GOOD", "BAD", "ALSO_BAD"]),
            ),
        )]);
        let secrets = secrets([("GOOD", KEY1), ("BAD", "FEEDF00D"), ("ALSO_BAD", "x")]);
        let resolver = NetworkProfileResolver::new(secrets, HexKeyValidator::default());
        match resolver.resolve(&cat, "prod") {
            Err(ResolutionError::InvalidCredential { reference, reason }) => {
                assert_eq!("BAD", reference);
                assert!(!reason.contains("FEEDF00D"), "{reason}");
            }
            r => panic!("Expected InvalidCredential, got {r:?}"),
        }
    }

    #[rstest]
    #[case::absent("NOPE", "secret not found")]
    #[case::empty("EMPTY", "secret is empty")]
    #[case::blank("BLANK", "secret is empty")]
    fn unusable_keys_are_invalid(#[case] reference: &str, #[case] reason: &str) {
        let cat = catalog([(
            "prod",
            network("http://localhost", 1, None, explicit(&[reference])),
        )]);
        let secrets = secrets([("EMPTY", ""), ("BLANK", " \t ")]);
        let resolver = NetworkProfileResolver::new(secrets, AcceptAll);
        assert_eq!(
            Err(ResolutionError::InvalidCredential {
                reference: reference.into(),
                reason: reason.into()
            }),
            resolver.resolve(&cat, "prod")
        );
    }

    #[test]
    fn invalid_endpoint() {
        let cat = catalog([
            ("relative", external("/just/a/path", 1)),
            ("nested", external("https://rpc.example/${OUTER}", 1)),
        ]);
        let secrets = secrets([("OUTER", "${INNER}")]);
        let resolver = NetworkProfileResolver::new(secrets, AcceptAll);
        assert!(matches!(
            resolver.resolve(&cat, "relative"),
            Err(ResolutionError::InvalidEndpoint { network, .. }) if network == "relative"
        ));
        match resolver.resolve(&cat, "nested") {
            Err(ResolutionError::InvalidEndpoint { reason, .. }) => {
                assert!(reason.contains("INNER"), "{reason}")
            }
            r => panic!("Expected InvalidEndpoint, got {r:?}"),
        }
    }

    #[rstest]
    #[case::inner_space("a b")]
    #[case::padded(" abc ")]
    #[case::tab("a\tb")]
    #[case::quote("a\"b")]
    #[case::non_ascii("ключ")]
    fn endpoint_secret_not_url_safe(#[case] value: &str) {
        let cat = catalog([("testnet", external("https://rpc.example/${K}", 1))]);
        let resolver = NetworkProfileResolver::new(secrets([("K", value)]), AcceptAll);
        match resolver.resolve(&cat, "testnet") {
            Err(ResolutionError::InvalidEndpoint { network, reason }) => {
                assert_eq!("testnet", network);
                assert!(!reason.contains(value), "{reason}");
            }
            r => panic!("Expected InvalidEndpoint, got {r:?}"),
        }
    }

    #[rstest]
    #[case::path("https://rpc.example/v2/${K}")]
    #[case::query("https://rpc.example/v2?key=${K}&x=1")]
    #[case::port("http://localhost:8545/${K}")]
    fn endpoint_is_returned_as_validated(#[case] template: &str) {
        let cat = catalog([("testnet", external(template, 1))]);
        let resolver = NetworkProfileResolver::new(secrets([("K", "a-b_c.9~")]), AcceptAll);
        let profile = resolver.resolve(&cat, "testnet").unwrap();
        let endpoint = profile.endpoint().expose_secret();
        assert_eq!(template.replace("${K}", "a-b_c.9~"), *endpoint);
        assert_eq!(Url::parse(endpoint).unwrap().as_str(), endpoint.as_str());
    }

    #[test]
    fn idempotent() {
        let cat = catalog([(
            "prod",
            network(
                "https://rpc.example/${API_KEY}",
                43114,
                Some(7),
                explicit(&["KEY1"]),
            ),
        )]);
        let secrets = secrets([("API_KEY", "abc"), ("KEY1", KEY1)]);
        let resolver = NetworkProfileResolver::new(secrets, HexKeyValidator::default());
        assert_eq!(
            resolver.resolve(&cat, "prod").unwrap(),
            resolver.resolve(&cat, "prod").unwrap()
        );
    }

    #[test]
    fn resolve_all_is_per_network() {
        let cat = catalog([
            ("a_ok", external("http://localhost:8545", 1)),
            (
                "b_bad",
                network("http://localhost:8545", 2, None, explicit(&[])),
            ),
            ("c_ok", external("http://localhost:9545", 3)),
        ]);
        let resolver = NetworkProfileResolver::new(MapSecretProvider::new(), AcceptAll);
        let results = resolver.resolve_all(&cat);
        let names: Vec<_> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["a_ok", "b_bad", "c_ok"], names);
        assert!(results[0].1.is_ok());
        assert_eq!(
            Err(ResolutionError::EmptySigningKeySet("b_bad".into())),
            results[1].1
        );
        assert_eq!(3, results[2].1.as_ref().unwrap().chain_id().get());
    }

    #[test]
    fn concurrent_resolution() {
        let cat = catalog([
            ("local", external("http://localhost:8545", 43112)),
            (
                "prod",
                network("https://rpc.example/prod", 43114, None, explicit(&["KEY1"])),
            ),
        ]);
        let secrets = secrets([("KEY1", KEY1)]);
        let resolver = NetworkProfileResolver::new(secrets, HexKeyValidator::default());
        let expected = resolver.resolve(&cat, "prod").unwrap();
        let (resolver, cat) = (&resolver, &cat);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let name = if i % 2 == 0 { "local" } else { "prod" };
                    s.spawn(move || resolver.resolve(cat, name))
                })
                .collect();
            for h in handles {
                let profile = h.join().unwrap().unwrap();
                if profile.network() == "prod" {
                    assert_eq!(expected, profile);
                } else {
                    assert!(profile.signing_keys().is_empty());
                }
            }
        });
    }
}
