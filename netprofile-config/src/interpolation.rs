use std::{fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secret::{SecretProvider, SecretRef, SecretValue};

/// Regex for matching placeholder tokens, e.g., `${ALCHEMY_API_KEY}`
pub const REGEX_STR: &str = r"\$\{\s*(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\}";
lazy_static! {
    static ref REGEX: Regex = Regex::new(REGEX_STR).unwrap();
}

/// Error raised when a template contains a `${` that does not start a
/// well-formed placeholder.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Malformed placeholder at byte {offset} in endpoint template '{template}'")]
pub struct TemplateError {
    /// Template text
    pub template: String,
    /// Byte offset of the offending `${`
    pub offset: usize,
}

/// Error raised when a placeholder cannot be substituted.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("No value for placeholder '{0}'")]
pub struct MissingPlaceholder(pub SecretRef);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(SecretRef),
}

/// An endpoint URL that may reference secrets via `${NAME}` placeholders.
///
/// For example: `https://eth-sepolia.g.alchemy.com/v2/${ALCHEMY_API_KEY}`.
///
/// Whitespace is allowed inside the braces.  The template is split
/// into literal text and placeholders when parsed; placeholder values
/// are looked up only when the template is [substituted](Self::substitute).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointTemplate {
    parts: Vec<Part>,
}

impl EndpointTemplate {
    /// Placeholder names in left-to-right order (duplicates included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().filter_map(|p| match p {
            Part::Placeholder(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Whether the template references no secrets at all.
    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Replaces every placeholder with its value from `secrets`,
    /// scanning left to right and stopping at the first placeholder
    /// whose value is absent or [blank](SecretValue::is_blank).
    pub fn substitute(
        &self,
        secrets: &impl SecretProvider,
    ) -> Result<SecretValue, MissingPlaceholder> {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => result.push_str(text),
                Part::Placeholder(name) => match secrets.get(name) {
                    Some(val) if !val.is_blank() => result.push_str(val.expose_secret()),
                    _ => return Err(MissingPlaceholder(name.clone())),
                },
            }
        }
        Ok(result.into())
    }
}

/// Returns the first placeholder token found in `s`, if any.
pub fn find_placeholder(s: &str) -> Option<&str> {
    REGEX
        .captures(s)
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str())
}

impl FromStr for EndpointTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = vec![];
        let mut last_idx: usize = 0;
        // convert each match to `Part::Placeholder` and all text around them to `Part::Literal`
        for c in REGEX.captures_iter(s) {
            let (Some(m), Some(name)) = (c.get(0), c.name("name")) else {
                continue;
            };
            if m.start() > last_idx {
                parts.push(literal(s, last_idx, m.start())?);
            }
            parts.push(Part::Placeholder(name.as_str().to_string()));
            last_idx = m.end();
        }
        // don't forget any text after the last match
        if s.len() > last_idx {
            parts.push(literal(s, last_idx, s.len())?);
        }
        Ok(Self { parts })
    }
}

/// Literal text between placeholders; a leftover `${` means a
/// placeholder the regex could not match.
fn literal(s: &str, start: usize, end: usize) -> Result<Part, TemplateError> {
    let text = &s[start..end];
    match text.find("${") {
        Some(pos) => Err(TemplateError {
            template: s.to_string(),
            offset: start + pos,
        }),
        None => Ok(Part::Literal(text.to_string())),
    }
}

/// Prints the template itself (never any secret values).
impl Display for EndpointTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for p in &self.parts {
            match p {
                Part::Literal(text) => f.write_str(text)?,
                Part::Placeholder(name) => write!(f, "${{{name}}}")?,
            }
        }
        Ok(())
    }
}

// =================== schemars JsonSchema impl ==================

/// Same as for `String`
impl JsonSchema for EndpointTemplate {
    fn schema_name() -> String {
        <String as JsonSchema>::schema_name()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <String as JsonSchema>::json_schema(gen)
    }
}

// ==================== serde Serialize/Deserialize impl ====================

impl<'de> Deserialize<'de> for EndpointTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("{e}")))
    }
}

impl Serialize for EndpointTemplate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
