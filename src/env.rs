//! Base IRI and prefix-map handling: expansion, abbreviation, and relative
//! reference resolution.
//!
//! Grounded on how `TurtleParser`/`TurtleSerializer` carry `with_base_iri` and
//! `with_prefix` (`oxttl::turtle`), and on `oxiri::Iri` for RFC 3986 resolution,
//! the same crate `oxrdf`/`oxttl` use for IRI parsing.

use crate::error::{Result, Status};
use oxiri::Iri;
use std::collections::HashMap;

/// A base IRI plus a prefix-label ↔ namespace-IRI table.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    base: Option<Iri<String>>,
    /// label -> namespace IRI. A later `set_prefix` call for the same label
    /// shadows the earlier one.
    prefixes: HashMap<String, String>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base(&mut self, iri: impl AsRef<str>) -> Result<()> {
        self.base = Some(Iri::parse(iri.as_ref().to_owned()).map_err(|e| Status::BadUri(e.to_string()))?);
        Ok(())
    }

    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.base.as_ref().map(Iri::as_str)
    }

    pub fn set_prefix(&mut self, label: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(label.into(), namespace.into());
    }

    #[must_use]
    pub fn prefix(&self, label: &str) -> Option<&str> {
        self.prefixes.get(label).map(String::as_str)
    }

    /// Iterates the currently bound prefixes, in no particular order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expands `prefix:local` into an absolute IRI.
    pub fn expand_prefixed_name(&self, prefix: &str, local: &str) -> Result<String> {
        let namespace = self
            .prefix(prefix)
            .ok_or_else(|| Status::BadUri(format!("undefined prefix {prefix:?}")))?;
        Ok(format!("{namespace}{local}"))
    }

    /// Abbreviates an absolute IRI into `prefix:local` via the longest matching
    /// namespace, or `None` if no bound prefix is a prefix of `iri`.
    #[must_use]
    pub fn abbreviate(&self, iri: &str) -> Option<(String, String)> {
        self.prefixes
            .iter()
            .filter(|(_, namespace)| iri.starts_with(namespace.as_str()) && !namespace.is_empty())
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(label, namespace)| (label.clone(), iri[namespace.len()..].to_owned()))
    }

    /// Resolves a (possibly relative) IRI reference against the current base,
    /// per RFC 3986.
    pub fn resolve(&self, reference: &str) -> Result<String> {
        match &self.base {
            Some(base) => Ok(base
                .resolve(reference)
                .map_err(|e| Status::BadUri(e.to_string()))?
                .into_inner()),
            None => {
                // No base: the reference must already be absolute.
                Iri::parse(reference.to_owned())
                    .map(Iri::into_inner)
                    .map_err(|_| Status::BadUri(format!("relative IRI {reference:?} without a base")))
            }
        }
    }
}
