/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper resolution.
//!
//! Every non-builtin helper a template calls is looked up once per
//! compilation. The resolver decides whether the helper needs an import
//! and from where; the answers are kept in a [`HelperTable`] that the
//! compiler turns into `import { helper } from 'source'` declarations.

use crate::error::BoxedResolveError;
use std::collections::HashMap;
use std::path::Path;

/// Outcome of resolving one helper: an import source, or `None` for no import.
pub type ResolveResult = Result<Option<String>, BoxedResolveError>;

/// Trait for deciding where a helper is imported from.
///
/// Resolvers are trusted configuration. An `Err` aborts the compilation
/// and is surfaced to the caller unchanged.
pub trait HelperResolver {
    /// Resolve a helper name to an import source.
    ///
    /// # Returns
    /// `Ok(Some(source))` to import the helper from `source`,
    /// `Ok(None)` when the helper is expected to be in scope already.
    fn resolve(&self, helper: &str) -> ResolveResult;
}

/// Resolver that never imports anything.
#[derive(Debug, Clone, Default)]
pub struct NullResolver;

impl HelperResolver for NullResolver {
    fn resolve(&self, _helper: &str) -> ResolveResult {
        Ok(None)
    }
}

/// Resolver backed by an in-memory `helper -> source` map.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    sources: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Add a helper to the resolver.
    pub fn add(&mut self, helper: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.sources.insert(helper.into(), source.into());
        self
    }

    /// Create a resolver with the given helpers.
    pub fn with_helpers(
        helpers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut resolver = Self::new();
        for (helper, source) in helpers {
            resolver.add(helper, source);
        }
        resolver
    }

    /// Load a resolver from a JSON object mapping helper names to sources.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let sources: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { sources })
    }

    /// Load a resolver from a JSON file.
    pub fn from_file(path: &Path) -> crate::error::CompileResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&contents)?)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl HelperResolver for MapResolver {
    fn resolve(&self, helper: &str) -> ResolveResult {
        Ok(self.sources.get(helper).cloned())
    }
}

impl<F> HelperResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, helper: &str) -> ResolveResult {
        Ok(self(helper))
    }
}

/// Helpers used by one compilation, in first-use order.
///
/// Each distinct name is resolved exactly once; later uses hit the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelperTable {
    entries: Vec<(String, Option<String>)>,
}

impl HelperTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, helper: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == helper)
    }

    /// Resolved source for `helper`, if it was seen and needs an import.
    pub fn source(&self, helper: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == helper)
            .and_then(|(_, source)| source.as_deref())
    }

    /// Record `helper`, consulting `resolver` the first time the name is seen.
    pub fn record(&mut self, helper: &str, resolver: &dyn HelperResolver) -> ResolveResult {
        if self.contains(helper) {
            return Ok(self.source(helper).map(str::to_string));
        }
        let source = resolver.resolve(helper)?.filter(|s| !s.is_empty());
        tracing::debug!(helper, source = ?source, "resolved helper");
        self.entries.push((helper.to_string(), source.clone()));
        Ok(source)
    }

    /// Helpers that need an import, as `(name, source)` pairs in first-use order.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(name, source)| Some((name.as_str(), source.as_deref()?)))
    }

    /// Every helper seen, with or without an import.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
