/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template resolution.
//!
//! This module provides the lookup trait shared by every template store and
//! the two-tier resolution rule used by both engines: an AppView-specific key
//! is tried before the primary key.

use indexmap::IndexMap;

use crate::scanner::replace_all_ignore_case;

/// Build the load-bearing template key `lowercase(site) + "_" + lowercase(name)`.
pub fn template_key(site: &str, name: &str) -> String {
    format!("{}_{}", site.to_lowercase(), name.to_lowercase())
}

/// Trait for stores that can look templates up by their lowercase key.
///
/// Implementations exist for plain template sets, for the processed bodies
/// used by the Normal engine, and for preprocessed sites.
pub trait TemplateLookup {
    /// The stored entry type.
    type Entry;

    /// Look up an entry by its already-lowercased key.
    fn lookup(&self, key: &str) -> Option<&Self::Entry>;
}

impl<V> TemplateLookup for IndexMap<String, V> {
    type Entry = V;

    fn lookup(&self, key: &str) -> Option<&V> {
        self.get(key)
    }
}

impl<V> TemplateLookup for std::collections::HashMap<String, V> {
    type Entry = V;

    fn lookup(&self, key: &str) -> Option<&V> {
        self.get(key)
    }
}

/// Resolves template names against a store, applying the AppView fallback.
///
/// With `view_prefix = "Html3A"` and `view = "Html3B"`, a reference to
/// `Html3AContent` resolves to `{site}_html3bcontent` when that template
/// exists, and to `{site}_html3acontent` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResolver {
    view_prefix: String,
}

impl ViewResolver {
    pub fn new(view_prefix: impl Into<String>) -> Self {
        Self {
            view_prefix: view_prefix.into(),
        }
    }

    pub fn view_prefix(&self) -> &str {
        &self.view_prefix
    }

    /// The AppView-specific key for `name`, if the fallback applies at all.
    ///
    /// Every case-insensitive occurrence of the view prefix in `name` is
    /// replaced by `view`.
    pub fn view_key(&self, site: &str, name: &str, view: Option<&str>) -> Option<String> {
        let view = view.filter(|v| !v.is_empty())?;
        if self.view_prefix.is_empty() {
            return None;
        }
        if !name
            .to_lowercase()
            .contains(&self.view_prefix.to_lowercase())
        {
            return None;
        }
        let app_name = replace_all_ignore_case(name, &self.view_prefix, view);
        Some(template_key(site, &app_name))
    }

    /// Resolve `name` for `site`.
    ///
    /// 1. When `use_view_fallback` is set and a view key exists for `name`, that
    ///    key is tried first and wins if present.
    /// 2. Otherwise the primary key is tried.
    /// 3. Otherwise `None`.
    pub fn get_template<'a, L: TemplateLookup>(
        &self,
        site: &str,
        name: &str,
        templates: &'a L,
        view: Option<&str>,
        use_view_fallback: bool,
    ) -> Option<&'a L::Entry> {
        if use_view_fallback {
            if let Some(key) = self.view_key(site, name, view) {
                if let Some(found) = templates.lookup(&key) {
                    tracing::trace!(name, key = %key, "Resolved template through view fallback");
                    return Some(found);
                }
            }
        }
        templates.lookup(&template_key(site, name))
    }
}
