/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loaded templates.

use indexmap::IndexMap;

use crate::resolver::{TemplateLookup, template_key};

/// One HTML template and its optional paired JSON data text.
///
/// The HTML body is never modified after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Lowercase `{site}_{name}` key.
    pub key: String,
    /// Template name as found on disk (file stem).
    pub name: String,
    pub html: String,
    pub json: Option<String>,
}

/// All templates of one site, keyed by template key.
///
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: IndexMap<String, Template>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, computing its key from `site` and `name`.
    ///
    /// A template with the same key is replaced in place.
    pub fn insert(
        &mut self,
        site: &str,
        name: &str,
        html: impl Into<String>,
        json: Option<String>,
    ) -> &mut Self {
        let key = template_key(site, name);
        self.templates.insert(
            key.clone(),
            Template {
                key,
                name: name.to_string(),
                html: html.into(),
                json,
            },
        );
        self
    }

    /// Look a template up by key; the key is lowercased first.
    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.get(&key.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateLookup for TemplateSet {
    type Entry = Template;

    fn lookup(&self, key: &str) -> Option<&Template> {
        self.templates.get(key)
    }
}
