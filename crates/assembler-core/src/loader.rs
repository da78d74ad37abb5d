/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Filesystem loading and explicit caches.
//!
//! Sites live under `{root}/AppSites/{site}`. Every `*.html` file anywhere
//! below the site directory is a template named by its file stem, paired with
//! the sibling `*.json` file of the same stem when one exists. Root templates
//! (the ones a caller can merge) are the `*.html` files directly inside the
//! site directory. `Views/{X}Content.html` files declare alternate views.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use walkdir::WalkDir;

use crate::config::EngineOptions;
use crate::error::{AssemblerError, AssemblerResult};
use crate::model::PreprocessedSite;
use crate::preprocess::preprocess_site;
use crate::template::TemplateSet;

const APP_SITES_DIR: &str = "AppSites";
const VIEWS_DIR: &str = "Views";

pub fn site_dir(root: &Path, site: &str) -> PathBuf {
    root.join(APP_SITES_DIR).join(site)
}

/// The directory of `site`, matched case-insensitively against the entries
/// under `{root}/AppSites` when the exact spelling does not exist.
pub fn find_site_dir(root: &Path, site: &str) -> AssemblerResult<Option<PathBuf>> {
    let exact = site_dir(root, site);
    if exact.is_dir() {
        return Ok(Some(exact));
    }
    let wanted = site.to_lowercase();
    let found = list_sites(root)?
        .into_iter()
        .find(|name| name.to_lowercase() == wanted)
        .map(|name| site_dir(root, &name));
    Ok(found)
}

fn is_html(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn read_text(path: &Path) -> AssemblerResult<String> {
    std::fs::read_to_string(path).map_err(|e| AssemblerError::io(path, e))
}

/// Load every template of `site` below `root`.
///
/// The site directory is matched case-insensitively. Files are visited in
/// sorted order so template iteration order is the same on every run. A
/// missing site directory yields an empty set.
pub fn load_site(root: &Path, site: &str) -> AssemblerResult<TemplateSet> {
    let mut templates = TemplateSet::new();
    let Some(dir) = find_site_dir(root, site)? else {
        tracing::debug!(root = %root.display(), site, "Site directory not found");
        return Ok(templates);
    };

    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_html(path) {
            continue;
        }
        let Some(name) = file_stem(path) else {
            continue;
        };
        let html = read_text(path)?;
        let json_path = path.with_extension("json");
        let json = if json_path.is_file() {
            Some(read_text(&json_path)?)
        } else {
            None
        };
        tracing::trace!(path = %path.display(), has_json = json.is_some(), "Loaded template");
        templates.insert(site, &name, html, json);
    }

    tracing::debug!(site, templates = templates.len(), "Loaded site");
    Ok(templates)
}

/// Names of every site directory under `{root}/AppSites`, sorted.
pub fn list_sites(root: &Path) -> AssemblerResult<Vec<String>> {
    let dir = root.join(APP_SITES_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sites = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            sites.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(sites)
}

fn html_stems(dir: &Path) -> AssemblerResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_html(entry.path()) {
            names.extend(file_stem(entry.path()));
        }
    }
    Ok(names)
}

/// Root template names of a site: the `*.html` files directly in its directory.
pub fn list_site_files(root: &Path, site: &str) -> AssemblerResult<Vec<String>> {
    html_stems(&site_dir(root, site))
}

/// Views declared by `Views/{X}Content.html` files, as `X` with its first
/// letter upper-cased.
pub fn discover_views(root: &Path, site: &str) -> AssemblerResult<Vec<String>> {
    let views = html_stems(&site_dir(root, site).join(VIEWS_DIR))?
        .into_iter()
        .filter_map(|stem| {
            let at = stem.to_lowercase().find("content")?;
            let part = stem.get(..at).filter(|p| !p.is_empty())?;
            let mut chars = part.chars();
            let first = chars.next()?;
            Some(first.to_uppercase().chain(chars).collect::<String>())
        })
        .collect();
    Ok(views)
}

type CacheKey = (PathBuf, String);

/// A cache of per-site values keyed by (root path, site).
///
/// Caches are plain objects: construct one per process or per test and share
/// it by reference. Sites are matched case-insensitively.
#[derive(Debug)]
pub struct SiteCache<V> {
    entries: RwLock<HashMap<CacheKey, Arc<V>>>,
}

impl<V> Default for SiteCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> SiteCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(root: &Path, site: &str) -> CacheKey {
        (root.to_path_buf(), site.to_lowercase())
    }

    pub fn get(&self, root: &Path, site: &str) -> Option<Arc<V>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(root, site))
            .cloned()
    }

    pub fn put(&self, root: &Path, site: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(root, site), Arc::clone(&value));
        value
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw templates per site.
pub type TemplateCache = SiteCache<TemplateSet>;

/// Preprocessed sites.
pub type PreprocessCache = SiteCache<PreprocessedSite>;

impl SiteCache<TemplateSet> {
    pub fn get_or_load(&self, root: &Path, site: &str) -> AssemblerResult<Arc<TemplateSet>> {
        if let Some(hit) = self.get(root, site) {
            tracing::debug!(site, "Template cache hit");
            return Ok(hit);
        }
        let templates = load_site(root, site)?;
        if templates.is_empty() {
            // Empty sites are not cached
            return Ok(Arc::new(templates));
        }
        Ok(self.put(root, site, templates))
    }
}

impl SiteCache<PreprocessedSite> {
    /// Fetch a preprocessed site, loading raw templates through `templates`
    /// and preprocessing them on a miss.
    pub fn get_or_load(
        &self,
        root: &Path,
        site: &str,
        templates: &TemplateCache,
        options: &EngineOptions,
    ) -> AssemblerResult<Arc<PreprocessedSite>> {
        if let Some(hit) = self.get(root, site) {
            tracing::debug!(site, "Preprocess cache hit");
            return Ok(hit);
        }
        let raw = templates.get_or_load(root, site)?;
        let preprocessed = preprocess_site(site, &raw, options);
        if raw.is_empty() {
            return Ok(Arc::new(preprocessed));
        }
        Ok(self.put(root, site, preprocessed))
    }
}
