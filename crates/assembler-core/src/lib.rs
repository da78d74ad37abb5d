/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Mustache-like HTML template assembler.
//!
//! A site is a set of named HTML templates, each optionally paired with a JSON
//! data file. Merging a root template resolves:
//!
//! - Simple placeholders: `{{Name}}` (a template by name, or a JSON scalar)
//! - Slotted templates: `{{#Name}}...{{/Name}}` with
//!   `{{@HTMLPLACEHOLDER[n]}}...{{/HTMLPLACEHOLDER[n]}}` slot contents filling
//!   the target's `{{$HTMLPLACEHOLDER[n]}}` keys
//! - JSON array blocks: `{{@key}}...{{/key}}`, with per-item conditional blocks
//! - Negative blocks: `{{^key}}...{{/key}}`, shown only for empty arrays
//! - JSON scalars: `{{$key}}`
//!
//! # Architecture
//!
//! There are two engines that must produce byte-identical output:
//!
//! - [`NormalEngine`] merges every template with its own JSON on each request.
//! - [`PreprocessEngine`] rebuilds the same bodies by replaying replacement
//!   mappings computed once per site by [`preprocess_site`], so no JSON is
//!   parsed or scanned at merge time.
//!
//! Both then expand template references with one shared traversal: a slot
//! merge pass and a placeholder pass, repeated until the text is stable.
//!
//! Both resolve template names through [`ViewResolver`], which lets a root
//! template pick a view-specific variant of a sub-template.
//!
//! # Example
//!
//! ```
//! use assembler_core::{EngineOptions, NormalEngine, TemplateSet};
//!
//! let mut templates = TemplateSet::new();
//! templates
//!     .insert(
//!         "Demo",
//!         "Demo",
//!         "<p>{{#Card}}{{@HTMLPLACEHOLDER}}{{$Title}}{{/HTMLPLACEHOLDER}}{{/Card}}</p>",
//!         Some(r#"{"Title":"Hi"}"#.to_string()),
//!     )
//!     .insert("Demo", "Card", "<b>{{$HTMLPLACEHOLDER}}</b>", None);
//!
//! let engine = NormalEngine::new(EngineOptions::default());
//! let html = engine.merge_templates("Demo", "Demo", None, &templates, true);
//! assert_eq!(html, "<p><b>Hi</b></p>");
//! ```

pub mod config;
pub mod conformance;
pub mod engine_normal;
pub mod engine_preprocess;
pub mod error;
mod expand;
pub mod json;
pub mod json_merge;
pub mod loader;
pub mod model;
pub mod preprocess;
pub mod resolver;
pub mod scanner;
pub mod template;

// Re-export main types at crate root
pub use config::{AssemblerConfig, EngineOptions};
pub use conformance::{
    OutputComparison, Scenario, ScenarioReport, check_scenario, compare_outputs, site_scenarios,
};
pub use engine_normal::NormalEngine;
pub use engine_preprocess::PreprocessEngine;
pub use error::{AssemblerError, AssemblerResult};
pub use json::JsonObject;
pub use loader::{
    PreprocessCache, TemplateCache, discover_views, list_site_files, list_sites, load_site,
};
pub use model::{
    JsonPlaceholder, PreprocessedSite, PreprocessedTemplate, ReplacementKind,
    ReplacementMapping, SiteSummary, SlotPlaceholder, SlottedTemplate, TemplatePlaceholder,
};
pub use preprocess::preprocess_site;
pub use resolver::{TemplateLookup, ViewResolver, template_key};
pub use template::{Template, TemplateSet};
