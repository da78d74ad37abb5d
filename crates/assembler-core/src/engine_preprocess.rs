/*
 * engine_preprocess.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The PreProcess engine: mechanical application of precomputed mappings.
//!
//! No JSON is parsed and no JSON block is located at merge time. Each
//! template's body is rebuilt by replaying its own JSON mappings against its
//! original content: block edits first, each at the first occurrence of its
//! original text, then `{{$key}}` substitutions. Bare `{{key}}` mappings form
//! the site scalar table. Scoping JSON to the template that owns it keeps one
//! template's data out of another's blocks. Template references are then
//! expanded by the same traversal the Normal engine uses.

use crate::config::EngineOptions;
use crate::expand::MergeContext;
use crate::model::{PreprocessedSite, PreprocessedTemplate, ReplacementKind, ReplacementMapping};
use crate::resolver::ViewResolver;
use crate::scanner::{find_from, replace_all_ignore_case};

/// Merges templates by applying a [`PreprocessedSite`]'s mappings.
#[derive(Debug, Clone, Default)]
pub struct PreprocessEngine {
    options: EngineOptions,
    resolver: ViewResolver,
}

impl PreprocessEngine {
    pub fn new(options: EngineOptions) -> Self {
        let resolver = ViewResolver::new(options.view_prefix.clone());
        Self { options, resolver }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Merge the root template `file` of `site` into final HTML.
    ///
    /// Returns an empty string when `file` does not resolve.
    pub fn merge_templates(
        &self,
        site: &str,
        file: &str,
        view: Option<&str>,
        preprocessed: &PreprocessedSite,
        json_enabled: bool,
    ) -> String {
        let Some(main) = self
            .resolver
            .get_template(site, file, preprocessed, view, true)
        else {
            tracing::debug!(site, file, "Main template not found");
            return String::new();
        };

        let ctx = self.build_context(site, view, preprocessed, json_enabled);
        let root = ctx
            .body(&main.key)
            .cloned()
            .unwrap_or_else(|| main.original_content.clone());

        let fixpoint = ctx.run(root, self.options.max_passes);
        if fixpoint.converged {
            tracing::debug!(site, file, passes = fixpoint.passes, "PreProcess merge converged");
        } else {
            tracing::debug!(
                site,
                file,
                max_passes = self.options.max_passes,
                "PreProcess merge did not converge; returning last result"
            );
        }
        fixpoint.output
    }

    fn build_context<'a>(
        &'a self,
        site: &'a str,
        view: Option<&'a str>,
        preprocessed: &PreprocessedSite,
        json_enabled: bool,
    ) -> MergeContext<'a> {
        let mut ctx = MergeContext::new(site, view, &self.resolver, self.options.max_depth);
        for template in preprocessed.templates.values() {
            let body = if json_enabled {
                for mapping in template.mappings(ReplacementKind::JsonPlaceholder) {
                    if let JsonMapping::Bare(key) = JsonMapping::classify(mapping) {
                        ctx.add_scalar(key, mapping.replacement_text.clone());
                    }
                }
                apply_own_json(template)
            } else {
                template.original_content.clone()
            };
            ctx.add_body(template.key.clone(), body);
        }
        ctx
    }
}

/// The three shapes of a JSON mapping, told apart by their search text.
enum JsonMapping<'m> {
    /// `{{@key}}...{{/key}}` or `{{^key}}...{{/key}}`
    Block,
    /// `{{$key}}`
    Scalar,
    /// `{{key}}`, carrying the key
    Bare(&'m str),
}

impl<'m> JsonMapping<'m> {
    fn classify(mapping: &'m ReplacementMapping) -> Self {
        let text = mapping.original_text.as_str();
        if text.starts_with("{{@") || text.starts_with("{{^") {
            JsonMapping::Block
        } else if text.starts_with("{{$") {
            JsonMapping::Scalar
        } else {
            let key = text
                .strip_prefix("{{")
                .and_then(|rest| rest.strip_suffix("}}"))
                .unwrap_or(text);
            JsonMapping::Bare(key)
        }
    }
}

/// Rebuild a template's body with its own JSON applied.
fn apply_own_json(template: &PreprocessedTemplate) -> String {
    let mut body = template.original_content.clone();
    let of_shape = |is_block: bool| {
        template
            .mappings(ReplacementKind::JsonPlaceholder)
            .filter(move |m| match JsonMapping::classify(m) {
                JsonMapping::Block => is_block,
                JsonMapping::Scalar => !is_block,
                JsonMapping::Bare(_) => false,
            })
    };

    for mapping in of_shape(true) {
        if let Some(at) = find_from(&body, &mapping.original_text, 0) {
            body.replace_range(at..at + mapping.original_text.len(), &mapping.replacement_text);
        }
    }
    for mapping in of_shape(false) {
        body = replace_all_ignore_case(&body, &mapping.original_text, &mapping.replacement_text);
    }
    body
}
