/*
 * engine_normal.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The Normal engine: direct recursive merging.
//!
//! Every call merges each template of the set with its own JSON, gathers a
//! table of every JSON scalar in the site, then expands the root template
//! until the output stops changing.

use crate::config::EngineOptions;
use crate::expand::MergeContext;
use crate::json::{parse_json_object_lenient, scalar_text};
use crate::json_merge::merge_template_with_json;
use crate::resolver::ViewResolver;
use crate::template::TemplateSet;

/// Merges templates by recursive expansion at request time.
#[derive(Debug, Clone, Default)]
pub struct NormalEngine {
    options: EngineOptions,
    resolver: ViewResolver,
}

impl NormalEngine {
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
        templates: &TemplateSet,
        json_enabled: bool,
    ) -> String {
        let Some(main) = self
            .resolver
            .get_template(site, file, templates, view, true)
        else {
            tracing::debug!(site, file, "Main template not found");
            return String::new();
        };

        let ctx = self.build_context(site, view, templates, json_enabled);
        let root = ctx
            .body(&main.key)
            .cloned()
            .unwrap_or_else(|| main.html.clone());

        let fixpoint = ctx.run(root, self.options.max_passes);
        if fixpoint.converged {
            tracing::debug!(site, file, passes = fixpoint.passes, "Normal merge converged");
        } else {
            tracing::debug!(
                site,
                file,
                max_passes = self.options.max_passes,
                "Normal merge did not converge; returning last result"
            );
        }
        fixpoint.output
    }

    fn build_context<'a>(
        &'a self,
        site: &'a str,
        view: Option<&'a str>,
        templates: &TemplateSet,
        json_enabled: bool,
    ) -> MergeContext<'a> {
        let mut ctx = MergeContext::new(site, view, &self.resolver, self.options.max_depth);
        for template in templates.iter() {
            let data = match (&template.json, json_enabled) {
                (Some(text), true) => Some(parse_json_object_lenient(text)),
                _ => None,
            };
            let body = match &data {
                Some(data) => {
                    for (key, value) in data {
                        if let Some(text) = scalar_text(value) {
                            ctx.add_scalar(key, text);
                        }
                    }
                    merge_template_with_json(&template.html, data)
                }
                None => template.html.clone(),
            };
            ctx.add_body(template.key.clone(), body);
        }
        ctx
    }
}
