/*
 * preprocess.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Static analysis of a template set into replacement mappings.
//!
//! Every template is analyzed against its own raw content in three phases:
//!
//! 1. JSON: array blocks, negative blocks and scalars from the template's own
//!    data. No other template is consulted. The engine replays these to
//!    rebuild each template's body without touching JSON at merge time.
//! 2. Simple templates: each `{{Name}}` whose target exists maps to the
//!    target's raw body.
//! 3. Slotted templates: each resolvable `{{#Name}}...{{/Name}}` maps to the
//!    target body with its slots filled. Slotted blocks nested in slot content,
//!    or left in the filled body, are resolved recursively up to `max_depth`.
//!
//! Phases 2 and 3 resolve by exact key and describe the site's static
//! reference graph for dumps and summaries. View-dependent resolution happens
//! at merge time.

use indexmap::IndexMap;

use crate::config::EngineOptions;
use crate::json::{JsonObject, parse_json_object_lenient, scalar_text};
use crate::json_merge::plan_json_merge;
use crate::model::{
    JsonPlaceholder, PreprocessedSite, PreprocessedTemplate, ReplacementKind,
    ReplacementMapping, SlotPlaceholder, SlottedTemplate, TemplatePlaceholder,
};
use crate::resolver::template_key;
use crate::scanner::{
    fill_slots, is_tag_name, next_slotted_block, parse_slots, scan_simple_placeholders, tag,
};
use crate::template::{Template, TemplateSet};

/// Build the preprocessed form of every template in `templates`.
pub fn preprocess_site(site: &str, templates: &TemplateSet, options: &EngineOptions) -> PreprocessedSite {
    let analyzer = SiteAnalyzer {
        site,
        templates,
        max_depth: options.max_depth,
    };

    let mut preprocessed = IndexMap::with_capacity(templates.len());
    for template in templates.iter() {
        preprocessed.insert(template.key.clone(), analyzer.analyze(template));
    }

    let site = PreprocessedSite {
        site_name: site.to_string(),
        templates: preprocessed,
    };
    tracing::debug!(
        site = %site.site_name,
        templates = site.templates.len(),
        mappings = site.summary().total_replacement_mappings,
        "Preprocessed site"
    );
    site
}

struct SiteAnalyzer<'a> {
    site: &'a str,
    templates: &'a TemplateSet,
    max_depth: usize,
}

impl SiteAnalyzer<'_> {
    fn analyze(&self, template: &Template) -> PreprocessedTemplate {
        let content = template.html.as_str();
        let json_data = template.json.as_deref().map(parse_json_object_lenient);

        let mut mappings = Vec::new();
        let mut json_placeholders = Vec::new();
        if let Some(data) = &json_data {
            json_mappings(content, data, &mut json_placeholders, &mut mappings);
        }

        let placeholders = self.placeholders(content);
        for placeholder in &placeholders {
            let Some(target) = self.templates.get(&placeholder.template_key) else {
                continue;
            };
            if has_mapping(&mappings, ReplacementKind::SimpleTemplate, &placeholder.full_match) {
                continue;
            }
            mappings.push(
                ReplacementMapping::new(
                    placeholder.full_match.clone(),
                    target.html.clone(),
                    ReplacementKind::SimpleTemplate,
                )
                .at(placeholder.start_index, placeholder.end_index),
            );
        }

        let slotted_templates = self.slotted_templates(content);
        let mut pos = 0;
        while let Some(span) = next_slotted_block(content, pos) {
            let Some(target) = self.target(&span.name) else {
                pos = span.inner_start;
                continue;
            };
            let original = span.full_match(content);
            if !has_mapping(&mappings, ReplacementKind::SlottedTemplate, original) {
                let replacement = self.fill_block(span.inner(content), &target.html, 0);
                mappings.push(
                    ReplacementMapping::new(original, replacement, ReplacementKind::SlottedTemplate)
                        .at(span.start, span.end),
                );
            }
            pos = span.end;
        }

        PreprocessedTemplate {
            key: template.key.clone(),
            name: template.name.clone(),
            original_content: template.html.clone(),
            json_data,
            placeholders,
            slotted_templates,
            json_placeholders,
            replacement_mappings: mappings,
        }
    }

    /// Exact-key lookup; view fallback is applied by the engine, not here.
    fn target(&self, name: &str) -> Option<&Template> {
        self.templates.get(&template_key(self.site, name))
    }

    fn placeholders(&self, content: &str) -> Vec<TemplatePlaceholder> {
        scan_simple_placeholders(content)
            .into_iter()
            .map(|span| TemplatePlaceholder {
                template_key: template_key(self.site, &span.name),
                name: span.name,
                start_index: span.start,
                end_index: span.end,
                full_match: span.full_match,
            })
            .collect()
    }

    /// Describe every slotted block of `content`, including blocks nested in
    /// slot content.
    fn slotted_templates(&self, content: &str) -> Vec<SlottedTemplate> {
        let mut found = Vec::new();
        let mut pos = 0;
        while let Some(span) = next_slotted_block(content, pos) {
            let inner = span.inner(content);
            let slots = parse_slots(inner)
                .into_iter()
                .map(|slot| SlotPlaceholder {
                    nested_placeholders: self.placeholders(&slot.content),
                    nested_slotted_templates: self.slotted_templates(&slot.content),
                    number: slot.number,
                    start_index: slot.start,
                    end_index: slot.end,
                    content: slot.content,
                    slot_key: slot.slot_key,
                    open_tag: slot.open_tag,
                    close_tag: slot.close_tag,
                })
                .collect();
            found.push(SlottedTemplate {
                name: span.name.clone(),
                start_index: span.start,
                end_index: span.end,
                full_match: span.full_match(content).to_string(),
                inner_content: inner.to_string(),
                template_key: template_key(self.site, &span.name),
                slots,
            });
            pos = span.end;
        }
        found
    }

    /// Fill `target` with the slots of a block's inner content.
    fn fill_block(&self, inner: &str, target: &str, depth: usize) -> String {
        let values: Vec<(String, String)> = parse_slots(inner)
            .into_iter()
            .map(|slot| {
                let value = self.resolve_slotted_blocks(&slot.content, depth + 1);
                (slot.slot_key, value)
            })
            .collect();
        let filled = fill_slots(target, &values);
        self.resolve_slotted_blocks(&filled, depth + 1)
    }

    /// Replace every resolvable slotted block in `content`.
    fn resolve_slotted_blocks(&self, content: &str, depth: usize) -> String {
        if depth > self.max_depth {
            tracing::trace!(depth, "Slotted nesting limit reached during preprocessing");
            return content.to_string();
        }
        let mut result = content.to_string();
        let mut pos = 0;
        while let Some(span) = next_slotted_block(&result, pos) {
            let Some(target) = self.target(&span.name) else {
                pos = span.inner_start;
                continue;
            };
            let replacement = self.fill_block(span.inner(&result), &target.html, depth);
            result.replace_range(span.start..span.end, &replacement);
            pos = span.start + replacement.len();
        }
        result
    }
}

fn has_mapping(mappings: &[ReplacementMapping], kind: ReplacementKind, original: &str) -> bool {
    mappings
        .iter()
        .any(|m| m.kind == kind && m.original_text == original)
}

/// Phase 1: mappings from a template's own JSON data.
///
/// Block edits come first, each computed against the text the previous one
/// left, then the `{{$key}}` scalars the content references, then a bare
/// `{{key}}` for every scalar whose key is a valid tag name.
fn json_mappings(
    content: &str,
    data: &JsonObject,
    json_placeholders: &mut Vec<JsonPlaceholder>,
    mappings: &mut Vec<ReplacementMapping>,
) {
    let plan = plan_json_merge(content, data);

    for edit in plan.block_edits {
        mappings.push(
            ReplacementMapping::new(edit.original, edit.replacement, ReplacementKind::JsonPlaceholder)
                .at(edit.start, edit.end),
        );
    }

    for (key, placeholder, value) in plan.scalar_substitutions {
        mappings.push(ReplacementMapping::new(
            placeholder.clone(),
            value.clone(),
            ReplacementKind::JsonPlaceholder,
        ));
        json_placeholders.push(JsonPlaceholder {
            key,
            placeholder,
            value,
        });
    }

    for (key, value) in data {
        let Some(text) = scalar_text(value) else {
            continue;
        };
        if is_tag_name(key) {
            mappings.push(ReplacementMapping::new(
                tag("", key),
                text,
                ReplacementKind::JsonPlaceholder,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(template: &PreprocessedTemplate) -> Vec<ReplacementKind> {
        template.replacement_mappings.iter().map(|m| m.kind).collect()
    }

    #[test]
    fn test_phases_are_ordered() {
        let mut set = TemplateSet::new();
        set.insert(
            "s",
            "Page",
            "{{Header}}{{#Card}}{{@HTMLPLACEHOLDER}}{{$Title}}{{/HTMLPLACEHOLDER}}{{/Card}}",
            Some(r#"{"Title": "Hi"}"#.to_string()),
        )
        .insert("s", "Header", "<h/>", None)
        .insert("s", "Card", "<b>{{$HTMLPLACEHOLDER}}</b>", None);

        let site = preprocess_site("s", &set, &EngineOptions::default());
        let page = site.get("s_page").unwrap();
        assert_eq!(
            kinds(page),
            vec![
                ReplacementKind::JsonPlaceholder,
                ReplacementKind::JsonPlaceholder,
                ReplacementKind::SimpleTemplate,
                ReplacementKind::SlottedTemplate,
            ]
        );

        let texts: Vec<(&str, &str)> = page
            .replacement_mappings
            .iter()
            .map(|m| (m.original_text.as_str(), m.replacement_text.as_str()))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("{{$Title}}", "Hi"),
                ("{{Title}}", "Hi"),
                ("{{Header}}", "<h/>"),
                (
                    "{{#Card}}{{@HTMLPLACEHOLDER}}{{$Title}}{{/HTMLPLACEHOLDER}}{{/Card}}",
                    "<b>{{$Title}}</b>"
                ),
            ]
        );
        assert_eq!(page.json_placeholders.len(), 1);
        assert_eq!(page.slotted_templates[0].slots[0].slot_key, "{{$HTMLPLACEHOLDER}}");
    }

    #[test]
    fn test_simple_mapping_uses_raw_target() {
        let mut set = TemplateSet::new();
        set.insert("s", "Page", "{{Header}}{{Header}}{{Missing}}", None)
            .insert("s", "Header", "<h>{{Logo}}</h>", None);
        let site = preprocess_site("s", &set, &EngineOptions::default());
        let page = site.get("s_page").unwrap();

        assert_eq!(page.placeholders.len(), 3);
        assert_eq!(page.replacement_mappings.len(), 1);
        assert_eq!(page.replacement_mappings[0].replacement_text, "<h>{{Logo}}</h>");
    }

    #[test]
    fn test_slotted_pass_through_layout_is_flattened() {
        let mut set = TemplateSet::new();
        set.insert(
            "s",
            "Page",
            "{{#Shell}}{{@HTMLPLACEHOLDER}}body{{/HTMLPLACEHOLDER}}{{/Shell}}",
            None,
        )
        .insert(
            "s",
            "Shell",
            "<shell>{{#Frame}}{{@HTMLPLACEHOLDER}}{{$HTMLPLACEHOLDER}}{{/HTMLPLACEHOLDER}}{{/Frame}}</shell>",
            None,
        )
        .insert("s", "Frame", "<frame>{{$HTMLPLACEHOLDER}}</frame>", None);

        let site = preprocess_site("s", &set, &EngineOptions::default());
        let page = site.get("s_page").unwrap();
        let slotted: Vec<&ReplacementMapping> =
            page.mappings(ReplacementKind::SlottedTemplate).collect();
        assert_eq!(slotted.len(), 1);
        assert_eq!(
            slotted[0].replacement_text,
            "<shell><frame>body</frame></shell>"
        );
    }

    #[test]
    fn test_nested_slotted_in_slot_content() {
        let mut set = TemplateSet::new();
        set.insert(
            "s",
            "Page",
            "{{#Outer}}{{@HTMLPLACEHOLDER}}{{#Inner}}{{@HTMLPLACEHOLDER}}x{{/HTMLPLACEHOLDER}}{{/Inner}}{{/HTMLPLACEHOLDER}}{{/Outer}}",
            None,
        )
        .insert("s", "Outer", "<o>{{$HTMLPLACEHOLDER}}</o>", None)
        .insert("s", "Inner", "<i>{{$HTMLPLACEHOLDER}}</i>", None);

        let site = preprocess_site("s", &set, &EngineOptions::default());
        let page = site.get("s_page").unwrap();
        assert_eq!(page.replacement_mappings.len(), 1);
        assert_eq!(page.replacement_mappings[0].replacement_text, "<o><i>x</i></o>");

        let outer = &page.slotted_templates[0];
        assert_eq!(outer.name, "Outer");
        assert_eq!(outer.slots[0].nested_slotted_templates[0].name, "Inner");
        assert!(outer.slots[0].requires_nested_processing());
    }

    #[test]
    fn test_json_array_and_negative_mappings() {
        let mut set = TemplateSet::new();
        set.insert(
            "s",
            "List",
            "{{@Items}}<li>{{$Name}}</li>{{/Items}}{{^Items}}empty{{/Items}}",
            Some(r#"{"Items": [{"Name": "a"}]}"#.to_string()),
        );
        let site = preprocess_site("s", &set, &EngineOptions::default());
        let list = site.get("s_list").unwrap();

        let texts: Vec<(&str, &str)> = list
            .replacement_mappings
            .iter()
            .map(|m| (m.original_text.as_str(), m.replacement_text.as_str()))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("{{@Items}}<li>{{$Name}}</li>{{/Items}}", "<li>a</li>"),
                ("{{^Items}}empty{{/Items}}", ""),
            ]
        );
        assert!(list.has_json_data());
        assert!(!list.has_json_placeholders());
    }

    #[test]
    fn test_malformed_json_is_empty_data() {
        let mut set = TemplateSet::new();
        set.insert("s", "Page", "{{$Title}}", Some("{oops".to_string()));
        let site = preprocess_site("s", &set, &EngineOptions::default());
        let page = site.get("s_page").unwrap();
        assert!(!page.has_json_data());
        assert!(!page.requires_processing());
    }
}
