/*
 * model.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Preprocessed site structures.
//!
//! A [`PreprocessedSite`] is built once per template set by
//! [`crate::preprocess::preprocess_site`] and then only read by the PreProcess
//! engine. All of these types serialize (camelCase) for diagnostic dumps.

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::json::JsonObject;
use crate::resolver::TemplateLookup;

/// Kind of a precomputed replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReplacementKind {
    /// JSON array, negative block or scalar substitution.
    JsonPlaceholder,
    /// `{{Name}}` replaced by the raw body of `Name`.
    SimpleTemplate,
    /// `{{#Name}}...{{/Name}}` replaced by the slot-filled body of `Name`.
    SlottedTemplate,
}

/// A literal (search text, replacement text) pair.
///
/// Offsets are informational only. Mappings are applied by text search, since
/// earlier substitutions shift every offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementMapping {
    pub original_text: String,
    pub replacement_text: String,
    #[serde(rename = "type")]
    pub kind: ReplacementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
}

impl ReplacementMapping {
    pub fn new(
        original_text: impl Into<String>,
        replacement_text: impl Into<String>,
        kind: ReplacementKind,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            replacement_text: replacement_text.into(),
            kind,
            start_index: None,
            end_index: None,
        }
    }

    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start_index = Some(start);
        self.end_index = Some(end);
        self
    }
}

/// A bare `{{Name}}` reference found in a template body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePlaceholder {
    pub name: String,
    pub start_index: usize,
    pub end_index: usize,
    pub full_match: String,
    pub template_key: String,
}

/// One `{{@HTMLPLACEHOLDER[n]}}...{{/HTMLPLACEHOLDER[n]}}` slot of a slotted
/// template reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPlaceholder {
    pub number: String,
    pub start_index: usize,
    pub end_index: usize,
    pub content: String,
    pub slot_key: String,
    pub open_tag: String,
    pub close_tag: String,
    pub nested_placeholders: Vec<TemplatePlaceholder>,
    pub nested_slotted_templates: Vec<SlottedTemplate>,
}

impl SlotPlaceholder {
    pub fn requires_nested_processing(&self) -> bool {
        !self.nested_placeholders.is_empty() || !self.nested_slotted_templates.is_empty()
    }
}

/// A `{{#Name}}...{{/Name}}` reference found in a template body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlottedTemplate {
    pub name: String,
    pub start_index: usize,
    pub end_index: usize,
    pub full_match: String,
    pub inner_content: String,
    pub template_key: String,
    pub slots: Vec<SlotPlaceholder>,
}

/// A JSON scalar referenced by a template body as `{{$key}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPlaceholder {
    pub key: String,
    pub placeholder: String,
    pub value: String,
}

/// One template plus everything derived from it at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTemplate {
    pub key: String,
    pub name: String,
    pub original_content: String,
    pub json_data: Option<JsonObject>,
    pub placeholders: Vec<TemplatePlaceholder>,
    pub slotted_templates: Vec<SlottedTemplate>,
    pub json_placeholders: Vec<JsonPlaceholder>,
    /// Ordered: JSON mappings, then simple-template, then slotted-template.
    pub replacement_mappings: Vec<ReplacementMapping>,
}

impl PreprocessedTemplate {
    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    pub fn has_slotted_templates(&self) -> bool {
        !self.slotted_templates.is_empty()
    }

    pub fn has_json_data(&self) -> bool {
        self.json_data.as_ref().is_some_and(|data| !data.is_empty())
    }

    pub fn has_json_placeholders(&self) -> bool {
        !self.json_placeholders.is_empty()
    }

    pub fn has_replacement_mappings(&self) -> bool {
        !self.replacement_mappings.is_empty()
    }

    pub fn requires_processing(&self) -> bool {
        self.has_placeholders()
            || self.has_slotted_templates()
            || self.has_json_data()
            || self.has_json_placeholders()
            || self.has_replacement_mappings()
    }

    /// Mappings of one kind, in recorded order.
    pub fn mappings(&self, kind: ReplacementKind) -> impl Iterator<Item = &ReplacementMapping> {
        self.replacement_mappings
            .iter()
            .filter(move |m| m.kind == kind)
    }
}

impl Serialize for PreprocessedTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PreprocessedTemplate", 14)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("originalContent", &self.original_content)?;
        state.serialize_field("jsonData", &self.json_data)?;
        state.serialize_field("placeholders", &self.placeholders)?;
        state.serialize_field("slottedTemplates", &self.slotted_templates)?;
        state.serialize_field("jsonPlaceholders", &self.json_placeholders)?;
        state.serialize_field("replacementMappings", &self.replacement_mappings)?;
        state.serialize_field("hasPlaceholders", &self.has_placeholders())?;
        state.serialize_field("hasSlottedTemplates", &self.has_slotted_templates())?;
        state.serialize_field("hasJsonData", &self.has_json_data())?;
        state.serialize_field("hasJsonPlaceholders", &self.has_json_placeholders())?;
        state.serialize_field("hasReplacementMappings", &self.has_replacement_mappings())?;
        state.serialize_field("requiresProcessing", &self.requires_processing())?;
        state.end()
    }
}

/// Every preprocessed template of one site, in loader order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessedSite {
    pub site_name: String,
    pub templates: IndexMap<String, PreprocessedTemplate>,
}

impl PreprocessedSite {
    pub fn get(&self, key: &str) -> Option<&PreprocessedTemplate> {
        self.templates.get(&key.to_lowercase())
    }

    pub fn summary(&self) -> SiteSummary {
        let count = |pred: fn(&PreprocessedTemplate) -> bool| {
            self.templates.values().filter(|t| pred(t)).count()
        };
        SiteSummary {
            site_name: self.site_name.clone(),
            total_templates: self.templates.len(),
            templates_requiring_processing: count(PreprocessedTemplate::requires_processing),
            templates_with_json_data: count(PreprocessedTemplate::has_json_data),
            templates_with_placeholders: count(PreprocessedTemplate::has_placeholders),
            total_replacement_mappings: self
                .templates
                .values()
                .map(|t| t.replacement_mappings.len())
                .sum(),
        }
    }
}

impl TemplateLookup for PreprocessedSite {
    type Entry = PreprocessedTemplate;

    fn lookup(&self, key: &str) -> Option<&PreprocessedTemplate> {
        self.templates.get(key)
    }
}

/// Counts describing a preprocessed site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub site_name: String,
    pub total_templates: usize,
    pub templates_requiring_processing: usize,
    pub templates_with_json_data: usize,
    pub templates_with_placeholders: usize,
    pub total_replacement_mappings: usize,
}
