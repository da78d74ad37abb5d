/*
 * conformance.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine equivalence checks.
//!
//! A scenario is one (site, root file, view) triple. Checking a scenario runs
//! both engines over the same templates and compares their outputs byte for
//! byte; the Normal output is also scanned for unresolved tags.

use std::path::Path;

use serde::Serialize;

use crate::config::EngineOptions;
use crate::engine_normal::NormalEngine;
use crate::engine_preprocess::PreprocessEngine;
use crate::error::AssemblerResult;
use crate::loader::{discover_views, list_site_files};
use crate::model::PreprocessedSite;
use crate::scanner::find_unresolved_tags;
use crate::template::TemplateSet;

/// Result of comparing two merge outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputComparison {
    pub identical: bool,
    /// Byte offset of the first difference.
    pub first_difference: Option<usize>,
    pub len_a: usize,
    pub len_b: usize,
}

pub fn compare_outputs(a: &str, b: &str) -> OutputComparison {
    let first_difference = if a == b {
        None
    } else {
        Some(
            a.bytes()
                .zip(b.bytes())
                .position(|(x, y)| x != y)
                .unwrap_or_else(|| a.len().min(b.len())),
        )
    };
    OutputComparison {
        identical: first_difference.is_none(),
        first_difference,
        len_a: a.len(),
        len_b: b.len(),
    }
}

/// One merge request to check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub site: String,
    pub file: String,
    pub view: Option<String>,
    pub view_prefix: String,
}

impl Scenario {
    pub fn label(&self) -> String {
        match &self.view {
            Some(view) => format!("{}/{} [{}]", self.site, self.file, view),
            None => format!("{}/{}", self.site, self.file),
        }
    }
}

/// Every scenario of a site: each root file without a view, then each root
/// file once per declared view. The root file name is the view prefix.
pub fn site_scenarios(root: &Path, site: &str) -> AssemblerResult<Vec<Scenario>> {
    let files = list_site_files(root, site)?;
    let views = discover_views(root, site)?;

    let mut scenarios = Vec::with_capacity(files.len() * (views.len() + 1));
    for file in &files {
        let choices = std::iter::once(None).chain(views.iter().cloned().map(Some));
        for view in choices {
            scenarios.push(Scenario {
                site: site.to_string(),
                file: file.clone(),
                view,
                view_prefix: file.clone(),
            });
        }
    }
    Ok(scenarios)
}

/// Outcome of checking one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub normal: String,
    pub preprocess: String,
    pub comparison: OutputComparison,
    pub unresolved: Vec<String>,
}

impl ScenarioReport {
    /// Both engines agree and nothing is left unresolved.
    pub fn passed(&self) -> bool {
        self.comparison.identical && self.unresolved.is_empty()
    }
}

/// Run both engines for `scenario` and compare.
pub fn check_scenario(
    scenario: &Scenario,
    templates: &TemplateSet,
    preprocessed: &PreprocessedSite,
    options: &EngineOptions,
    json_enabled: bool,
) -> ScenarioReport {
    let options = options.clone().with_view_prefix(scenario.view_prefix.clone());
    let view = scenario.view.as_deref();

    let normal = NormalEngine::new(options.clone()).merge_templates(
        &scenario.site,
        &scenario.file,
        view,
        templates,
        json_enabled,
    );
    let preprocess = PreprocessEngine::new(options).merge_templates(
        &scenario.site,
        &scenario.file,
        view,
        preprocessed,
        json_enabled,
    );

    let comparison = compare_outputs(&normal, &preprocess);
    let unresolved = find_unresolved_tags(&normal);
    if !comparison.identical {
        tracing::warn!(
            scenario = %scenario.label(),
            first_difference = ?comparison.first_difference,
            "Engine outputs differ"
        );
    }

    ScenarioReport {
        scenario: scenario.clone(),
        normal,
        preprocess,
        comparison,
        unresolved,
    }
}
