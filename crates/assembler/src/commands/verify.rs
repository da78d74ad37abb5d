/*
 * verify.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Verify command implementation
 */

//! Verify command implementation.
//!
//! Runs every scenario of every selected site through both engines and
//! reports, per scenario, whether the outputs are identical and whether any
//! tags were left unresolved. Scenarios run in parallel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use assembler_core::{
    PreprocessCache, Scenario, ScenarioReport, TemplateCache, check_scenario, list_sites,
    site_scenarios,
};

use super::load_config;

/// Arguments for the verify command
#[derive(Debug)]
pub struct VerifyArgs {
    pub root: PathBuf,
    /// Restrict to one site (case-insensitive)
    pub site: Option<String>,
    pub no_json: bool,
    pub config: Option<PathBuf>,
}

/// Execute the verify command
pub fn execute(args: VerifyArgs) -> Result<()> {
    let config = load_config(&args.root, args.config.as_deref())?;
    let options = config.engine_options();
    let json_enabled = config.enable_json && !args.no_json;

    let sites: Vec<String> = list_sites(&args.root)
        .with_context(|| format!("Failed to list sites under {}", args.root.display()))?
        .into_iter()
        .filter(|s| {
            args.site
                .as_deref()
                .is_none_or(|filter| s.eq_ignore_ascii_case(filter))
        })
        .collect();
    if sites.is_empty() {
        anyhow::bail!("No sites to verify under {}", args.root.display());
    }

    let templates = TemplateCache::new();
    let preprocessed = PreprocessCache::new();
    let mut scenarios: Vec<Scenario> = Vec::new();
    for site in &sites {
        templates
            .get_or_load(&args.root, site)
            .with_context(|| format!("Failed to load site {site}"))?;
        preprocessed
            .get_or_load(&args.root, site, &templates, &options)
            .with_context(|| format!("Failed to preprocess site {site}"))?;
        scenarios.extend(site_scenarios(&args.root, site)?);
    }
    debug!(sites = sites.len(), scenarios = scenarios.len(), "Collected scenarios");

    let reports: Vec<ScenarioReport> = scenarios
        .par_iter()
        .filter_map(|scenario| {
            let set = templates.get(&args.root, &scenario.site)?;
            let pre = preprocessed.get(&args.root, &scenario.site)?;
            Some(check_scenario(scenario, &set, &pre, &options, json_enabled))
        })
        .collect();

    let mut failed = 0;
    for report in &reports {
        let status = if report.passed() { "ok" } else { "FAIL" };
        println!(
            "{status:4} {} (normal {} bytes, preprocess {} bytes)",
            report.scenario.label(),
            report.comparison.len_a,
            report.comparison.len_b
        );
        if let Some(at) = report.comparison.first_difference {
            println!("     outputs differ at byte {at}");
        }
        if !report.unresolved.is_empty() {
            println!("     unresolved: {}", report.unresolved.join(" "));
        }
        if !report.passed() {
            failed += 1;
        }
    }

    info!(scenarios = reports.len(), failed, "Verification finished");
    if failed > 0 {
        anyhow::bail!("{failed} of {} scenarios failed", reports.len());
    }
    Ok(())
}
