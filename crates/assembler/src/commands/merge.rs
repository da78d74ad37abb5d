/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Merge command implementation
 */

//! Merge command implementation.
//!
//! Loads one site, merges a root template with the chosen engine and writes
//! the HTML to stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use assembler_core::{NormalEngine, PreprocessCache, PreprocessEngine, TemplateCache};

use super::load_config;

/// Which engine performs the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    Normal,
    Preprocess,
}

/// Arguments for the merge command
#[derive(Debug)]
pub struct MergeArgs {
    pub root: PathBuf,
    pub site: String,
    pub file: String,
    pub view: Option<String>,
    /// Overrides the configured view prefix
    pub prefix: Option<String>,
    pub engine: EngineKind,
    pub no_json: bool,
    pub config: Option<PathBuf>,
}

/// Execute the merge command
pub fn execute(args: MergeArgs) -> Result<()> {
    let config = load_config(&args.root, args.config.as_deref())?;
    let mut options = config.engine_options();
    if let Some(prefix) = args.prefix {
        options.view_prefix = prefix;
    }
    let json_enabled = config.enable_json && !args.no_json;

    let templates = TemplateCache::new();
    let set = templates
        .get_or_load(&args.root, &args.site)
        .with_context(|| format!("Failed to load site {}", args.site))?;
    if set.is_empty() {
        anyhow::bail!(
            "No templates found for site {} under {}",
            args.site,
            args.root.display()
        );
    }

    let view = args.view.as_deref();
    let html = match args.engine {
        EngineKind::Normal => {
            NormalEngine::new(options).merge_templates(&args.site, &args.file, view, &set, json_enabled)
        }
        EngineKind::Preprocess => {
            let preprocessed = PreprocessCache::new()
                .get_or_load(&args.root, &args.site, &templates, &options)
                .with_context(|| format!("Failed to preprocess site {}", args.site))?;
            PreprocessEngine::new(options).merge_templates(
                &args.site,
                &args.file,
                view,
                &preprocessed,
                json_enabled,
            )
        }
    };

    if html.is_empty() {
        anyhow::bail!("Template {} not found in site {}", args.file, args.site);
    }
    info!(
        site = %args.site,
        file = %args.file,
        engine = ?args.engine,
        bytes = html.len(),
        "Merged"
    );

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(html.as_bytes())
        .context("Failed to write output")?;
    writeln!(stdout).context("Failed to write output")?;
    Ok(())
}
