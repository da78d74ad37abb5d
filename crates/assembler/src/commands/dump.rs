/*
 * dump.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dump command: print a preprocessed site as JSON.

use std::path::Path;

use anyhow::{Context, Result};

use assembler_core::{PreprocessCache, TemplateCache};

use super::load_config;

pub fn execute(root: &Path, site: &str, summary: bool, config: Option<&Path>) -> Result<()> {
    let config = load_config(root, config)?;
    let preprocessed = PreprocessCache::new()
        .get_or_load(root, site, &TemplateCache::new(), &config.engine_options())
        .with_context(|| format!("Failed to preprocess site {site}"))?;

    let json = if summary {
        serde_json::to_string_pretty(&preprocessed.summary())
    } else {
        serde_json::to_string_pretty(&*preprocessed)
    }
    .context("Failed to serialize preprocessed site")?;

    println!("{json}");
    Ok(())
}
