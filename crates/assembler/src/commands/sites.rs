/*
 * sites.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Sites command: list sites, root templates and views.

use std::path::Path;

use anyhow::{Context, Result};

use assembler_core::{discover_views, list_site_files, list_sites};

pub fn execute(root: &Path) -> Result<()> {
    let sites = list_sites(root)
        .with_context(|| format!("Failed to list sites under {}", root.display()))?;
    if sites.is_empty() {
        eprintln!("No sites found under {}", root.join("AppSites").display());
        return Ok(());
    }

    for site in sites {
        let files = list_site_files(root, &site)?;
        let views = discover_views(root, &site)?;
        println!("{site}");
        println!("  files: {}", files.join(", "));
        if !views.is_empty() {
            println!("  views: {}", views.join(", "));
        }
    }
    Ok(())
}
