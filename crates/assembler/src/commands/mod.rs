/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command implementations for the assembler CLI
//!
//! Each command module handles the CLI interface and delegates to
//! assembler-core for the actual work.

use std::path::Path;

use anyhow::{Context, Result};
use assembler_core::AssemblerConfig;

pub mod dump;
pub mod merge;
pub mod sites;
pub mod verify;

const DEFAULT_CONFIG_FILE: &str = "assembler.toml";

/// Load the configuration named on the command line, or `ROOT/assembler.toml`
/// when it exists, or the defaults.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<AssemblerConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = root.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(AssemblerConfig::default());
            }
            candidate
        }
    };
    AssemblerConfig::load(&path)
        .with_context(|| format!("Failed to load configuration: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config, AssemblerConfig::default());
    }

    #[test]
    fn test_default_config_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "app_view_prefix = \"Html3A\"\n").unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.app_view_prefix, "Html3A");
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
