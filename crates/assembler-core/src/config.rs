/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Assembler configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration:
//!
//! ```toml
//! app_view_prefix = "Html3A"
//! max_passes = 10
//! max_depth = 32
//! enable_json = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssemblerError, AssemblerResult};

/// Default bound on fixpoint passes for both engines.
pub const DEFAULT_MAX_PASSES: usize = 10;

/// Default bound on recursive placeholder and slot expansion.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Options shared by both engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Name fragment replaced by the active view during template resolution.
    pub view_prefix: String,
    pub max_passes: usize,
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            view_prefix: String::new(),
            max_passes: DEFAULT_MAX_PASSES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineOptions {
    pub fn with_view_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.view_prefix = prefix.into();
        self
    }
}

/// File-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub app_view_prefix: String,
    pub max_passes: usize,
    pub max_depth: usize,
    pub enable_json: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            app_view_prefix: String::new(),
            max_passes: DEFAULT_MAX_PASSES,
            max_depth: DEFAULT_MAX_DEPTH,
            enable_json: true,
        }
    }
}

impl AssemblerConfig {
    pub fn from_toml_str(text: &str) -> AssemblerResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> AssemblerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AssemblerError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            view_prefix: self.app_view_prefix.clone(),
            max_passes: self.max_passes,
            max_depth: self.max_depth,
        }
    }
}
