/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading and configuration.
//!
//! Merging itself never fails: malformed tags stay literal text and missing
//! templates fall through to the next resolution tier. Only the outer layers
//! (reading files, parsing JSON data files strictly, reading config) report
//! errors through [`AssemblerError`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading templates or configuration.
#[derive(Debug, Error)]
pub enum AssemblerError {
    /// I/O error reading a template, data file or config file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error walking a site directory.
    #[error("Failed to walk site directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Malformed JSON data file.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON data file whose root value is not an object.
    #[error("JSON data root must be an object, found {found}")]
    JsonNotObject { found: &'static str },

    /// Malformed configuration file.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl AssemblerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssemblerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for loading and configuration operations.
pub type AssemblerResult<T> = Result<T, AssemblerError>;
