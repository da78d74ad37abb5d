/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Assembler CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::merge::EngineKind;

#[derive(Parser)]
#[command(name = "assembler")]
#[command(version)]
#[command(about = "Mustache-like HTML template assembler", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one root template and print the resulting HTML
    Merge {
        /// Directory containing AppSites/
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Site name
        #[arg(long)]
        site: String,

        /// Root template name
        #[arg(long)]
        file: String,

        /// Active view
        #[arg(long)]
        view: Option<String>,

        /// View prefix (overrides the config file)
        #[arg(long)]
        prefix: Option<String>,

        /// Engine to merge with
        #[arg(long, value_enum, default_value_t = EngineKind::Normal)]
        engine: EngineKind,

        /// Skip JSON data merging
        #[arg(long)]
        no_json: bool,

        /// Configuration file (defaults to ROOT/assembler.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check that both engines agree on every root template
    Verify {
        /// Directory containing AppSites/
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Only verify this site
        #[arg(long)]
        site: Option<String>,

        /// Skip JSON data merging
        #[arg(long)]
        no_json: bool,

        /// Configuration file (defaults to ROOT/assembler.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the preprocessed structure of a site as JSON
    Dump {
        /// Directory containing AppSites/
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Site name
        #[arg(long)]
        site: String,

        /// Print only summary counts
        #[arg(long)]
        summary: bool,

        /// Configuration file (defaults to ROOT/assembler.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List sites, their root templates and views
    Sites {
        /// Directory containing AppSites/
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries command output
    let default_filter = if cli.verbose {
        "assembler=debug,assembler_core=debug"
    } else {
        "assembler=info,assembler_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Merge {
            root,
            site,
            file,
            view,
            prefix,
            engine,
            no_json,
            config,
        } => commands::merge::execute(commands::merge::MergeArgs {
            root,
            site,
            file,
            view,
            prefix,
            engine,
            no_json,
            config,
        }),
        Commands::Verify {
            root,
            site,
            no_json,
            config,
        } => commands::verify::execute(commands::verify::VerifyArgs {
            root,
            site,
            no_json,
            config,
        }),
        Commands::Dump {
            root,
            site,
            summary,
            config,
        } => commands::dump::execute(&root, &site, summary, config.as_deref()),
        Commands::Sites { root } => commands::sites::execute(&root),
    }
}
