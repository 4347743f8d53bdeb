// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NodeWeave` command-line editor
//!
//! Builds, inspects, lays out and merges node graph session files without a
//! user interface. All edits go through [`nodeweave_graph::NodeGraph`], so
//! the same rules apply as in an interactive editor: port constraints,
//! acyclic checks, locked ports and undoable macros.

mod cli;
mod error;
mod settings;

use clap::Parser;
use cli::Cli;
use settings::{EditorSettings, SETTINGS_FILE_NAME};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
    let settings = EditorSettings::load(&settings_path);

    let filter_directive = settings
        .as_ref()
        .map(|s| s.logging.filter.clone())
        .unwrap_or_else(|_| EditorSettings::default().logging.filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("NodeWeave v{}", env!("CARGO_PKG_VERSION"));

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run(&args, &settings) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
