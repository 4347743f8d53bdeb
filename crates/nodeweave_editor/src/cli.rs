// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line interface.
//!
//! Each subcommand works on session files through a [`NodeGraph`] built from
//! the editor settings, with the stock node types registered.

use crate::error::{AppError, Result};
use crate::settings::{EditorSettings, SETTINGS_FILE_NAME};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use nodeweave_graph::builtin::{self, BASIC_A, BASIC_B, COUNTER};
use nodeweave_graph::{CreateNodeOptions, NodeGraph, PortRef};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Headless node graph editor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the editor settings file (RON)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Editor subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the current settings to the settings file
    Init,

    /// Write a small example session
    Demo {
        /// Output session file
        #[arg(default_value = "demo.json")]
        out: PathBuf,
    },

    /// Summarize a session file
    Info {
        /// Session file to read
        session: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Arrange the nodes of a session by rank
    Layout {
        /// Session file to arrange
        session: PathBuf,

        /// Rank from the outputs back towards the inputs
        #[arg(long)]
        upstream: bool,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge several sessions into one file
    Merge {
        /// Output session file
        out: PathBuf,

        /// Sessions to merge, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Counts reported by `info`
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SessionSummary {
    /// Number of nodes
    pub nodes: usize,
    /// Number of connections
    pub connections: usize,
    /// Node count per type
    pub types: IndexMap<String, usize>,
    /// Whether the graph contains a cycle
    pub cyclic: bool,
}

impl SessionSummary {
    /// Summarize the current graph
    pub fn of(graph: &NodeGraph) -> Self {
        let mut types: IndexMap<String, usize> = IndexMap::new();
        for node in graph.model().nodes() {
            *types.entry(node.type_id.clone()).or_default() += 1;
        }
        Self {
            nodes: graph.model().node_count(),
            connections: graph.model().connections().len(),
            types,
            cyclic: graph.model().has_cycle(),
        }
    }
}

fn editor_graph(settings: &EditorSettings) -> NodeGraph {
    let graph = settings.new_graph();
    builtin::register_builtin_nodes(&mut graph.registry().write());
    graph
}

/// Build the example graph: two sources feeding a counter, then a sink
pub fn build_demo(graph: &mut NodeGraph) -> Result<()> {
    let source = graph.create_node(BASIC_A, CreateNodeOptions::new().name("source"))?;
    let label = graph.create_node(BASIC_B, CreateNodeOptions::new().name("label"))?;
    let counter = graph.create_node(COUNTER, CreateNodeOptions::new())?;
    let sink = graph.create_node(BASIC_B, CreateNodeOptions::new().name("sink"))?;

    let counter_in = PortRef::input(&counter, "in");
    graph.connect(&PortRef::output(&source, "out A"), &counter_in)?;
    graph.connect(&PortRef::output(&label, "out"), &counter_in)?;
    graph.connect(&PortRef::output(&counter, "out"), &PortRef::input(&sink, "in"))?;
    graph.set_property(&label, "label", "hello")?;

    graph.auto_layout_nodes(None, true, &[])?;
    graph.clear_selection()?;
    Ok(())
}

fn write_summary(path: &Path, summary: &SessionSummary, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).map_err(nodeweave_graph::GraphError::from)?;
        println!("{text}");
        return Ok(());
    }
    println!("{}", path.display());
    println!("  nodes:       {}", summary.nodes);
    println!("  connections: {}", summary.connections);
    if summary.cyclic {
        println!("  contains a cycle");
    }
    for (type_id, count) in &summary.types {
        println!("  {count:>4}  {type_id}");
    }
    Ok(())
}

/// Run a parsed command line
pub fn run(cli: &Cli, settings: &EditorSettings) -> Result<()> {
    let mut graph = editor_graph(settings);

    match &cli.command {
        Command::Init => {
            let path = cli.settings.as_deref().unwrap_or(Path::new(SETTINGS_FILE_NAME));
            settings.save(path)?;
            tracing::info!("wrote settings to {}", path.display());
        }
        Command::Demo { out } => {
            build_demo(&mut graph)?;
            graph.save_session(out)?;
        }
        Command::Info { session, json } => {
            graph.load_session(session)?;
            write_summary(session, &SessionSummary::of(&graph), *json)?;
        }
        Command::Layout {
            session,
            upstream,
            output,
        } => {
            graph.load_session(session)?;
            graph.auto_layout_nodes(None, !upstream, &[])?;
            graph.save_session(output.as_ref().unwrap_or(session))?;
        }
        Command::Merge { out, inputs } => {
            let report = graph.import_sessions(inputs);
            tracing::info!(
                "merged {} node(s) from {} session(s)",
                report.nodes.len(),
                report.imported.len()
            );
            graph.clear_selection()?;
            graph.save_session(out)?;
            if !report.is_complete() {
                for (path, e) in &report.failures {
                    tracing::error!("{}: {}", path.display(), e);
                }
                return Err(AppError::IncompleteMerge {
                    failed: report.failures.len(),
                    total: inputs.len(),
                });
            }
        }
    }
    Ok(())
}
