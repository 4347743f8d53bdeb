// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings persisted as RON.
//!
//! Every section carries `#[serde(default)]`, so a file that only sets a few
//! fields still loads. A missing file yields the defaults.

use crate::error::{AppError, Result};
use nodeweave_graph::undo::MAX_HISTORY;
use nodeweave_graph::{GraphSettings, LayoutDirection, NodeGraph, PipeStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "nodeweave.ron";

/// Defaults applied to new graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDefaults {
    /// Reject connections that close a cycle
    pub acyclic: bool,
    /// Node layout direction
    pub layout_direction: LayoutDirection,
    /// Pipe drawing style
    pub pipe_style: PipeStyle,
    /// Connect by dropping a node onto a pipe
    pub pipe_collision: bool,
    /// Cut pipes with a slicer gesture
    pub pipe_slicing: bool,
}

impl Default for GraphDefaults {
    fn default() -> Self {
        let graph = GraphSettings::default();
        Self {
            acyclic: graph.acyclic,
            layout_direction: graph.layout_direction,
            pipe_style: graph.pipe_style,
            pipe_collision: graph.pipe_collision,
            pipe_slicing: graph.pipe_slicing,
        }
    }
}

impl From<&GraphDefaults> for GraphSettings {
    fn from(defaults: &GraphDefaults) -> Self {
        Self {
            acyclic: defaults.acyclic,
            layout_direction: defaults.layout_direction,
            pipe_style: defaults.pipe_style,
            pipe_collision: defaults.pipe_collision,
            pipe_slicing: defaults.pipe_slicing,
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum undo depth
    pub undo_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            undo_depth: MAX_HISTORY,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "nodeweave_editor=info,nodeweave_graph=info".to_string(),
        }
    }
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Settings format version
    pub version: u32,
    /// Graph defaults
    pub graph: GraphDefaults,
    /// Undo history
    pub history: HistorySettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            graph: GraphDefaults::default(),
            history: HistorySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl EditorSettings {
    /// Load settings; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| AppError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: EditorSettings = ron::from_str(&content).map_err(|source| AppError::SettingsFormat {
            path: path.to_path_buf(),
            source,
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(AppError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Save settings
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, content).map_err(|source| AppError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build an empty graph configured by these settings
    pub fn new_graph(&self) -> NodeGraph {
        let mut graph = NodeGraph::new().with_graph_settings(GraphSettings::from(&self.graph));
        graph.set_undo_limit(self.history.undo_depth);
        graph
    }
}
