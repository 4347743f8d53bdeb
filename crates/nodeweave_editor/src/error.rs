// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors surfaced by the command-line editor.

use nodeweave_graph::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Editor application error
#[derive(Debug, Error)]
pub enum AppError {
    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Settings file could not be read or written
    #[error("settings file {path:?}: {source}")]
    SettingsIo {
        /// File path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid RON
    #[error("settings file {path:?}: {source}")]
    SettingsFormat {
        /// File path
        path: PathBuf,
        /// Parse failure with position
        #[source]
        source: ron::error::SpannedError,
    },

    /// Settings could not be encoded
    #[error("failed to encode settings: {0}")]
    SettingsEncode(#[from] ron::Error),

    /// Settings written by a newer editor
    #[error("settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// Some input sessions could not be merged
    #[error("{failed} of {total} session(s) could not be imported")]
    IncompleteMerge {
        /// Failed inputs
        failed: usize,
        /// All inputs
        total: usize,
    },
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, AppError>;
