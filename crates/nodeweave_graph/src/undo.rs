// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo stack of command macros.
//!
//! Commands are applied as they are pushed. While a macro is open they
//! collect into it; otherwise each command is committed as its own entry.

use crate::command::{Command, CommandContext};
use crate::error::{GraphError, Result};
use std::collections::VecDeque;

/// Default undo history depth
pub const MAX_HISTORY: usize = 100;

/// Commands undone and redone as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    /// Human-readable description
    pub label: String,
    /// Commands in application order
    pub commands: Vec<Command>,
}

impl Macro {
    /// Create an empty macro
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }
}

/// Undo stack statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoStats {
    /// Macros that can be undone
    pub undo_count: usize,
    /// Macros that can be redone
    pub redo_count: usize,
    /// Elementary commands held across both stacks
    pub command_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
    /// Whether a macro is being recorded
    pub recording: bool,
}

/// Undo/redo history of command macros
#[derive(Debug)]
pub struct UndoStack {
    /// Undo stack, oldest first
    undo_stack: VecDeque<Macro>,
    /// Redo stack, next redo last
    redo_stack: Vec<Macro>,
    /// Macro being recorded
    open: Option<Macro>,
    /// Nesting level of `begin` calls
    depth: usize,
    /// Maximum history depth
    max_depth: usize,
    /// Undo stack length at the last clean point
    clean: Option<usize>,
}

impl UndoStack {
    /// Create a stack with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create a stack keeping at most `max_depth` macros
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            open: None,
            depth: 0,
            max_depth: max_depth.max(1),
            clean: Some(0),
        }
    }

    /// Change the depth, dropping the oldest macros if needed
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        self.enforce_limit();
    }

    /// Open a macro; nested calls fold into the outermost one
    pub fn begin(&mut self, label: impl Into<String>) {
        self.depth += 1;
        if self.open.is_none() {
            self.open = Some(Macro::new(label));
        }
    }

    /// Close the innermost `begin`. The outermost close commits the macro,
    /// or discards it when nothing was pushed.
    pub fn end(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(GraphError::NoOpenMacro);
        }
        self.depth -= 1;
        if self.depth == 0 {
            if let Some(recorded) = self.open.take() {
                if !recorded.commands.is_empty() {
                    self.commit(recorded);
                }
            }
        }
        Ok(())
    }

    /// Whether a macro is being recorded
    pub fn is_recording(&self) -> bool {
        self.open.is_some()
    }

    /// Apply `command` and record it.
    ///
    /// A command that fails to apply is not recorded.
    pub fn push(&mut self, command: Command, ctx: &mut CommandContext<'_>) -> Result<()> {
        command.apply(ctx)?;
        self.drop_redo_tail();
        match self.open.as_mut() {
            Some(recording) => recording.commands.push(command),
            None => {
                let mut single = Macro::new(command.label());
                single.commands.push(command);
                self.commit(single);
            }
        }
        Ok(())
    }

    fn drop_redo_tail(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        self.redo_stack.clear();
        if self.clean.is_some_and(|clean| clean > self.undo_stack.len()) {
            self.clean = None;
        }
    }

    fn commit(&mut self, recorded: Macro) {
        tracing::trace!("commit '{}' ({} commands)", recorded.label, recorded.commands.len());
        self.undo_stack.push_back(recorded);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
            self.clean = match self.clean {
                Some(0) | None => None,
                Some(clean) => Some(clean - 1),
            };
        }
    }

    /// Undo the last macro, inverting its commands in reverse order
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        if let Some(recording) = &self.open {
            return Err(GraphError::MacroInProgress(recording.label.clone()));
        }
        let recorded = self.undo_stack.pop_back().ok_or(GraphError::NothingToUndo)?;
        tracing::debug!("undo '{}'", recorded.label);
        let result = recorded
            .commands
            .iter()
            .rev()
            .try_for_each(|command| command.invert(ctx));
        self.redo_stack.push(recorded);
        result
    }

    /// Redo the last undone macro, applying its commands in order
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        if let Some(recording) = &self.open {
            return Err(GraphError::MacroInProgress(recording.label.clone()));
        }
        let recorded = self.redo_stack.pop().ok_or(GraphError::NothingToRedo)?;
        tracing::debug!("redo '{}'", recorded.label);
        let result = recorded
            .commands
            .iter()
            .try_for_each(|command| command.apply(ctx));
        self.undo_stack.push_back(recorded);
        result
    }

    /// Drop all history and any open macro; graph state is untouched
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.depth = 0;
        self.clean = Some(0);
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.open.is_none() && !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.open.is_none() && !self.redo_stack.is_empty()
    }

    /// Get description of next undo macro
    pub fn undo_text(&self) -> Option<&str> {
        self.undo_stack.back().map(|m| m.label.as_str())
    }

    /// Get description of next redo macro
    pub fn redo_text(&self) -> Option<&str> {
        self.redo_stack.last().map(|m| m.label.as_str())
    }

    /// Total number of macros held
    pub fn len(&self) -> usize {
        self.undo_stack.len() + self.redo_stack.len()
    }

    /// Whether no macro is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor position, the number of macros that can be undone
    pub fn index(&self) -> usize {
        self.undo_stack.len()
    }

    /// Mark the current state as clean, e.g. after a save
    pub fn set_clean(&mut self) {
        self.clean = Some(self.undo_stack.len());
    }

    /// Whether the state matches the last clean point
    pub fn is_clean(&self) -> bool {
        self.open.is_none() && self.clean == Some(self.undo_stack.len())
    }

    /// Get undo stack statistics
    pub fn stats(&self) -> UndoStats {
        let count = |m: &Macro| m.commands.len();
        UndoStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            command_count: self.undo_stack.iter().map(count).sum::<usize>()
                + self.redo_stack.iter().map(count).sum::<usize>(),
            max_depth: self.max_depth,
            recording: self.open.is_some(),
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
