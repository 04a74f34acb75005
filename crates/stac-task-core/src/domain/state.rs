//! State - 1 回のタスク実行の状態
//!
//! State transitions:
//! - Constructed -> Decoding -> Processing -> Encoding -> ProvenanceStamped
//!   -> CollectionAssigned -> Done
//! - any non-terminal state -> Failed
//!
//! `Done` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::StacTaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionState {
    /// The task was built from its configuration mapping.
    Constructed,

    /// Raw features are being decoded into the task's input shape.
    Decoding,

    /// The task's processing strategy is running.
    Processing,

    /// Outputs are being re-encoded to JSON objects.
    Encoding,

    ProvenanceStamped,

    CollectionAssigned,

    Done,

    Failed,
}

impl ExecutionState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Done | ExecutionState::Failed)
    }

    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Constructed, Decoding)
            | (Decoding, Processing)
            | (Processing, Encoding)
            | (Encoding, ProvenanceStamped)
            | (ProvenanceStamped, CollectionAssigned)
            | (CollectionAssigned, Done) => true,
            _ => false,
        }
    }
}

/// Records the states one execution went through.
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    history: Vec<ExecutionState>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self {
            history: vec![ExecutionState::Constructed],
        }
    }

    pub fn state(&self) -> ExecutionState {
        // history is never empty
        self.history
            .last()
            .copied()
            .unwrap_or(ExecutionState::Constructed)
    }

    pub fn history(&self) -> &[ExecutionState] {
        &self.history
    }

    pub fn advance(&mut self, next: ExecutionState) -> Result<(), StacTaskError> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(StacTaskError::InvalidTransition { from, to: next });
        }
        debug!(?from, to = ?next, "execution state");
        self.history.push(next);
        Ok(())
    }

    /// Mark the execution failed. A no-op once a terminal state is reached.
    pub fn fail(&mut self) {
        if !self.state().is_terminal() {
            self.history.push(ExecutionState::Failed);
        }
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}
