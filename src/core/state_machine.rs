//! State machine for tracking the publish progress of one package record
//!
//! Versions move strictly forward: `Idle → PublishingVersion(0) → … → Done`,
//! or into `Failed` from any publishing step. Illegal transitions are rejected.

use chrono::{DateTime, Utc};
use std::fmt;

/// Record publishing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Idle,
    PublishingVersion(usize),
    Done,
    Failed,
}

impl RecordState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::PublishingVersion(index) => write!(f, "PublishingVersion({})", index),
            Self::Done => f.write_str("Done"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// State transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: RecordState,

    /// To state
    pub to: RecordState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

/// Rejected transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: RecordState,
    pub to: RecordState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks one record's versions as they are published
#[derive(Debug)]
pub struct RecordProgress {
    current_state: RecordState,
    transitions: Vec<StateTransition>,
    started_at: DateTime<Utc>,
}

impl Default for RecordProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordProgress {
    /// Create a new state machine in `Idle`
    pub fn new() -> Self {
        Self {
            current_state: RecordState::Idle,
            transitions: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: RecordState) -> Result<(), IllegalTransition> {
        let from = self.current_state;
        if !Self::is_allowed(from, to) {
            return Err(IllegalTransition { from, to });
        }

        self.transitions.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;

        Ok(())
    }

    fn is_allowed(from: RecordState, to: RecordState) -> bool {
        use RecordState::*;

        if from.is_terminal() {
            return false;
        }

        match (from, to) {
            (Idle, PublishingVersion(0)) | (Idle, Done) => true,
            (PublishingVersion(current), PublishingVersion(next)) => next == current + 1,
            (PublishingVersion(_), Done) | (PublishingVersion(_), Failed) => true,
            _ => false,
        }
    }

    /// Get current state
    pub fn get_state(&self) -> RecordState {
        self.current_state
    }

    /// Number of versions that completed successfully so far
    pub fn completed_versions(&self) -> usize {
        match self.current_state {
            RecordState::Idle => 0,
            RecordState::PublishingVersion(index) => index,
            RecordState::Done | RecordState::Failed => self
                .transitions
                .iter()
                .rev()
                .find_map(|t| match t.from {
                    RecordState::PublishingVersion(index) => Some(match self.current_state {
                        RecordState::Done => index + 1,
                        _ => index,
                    }),
                    _ => None,
                })
                .unwrap_or(0),
        }
    }

    /// Get elapsed time since creation in milliseconds
    pub fn get_elapsed_time(&self) -> i64 {
        let end = self
            .transitions
            .last()
            .map(|t| t.timestamp)
            .unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }

    /// Get transition history as a printable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{} → {}", t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
