// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use super::StructuredLog;

/// A turn began running its propagation phase.
pub struct TurnStarted {
    pub turn_id: u64,
    pub staged_changes: usize,
}

impl fmt::Display for TurnStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {} starting with {} staged change(s)",
            self.turn_id, self.staged_changes
        )
    }
}

impl StructuredLog for TurnStarted {
    fn span(&self) -> tracing::Span {
        tracing::debug_span!("turn", turn_id = self.turn_id)
    }
}

/// A turn finished committing: propagation is quiescent, the commit-phase
/// queue has drained, and the turn counter has advanced.
pub struct TurnCommitted {
    pub turn_id: u64,
    pub nodes_ticked: usize,
    pub failures: usize,
}

impl fmt::Display for TurnCommitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {} committed: {} node(s) ticked, {} failure(s)",
            self.turn_id, self.nodes_ticked, self.failures
        )
    }
}

impl StructuredLog for TurnCommitted {}

/// A continuation turn, enqueued by an observer during the outer turn's
/// commit phase, was scheduled to run next.
pub struct ContinuationScheduled {
    pub from_turn_id: u64,
}

impl fmt::Display for ContinuationScheduled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "continuation turn scheduled from turn {}",
            self.from_turn_id
        )
    }
}

impl StructuredLog for ContinuationScheduled {}
