// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use super::StructuredLog;

/// The parallel engine's worker pool was sized for a domain.
pub struct WorkerPoolSized {
    pub worker_count: usize,
}

impl fmt::Display for WorkerPoolSized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parallel engine sized to {} worker(s)", self.worker_count)
    }
}

impl StructuredLog for WorkerPoolSized {}

/// A level barrier was admitted: every task in the previous level has been
/// joined and the next level's tasks are about to be spawned.
pub struct LevelBarrierAdmitted {
    pub turn_id: u64,
    pub level: u32,
    pub node_count: usize,
}

impl fmt::Display for LevelBarrierAdmitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {}: level {} admitted with {} node(s)",
            self.turn_id, self.level, self.node_count
        )
    }
}

impl StructuredLog for LevelBarrierAdmitted {}

/// A callback failure occurred during a tick; recorded but does not stop
/// propagation of unrelated branches.
pub struct CallbackFailed {
    pub turn_id: u64,
    pub message: String,
}

impl fmt::Display for CallbackFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn {}: callback failed: {}", self.turn_id, self.message)
    }
}

impl StructuredLog for CallbackFailed {
    fn log(&self) {
        tracing::warn!("{}", self);
    }
}
