// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::graph::NodeId;

use super::StructuredLog;

/// A node was allocated into the arena.
pub struct NodeAllocated {
    pub node: NodeId,
    pub level: u32,
    pub predecessor_count: usize,
}

impl fmt::Display for NodeAllocated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated {:?} at level {} with {} predecessor(s)",
            self.node, self.level, self.predecessor_count
        )
    }
}

impl StructuredLog for NodeAllocated {}

/// A predecessor/successor edge was attached.
pub struct EdgeAttached {
    pub predecessor: NodeId,
    pub successor: NodeId,
}

impl fmt::Display for EdgeAttached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attached {:?} -> {:?}", self.predecessor, self.successor)
    }
}

impl StructuredLog for EdgeAttached {}

/// A predecessor/successor edge was detached.
pub struct EdgeDetached {
    pub predecessor: NodeId,
    pub successor: NodeId,
}

impl fmt::Display for EdgeDetached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detached {:?} -> {:?}", self.predecessor, self.successor)
    }
}

impl StructuredLog for EdgeDetached {}

/// A structural mutation was rejected because it would have introduced a
/// cycle.
pub struct CycleRejected {
    pub predecessor: NodeId,
    pub successor: NodeId,
}

impl fmt::Display for CycleRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rejected attaching {:?} -> {:?}: would create a cycle",
            self.predecessor, self.successor
        )
    }
}

impl StructuredLog for CycleRejected {
    fn log(&self) {
        tracing::warn!("{}", self);
    }
}
