// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by graph structure mutation (`attach`/`detach`), surfaced to
/// the caller rather than swallowed as an "internal" error: rejecting a cycle
/// is a caller mistake, not an engine bug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("attaching {attempted_edge:?} would create a cycle")]
    CycleDetected { attempted_edge: (NodeId, NodeId) },

    #[error("{claimed_predecessor:?} is not a predecessor of {node:?}")]
    NotAPredecessor {
        node: NodeId,
        claimed_predecessor: NodeId,
    },

    #[error("node belongs to a different domain than this operation's target")]
    CrossDomainAttach,

    #[error("node id does not refer to a live node in this domain")]
    UnknownNode,
}

/// A user-supplied recompute closure (`lift`, `fold`, `map`) failed during a
/// tick. Carries the node whose closure failed and its panic/error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackFailure {
    #[error("lift closure on {node:?} failed: {message}")]
    Lift { node: NodeId, message: String },

    #[error("fold closure on {node:?} failed: {message}")]
    Fold { node: NodeId, message: String },

    #[error("map closure on {node:?} failed: {message}")]
    Map { node: NodeId, message: String },
}

/// An observer callback panicked. Isolated from the turn's propagation: the
/// observer that panicked is skipped, every other observer still runs, and
/// the failure is recorded in the turn's `TurnReport` rather than aborting
/// the turn (spec's "observer failures are isolated" policy).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverFailure {
    #[error("observer on {node:?} panicked: {message}")]
    Panicked { node: NodeId, message: String },
}

/// Top-level error a `Domain::transaction` call can return.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("domain is poisoned and refuses further transactions: {reason}")]
    DomainPoisoned { reason: String },
}
