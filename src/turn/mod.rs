// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns and transactions (spec §4.3): the atomic unit of propagation.
//!
//! A turn runs in four steps, each a named private method on [`Turn`] for
//! testability (mirroring the teacher's `execute_level`/
//! `build_processor_input` decomposition style):
//!
//! 1. `apply_staged` — swap every staged input value into its `Var`, via the
//!    canonical-payload pattern: one arbitrated value per node, mutated only
//!    while this turn holds it, read by every downstream participant only
//!    after this step completes.
//! 2. `propagate` — hand the resulting dirty roots to the engine, which
//!    drains the scheduler to quiescence.
//! 3. `run_commit_queue` — drain deferred observer-registered closures in
//!    registration order.
//! 4. `advance` — bump the domain's turn counter.

use std::sync::Mutex;

use crate::errors::{CallbackFailure, ObserverFailure};
use crate::events::{CommitQueue, PendingTurn};
use crate::graph::{NodeId, Storage};
use crate::observability::messages::turn as turn_msgs;
use crate::observability::messages::StructuredLog;

/// How a transaction's commit is driven relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// The calling thread blocks until the turn has fully committed.
    #[default]
    Sync,
    /// The turn runs on the domain's engine; the caller gets a
    /// [`crate::domain::TransactionHandle`] to await the result.
    Async,
    /// Like `Async`, but if another transaction is already staged and not
    /// yet committed when this one arrives, their staged changes are
    /// coalesced into a single commit (`MergePolicy::Adjacent`).
    Merged,
}

/// One participant in a [`TurnReport`]'s failure list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    Callback(CallbackFailure),
    Observer(ObserverFailure),
}

impl std::fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnFailure::Callback(c) => write!(f, "{c}"),
            TurnFailure::Observer(o) => write!(f, "{o}"),
        }
    }
}

/// The outcome of one committed turn: how many nodes actually ran their
/// recompute function (reachable members the scheduler skipped under
/// update-minimality, because none of their predecessors changed, are not
/// counted), and every callback/observer failure that occurred, isolated
/// rather than aborting propagation of unrelated branches (spec §7).
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    pub turn_id: u64,
    pub nodes_ticked: usize,
    pub failures: Vec<TurnFailure>,
}

impl TurnReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single staged input write, collected while a transaction's body runs
/// and applied atomically at commit. The closure captures the concrete
/// `Var<T>`'s downcast and equality check so `StagedChanges` itself stays
/// free of the node's value type.
pub struct StagedWrite {
    pub node: NodeId,
    pub apply: Box<dyn FnOnce(&Storage) -> bool + Send>,
}

/// Handed to a transaction's body closure; `Var::set` stages its write here
/// rather than mutating the node directly, so every write in the body
/// becomes visible atomically at commit.
#[derive(Default)]
pub struct Transaction {
    staged: Mutex<Vec<StagedWrite>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stage(&self, write: StagedWrite) {
        self.staged.lock().expect("transaction mutex poisoned").push(write);
    }

    /// Move every write staged in `self` into `target`, for `Merged`-mode
    /// coalescing of an adjacent transaction into one still-pending commit.
    pub(crate) fn drain_into(self, target: &Transaction) {
        let writes = self.into_writes();
        target
            .staged
            .lock()
            .expect("transaction mutex poisoned")
            .extend(writes);
    }

    fn into_writes(self) -> Vec<StagedWrite> {
        self.staged.into_inner().expect("transaction mutex poisoned")
    }
}

/// Drives one turn's four-step commit. The actual propagation (step 2) is
/// delegated to whichever engine the domain is configured with; `Turn` only
/// owns the steps around it.
pub struct Turn {
    pub id: u64,
}

impl Turn {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Step 1: apply every staged write, returning the node ids whose value
    /// actually changed (the dirty roots step 2 propagates from).
    pub fn apply_staged(&self, storage: &Storage, txn: Transaction) -> Vec<NodeId> {
        let writes = txn.into_writes();
        turn_msgs::TurnStarted {
            turn_id: self.id,
            staged_changes: writes.len(),
        }
        .log();

        writes
            .into_iter()
            .filter_map(|write| {
                let changed = (write.apply)(storage);
                changed.then_some(write.node)
            })
            .collect()
    }

    /// Step 3: drain the commit-phase queue, in registration order,
    /// surfacing any isolated observer panics as turn failures.
    pub fn run_commit_queue(&self, queue: &mut CommitQueue) -> Vec<TurnFailure> {
        queue
            .drain()
            .into_iter()
            .map(TurnFailure::Observer)
            .collect()
    }

    pub fn report(self, nodes_ticked: usize, failures: Vec<TurnFailure>) -> TurnReport {
        turn_msgs::TurnCommitted {
            turn_id: self.id,
            nodes_ticked,
            failures: failures.len(),
        }
        .log();
        TurnReport {
            turn_id: self.id,
            nodes_ticked,
            failures,
        }
    }
}

pub use crate::events::ContinuationQueue;

pub fn announce_continuation(from_turn_id: u64) {
    turn_msgs::ContinuationScheduled { from_turn_id }.log();
}

pub fn continuation_turn(apply: Box<dyn FnOnce() + Send>) -> PendingTurn {
    PendingTurn { apply }
}
