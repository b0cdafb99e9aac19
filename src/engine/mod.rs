// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The two engine implementations that drive a turn's propagation phase to
//! quiescence (spec §4.5, §4.6): [`sequential::SequentialEngine`], a
//! deterministic single-threaded reference oracle, and
//! [`parallel::ParallelEngine`], a `tokio`-task worker pool enforcing a
//! level barrier. Both implement [`Engine`] and are interchangeable behind
//! a `Domain`.

pub mod parallel;
pub mod sequential;

use std::sync::{Arc, RwLock};

use crate::graph::{NodeId, Storage};
use crate::turn::TurnFailure;

/// Drives the scheduler for one turn's dirty-root set to quiescence.
/// Implementations lock `storage` themselves: the sequential engine holds
/// the write lock for the whole turn (ticks never mutate structure except
/// through `DynamicReattach`, handled internally); the parallel engine holds
/// only brief read-lock critical sections per node tick, serialized against
/// structural mutation by the same lock.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    async fn run_turn(
        &self,
        storage: &Arc<RwLock<Storage>>,
        turn_id: u64,
        dirty_roots: Vec<NodeId>,
    ) -> (usize, Vec<TurnFailure>);
}

/// Tick a single non-`Var` node, applying its `NodeKind::tick`, translating
/// a panic inside a user closure into a `CallbackFailure`, and handling a
/// `DynamicReattach` result by reconciling the node's predecessor edges
/// before reporting back to the scheduler (spec §4.4 step 4).
///
/// Returns `(changed, ran, failure)`: `ran` is `true` only when the node's
/// recompute function was actually invoked (a `Var` root being reported, or
/// a forced tick), and `false` for a minimality skip (`force` was `false`,
/// spec §4.4 step 3) — callers use `ran` rather than `changed` to count
/// `TurnReport::nodes_ticked`, since a skipped node never ran its callback
/// regardless of how it's scheduled.
pub(crate) fn tick_node(
    storage: &Arc<RwLock<Storage>>,
    node: NodeId,
    turn_id: u64,
    force: bool,
) -> (bool, bool, Option<TurnFailure>) {
    use crate::errors::CallbackFailure;
    use crate::graph::{NodeTag, TickContext, TickResult};
    use crate::observability::messages::{engine as engine_msgs, StructuredLog};

    let guard = storage.read().expect("storage lock poisoned");
    let Some(meta) = guard.meta(node) else {
        return (false, false, None);
    };
    let tag = meta.kind.lock().expect("node mutex poisoned").tag();
    if tag == NodeTag::Var {
        return (true, true, None);
    }
    if !force {
        // Predecessors finished but none changed: update-minimality skip.
        return (false, false, None);
    }

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut kind = meta.kind.lock().expect("node mutex poisoned");
        let ctx = TickContext::new(turn_id, node, &guard);
        kind.tick(&ctx)
    }));

    match outcome {
        Ok(TickResult::Changed) => (true, true, None),
        Ok(TickResult::Unchanged) => (false, true, None),
        Ok(TickResult::DynamicReattach) => {
            drop(guard);
            reconcile_reattach(storage, node);
            (true, true, None)
        }
        Err(panic) => {
            let message = panic_message(&panic);
            engine_msgs::CallbackFailed { turn_id, message: message.clone() }.log();
            if tag == NodeTag::Observe {
                let failure = crate::errors::ObserverFailure::Panicked { node, message };
                return (false, true, Some(TurnFailure::Observer(failure)));
            }
            let failure = match tag {
                NodeTag::Fold => CallbackFailure::Fold { node, message },
                NodeTag::Map | NodeTag::Filter | NodeTag::Merge => {
                    CallbackFailure::Map { node, message }
                }
                _ => CallbackFailure::Lift { node, message },
            };
            (false, true, Some(TurnFailure::Callback(failure)))
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked with a non-string payload".to_string()
    }
}

/// Reconcile a node's arena edges after it reported `DynamicReattach`:
/// detach predecessors no longer in its reported set, attach new ones, and
/// let `Storage::attach`'s re-leveling keep level monotonicity.
fn reconcile_reattach(storage: &Arc<RwLock<Storage>>, node: NodeId) {
    let reported: Vec<NodeId> = {
        let guard = storage.read().expect("storage lock poisoned");
        let Some(meta) = guard.meta(node) else {
            return;
        };
        let kind = meta.kind.lock().expect("node mutex poisoned");
        kind.predecessors().to_vec()
    };

    let mut guard = storage.write().expect("storage lock poisoned");
    let Some(meta) = guard.meta(node) else {
        return;
    };
    let previous = meta.predecessors.clone();

    for old_pred in previous.iter().filter(|p| !reported.contains(p)) {
        let _ = guard.detach(*old_pred, node);
    }
    for new_pred in reported.iter().filter(|p| !previous.contains(p)) {
        let _ = guard.attach(*new_pred, node);
    }
}
