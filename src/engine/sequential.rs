// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The deterministic reference engine (spec §4.5): ticks one node at a
//! time, lowest level first, FIFO within a level. No concurrency, no
//! barrier — used both as the default for small/latency-sensitive domains
//! and as the oracle `engine::parallel` is checked against.

use std::sync::{Arc, RwLock};

use crate::graph::{NodeId, Storage};
use crate::scheduler::{Membership, ReadySet};
use crate::turn::TurnFailure;

use super::{tick_node, Engine};

#[derive(Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Engine for SequentialEngine {
    async fn run_turn(
        &self,
        storage: &Arc<RwLock<Storage>>,
        turn_id: u64,
        dirty_roots: Vec<NodeId>,
    ) -> (usize, Vec<TurnFailure>) {
        let mut failures = Vec::new();
        let mut ticked = 0usize;

        let mut membership = {
            let guard = storage.read().expect("storage lock poisoned");
            Membership::build(&guard, &dirty_roots)
        };
        let mut ready = ReadySet::new();
        for node in membership.initially_ready() {
            ready.push(membership.level_of(node), node);
        }

        while let Some(node) = ready.pop_one() {
            let force = membership.should_force_tick(node);
            let (changed, ran, failure) = tick_node(storage, node, turn_id, force);
            if ran {
                ticked += 1;
            }
            if let Some(failure) = failure {
                failures.push(failure);
            }

            let guard = storage.read().expect("storage lock poisoned");
            if membership.reconcile_dynamic(&guard, node) {
                ready.push(membership.level_of(node), node);
            }
            for successor in membership.record_completion(&guard, node, changed) {
                ready.push(membership.level_of(successor), successor);
            }
        }

        (ticked, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, NodeTag, TickContext, TickResult};

    struct CountingVar {
        value: i64,
    }
    impl NodeKind for CountingVar {
        fn tick(&mut self, _ctx: &TickContext) -> TickResult {
            TickResult::Changed
        }
        fn tag(&self) -> NodeTag {
            NodeTag::Var
        }
        fn predecessors(&self) -> &[NodeId] {
            &[]
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    struct Doubler {
        source: NodeId,
        preds: Vec<NodeId>,
    }
    impl NodeKind for Doubler {
        fn tick(&mut self, _ctx: &TickContext) -> TickResult {
            TickResult::Changed
        }
        fn tag(&self) -> NodeTag {
            NodeTag::Lift
        }
        fn predecessors(&self) -> &[NodeId] {
            &self.preds
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[tokio::test]
    async fn ticks_chain_once_each() {
        let mut storage = Storage::new();
        let a = storage.allocate(Box::new(CountingVar { value: 1 }), vec![]);
        let b = storage.allocate(
            Box::new(Doubler {
                source: a,
                preds: vec![a],
            }),
            vec![a],
        );
        let storage = Arc::new(RwLock::new(storage));

        let engine = SequentialEngine::new();
        let (ticked, failures) = engine.run_turn(&storage, 1, vec![a]).await;
        assert!(failures.is_empty());
        assert_eq!(ticked, 2);
        let _ = b;
    }
}
