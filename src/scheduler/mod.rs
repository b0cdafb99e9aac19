// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The topological scheduler: decides, for a single turn, which nodes need
//! to be ticked and in what order, while preserving update minimality and
//! glitch freedom (spec §4.4).
//!
//! The algorithm runs in two passes over a *membership* set — the nodes
//! forward-reachable from this turn's dirty roots — rather than the whole
//! graph, so an engine never pays for nodes a turn couldn't possibly affect:
//!
//! 1. **Reachability pass**: BFS from the dirty roots along successor edges
//!    to find the membership set, and for each member, how many of its
//!    *membership* predecessors must finish before it can run.
//! 2. **Drain**: pop nodes whose remaining count has hit zero, tick them
//!    (skipping the callback entirely if none of their predecessors actually
//!    changed — this is where minimality happens), and decrement their
//!    successors' remaining counts.
//!
//! `Scheduler` only tracks *what's ready*; engines (`engine::sequential`,
//! `engine::parallel`) own the loop that pops from it and performs the tick.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::graph::{NodeId, Storage};
use crate::observability::messages::scheduler as scheduler_msgs;
use crate::observability::messages::StructuredLog;

struct NodeProgress {
    remaining: u32,
    any_pred_changed: bool,
}

/// The set of nodes a turn's dirty roots can reach, with per-node
/// dependency counts used to detect readiness.
pub struct Membership {
    progress: HashMap<NodeId, NodeProgress>,
    levels: HashMap<NodeId, u32>,
    forced: HashSet<NodeId>,
}

impl Membership {
    /// Build the membership set and initial readiness for `dirty_roots`:
    /// every predecessor-input or every node an async merge coalesced into
    /// this turn's staged change set.
    pub fn build(storage: &Storage, dirty_roots: &[NodeId]) -> Self {
        let mut reachable: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = dirty_roots.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !reachable.insert(node) {
                continue;
            }
            if let Some(meta) = storage.meta(node) {
                for succ in &meta.successors {
                    queue.push_back(*succ);
                }
            }
        }

        let mut progress = HashMap::with_capacity(reachable.len());
        let mut levels = HashMap::with_capacity(reachable.len());
        for node in &reachable {
            let meta = storage.meta(*node).expect("membership node must exist");
            levels.insert(*node, meta.level);
            let remaining = meta
                .predecessors
                .iter()
                .filter(|p| reachable.contains(p))
                .count() as u32;
            progress.insert(
                *node,
                NodeProgress {
                    remaining,
                    any_pred_changed: false,
                },
            );
        }

        Self {
            progress,
            levels,
            forced: dirty_roots.iter().copied().collect(),
        }
    }

    /// Every member currently at `remaining == 0`: ready to be ticked (or,
    /// if it is not a dirty root and no predecessor reported a change,
    /// skipped and treated as `Unchanged` without invoking its callback).
    pub fn initially_ready(&self) -> Vec<NodeId> {
        self.progress
            .iter()
            .filter(|(_, p)| p.remaining == 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn should_force_tick(&self, node: NodeId) -> bool {
        self.forced.contains(&node) || self.progress.get(&node).is_some_and(|p| p.any_pred_changed)
    }

    pub fn level_of(&self, node: NodeId) -> u32 {
        *self.levels.get(&node).unwrap_or(&0)
    }

    /// Record that `node` finished ticking with the given changed-ness, and
    /// return every successor that became ready as a result (remaining hit
    /// zero). `changed` propagates to each successor's `any_pred_changed`.
    pub fn record_completion(
        &mut self,
        storage: &Storage,
        node: NodeId,
        changed: bool,
    ) -> Vec<NodeId> {
        let mut newly_ready = Vec::new();
        let Some(meta) = storage.meta(node) else {
            return newly_ready;
        };
        for succ in meta.successors.clone() {
            if let Some(p) = self.progress.get_mut(&succ) {
                if changed {
                    p.any_pred_changed = true;
                }
                debug_assert!(p.remaining > 0);
                p.remaining = p.remaining.saturating_sub(1);
                if p.remaining == 0 {
                    newly_ready.push(succ);
                }
            }
        }
        newly_ready
    }

    /// Incorporate a node whose predecessor set changed mid-turn
    /// (`TickResult::DynamicReattach`, spec §4.4 step 4): recompute its
    /// remaining count against the (already-reconciled) new predecessor
    /// list and its refreshed level, returning `true` if it is immediately
    /// ready again.
    pub fn reconcile_dynamic(&mut self, storage: &Storage, node: NodeId) -> bool {
        let Some(meta) = storage.meta(node) else {
            return false;
        };
        self.levels.insert(node, meta.level);
        let remaining = meta
            .predecessors
            .iter()
            .filter(|p| self.progress.contains_key(p) || self.forced.contains(p))
            .count() as u32;
        let entry = self.progress.entry(node).or_insert(NodeProgress {
            remaining: 0,
            any_pred_changed: true,
        });
        entry.remaining = remaining;
        entry.any_pred_changed = true;
        scheduler_msgs::DynamicReattachHandled {
            turn_id: 0,
            new_level: meta.level,
        }
        .log();
        entry.remaining == 0
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }
}

/// A level-bucketed queue of nodes ready to tick, ordered ascending by
/// level and FIFO within a level (spec §4.4's stated tie-break).
#[derive(Default)]
pub struct ReadySet {
    levels: BTreeMap<u32, VecDeque<NodeId>>,
}

impl ReadySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: u32, node: NodeId) {
        self.levels.entry(level).or_default().push_back(node);
    }

    /// Pop the single lowest-level, earliest-queued node (sequential
    /// engine's draining order).
    pub fn pop_one(&mut self) -> Option<NodeId> {
        let (&level, queue) = self.levels.iter_mut().next()?;
        let node = queue.pop_front();
        if queue.is_empty() {
            self.levels.remove(&level);
        }
        node
    }

    /// Pop every node currently queued at the lowest level, as one batch
    /// (parallel engine's level-barrier draining order).
    pub fn pop_level(&mut self) -> Option<(u32, Vec<NodeId>)> {
        let &level = self.levels.keys().next()?;
        let queue = self.levels.remove(&level).unwrap_or_default();
        Some((level, queue.into_iter().collect()))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, NodeTag, TickContext, TickResult};

    struct NoopNode {
        predecessors: Vec<NodeId>,
    }
    impl NodeKind for NoopNode {
        fn tick(&mut self, _ctx: &TickContext) -> TickResult {
            TickResult::Changed
        }
        fn tag(&self) -> NodeTag {
            NodeTag::Var
        }
        fn predecessors(&self) -> &[NodeId] {
            &self.predecessors
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn node(storage: &mut Storage, preds: Vec<NodeId>) -> NodeId {
        storage.allocate(
            Box::new(NoopNode {
                predecessors: preds.clone(),
            }),
            preds,
        )
    }

    #[test]
    fn diamond_membership_ready_order() {
        let mut storage = Storage::new();
        let a = node(&mut storage, vec![]);
        let b = node(&mut storage, vec![a]);
        let c = node(&mut storage, vec![a]);
        let d = node(&mut storage, vec![b, c]);

        let mut membership = Membership::build(&storage, &[a]);
        let initial = membership.initially_ready();
        assert_eq!(initial, vec![a]);

        let ready_after_a = membership.record_completion(&storage, a, true);
        let mut sorted = ready_after_a.clone();
        sorted.sort_by_key(|n| n.index);
        assert_eq!(sorted, vec![b, c]);

        let ready_after_b = membership.record_completion(&storage, b, true);
        assert!(ready_after_b.is_empty());
        let ready_after_c = membership.record_completion(&storage, c, true);
        assert_eq!(ready_after_c, vec![d]);
    }

    #[test]
    fn ready_set_drains_level_order() {
        let mut ready = ReadySet::new();
        ready.push(1, NodeId { index: 2, generation: 0 });
        ready.push(0, NodeId { index: 0, generation: 0 });
        ready.push(0, NodeId { index: 1, generation: 0 });

        let (level, batch) = ready.pop_level().unwrap();
        assert_eq!(level, 0);
        assert_eq!(batch.len(), 2);
        let (level, batch) = ready.pop_level().unwrap();
        assert_eq!(level, 1);
        assert_eq!(batch.len(), 1);
        assert!(ready.is_empty());
    }
}
