// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::sync::Mutex;

use crate::errors::StructuralError;
use crate::observability::messages::graph as graph_msgs;
use crate::observability::messages::StructuredLog;

use super::{NodeId, NodeKind, TickResult};

/// Structural metadata for a node: everything the scheduler and graph need
/// that isn't the node's own recompute state.
///
/// `kind` is behind its own [`Mutex`] rather than sharing the arena's
/// structural lock: the parallel engine ticks distinct nodes concurrently
/// and only ever contends this mutex when two tasks race for the *same*
/// node, which the level barrier makes impossible. Structural fields
/// (`level`, `predecessors`, `successors`) change only under the arena's
/// write lock, during edge mutation, never during a tick.
pub struct NodeMeta {
    pub level: u32,
    pub last_turn_ticked: u64,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
    pub external_refs: u32,
    pub kind: Mutex<Box<dyn NodeKind>>,
}

struct Slot {
    generation: u32,
    meta: Option<NodeMeta>,
}

/// The arena backing every node bound to one [`crate::Domain`].
///
/// Attach/detach and re-leveling take `&mut self`; callers are expected to
/// hold the domain's structural write lock for the duration (see
/// `Domain::with_graph_mut`). Node lookups for value reads only need `&self`.
#[derive(Default)]
pub struct Storage {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

/// Context handed to [`NodeKind::tick`]: the turn id, this node's own id
/// (for `Observe`, which needs it to enqueue a commit-phase job tagged with
/// its own node for failure reporting), and a read-only view of the arena,
/// for nodes (`Lift`, `Fold`, ...) whose compute closures read predecessor
/// values through their own typed handles.
pub struct TickContext<'a> {
    pub turn_id: u64,
    pub node: NodeId,
    storage: &'a Storage,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(turn_id: u64, node: NodeId, storage: &'a Storage) -> Self {
        Self { turn_id, node, storage }
    }

    pub fn storage(&self) -> &Storage {
        self.storage
    }
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node with the given predecessors, computing its level
    /// as `1 + max(predecessor levels)` (0 if it has none). Predecessors are
    /// validated to already exist; this never fails due to cycles (a freshly
    /// allocated node cannot be anyone's predecessor yet).
    pub fn allocate(&mut self, kind: Box<dyn NodeKind>, predecessors: Vec<NodeId>) -> NodeId {
        let level = predecessors
            .iter()
            .filter_map(|p| self.meta(*p).map(|m| m.level))
            .max()
            .map(|max_pred_level| max_pred_level + 1)
            .unwrap_or(0);

        let meta = NodeMeta {
            level,
            last_turn_ticked: 0,
            predecessors: predecessors.clone(),
            successors: Vec::new(),
            external_refs: 1,
            kind: Mutex::new(kind),
        };

        let id = match self.free_list.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation += 1;
                slot.meta = Some(meta);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    meta: Some(meta),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };

        for pred in &predecessors {
            if let Some(pred_meta) = self.meta_mut(*pred) {
                pred_meta.successors.push(id);
            }
        }

        graph_msgs::NodeAllocated {
            node: id,
            level,
            predecessor_count: predecessors.len(),
        }
        .log();

        id
    }

    pub fn meta(&self, id: NodeId) -> Option<&NodeMeta> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.meta.as_ref())
    }

    pub fn meta_mut(&mut self, id: NodeId) -> Option<&mut NodeMeta> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.meta.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.meta(id).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.meta.is_some()).count()
    }

    /// Clear every node's per-turn transient state left over from the
    /// previous turn, ticked or not that turn — event buffers must not
    /// leak a value past the turn after the one that produced it just
    /// because their owning node happened to sit outside that turn's
    /// membership set. Called at the *start* of a turn, before staged
    /// writes are applied, so the previous turn's buffers stay readable
    /// right up until this one begins.
    pub fn end_turn_all(&self) {
        for slot in &self.slots {
            if let Some(meta) = &slot.meta {
                meta.kind.lock().expect("node mutex poisoned").end_turn();
            }
        }
    }

    /// Attach `predecessor` as a new dependency of `successor`. Performs the
    /// bounded re-leveling DFS from spec §4.1 when `level(predecessor) >=
    /// level(successor)`, rejecting the mutation if the walk discovers a
    /// cycle back to `predecessor`. The graph is left unchanged on error.
    pub fn attach(
        &mut self,
        predecessor: NodeId,
        successor: NodeId,
    ) -> Result<(), StructuralError> {
        if !self.contains(predecessor) || !self.contains(successor) {
            return Err(StructuralError::UnknownNode);
        }

        let pred_level = self.meta(predecessor).unwrap().level;
        let succ_level = self.meta(successor).unwrap().level;

        if pred_level >= succ_level {
            self.relevel_from(successor, pred_level + 1, predecessor)?;
        }

        self.meta_mut(predecessor).unwrap().successors.push(successor);
        self.meta_mut(successor)
            .unwrap()
            .predecessors
            .push(predecessor);

        graph_msgs::EdgeAttached {
            predecessor,
            successor,
        }
        .log();

        Ok(())
    }

    /// Detach a previously attached predecessor/successor edge. Errors if
    /// `predecessor` is not currently a predecessor of `successor`.
    pub fn detach(
        &mut self,
        predecessor: NodeId,
        successor: NodeId,
    ) -> Result<(), StructuralError> {
        let succ_meta = self
            .meta_mut(successor)
            .ok_or(StructuralError::UnknownNode)?;
        let pos = succ_meta
            .predecessors
            .iter()
            .position(|p| *p == predecessor)
            .ok_or(StructuralError::NotAPredecessor {
                node: successor,
                claimed_predecessor: predecessor,
            })?;
        succ_meta.predecessors.remove(pos);

        if let Some(pred_meta) = self.meta_mut(predecessor) {
            pred_meta.successors.retain(|s| *s != successor);
        }

        graph_msgs::EdgeDetached {
            predecessor,
            successor,
        }
        .log();

        Ok(())
    }

    /// Reclaim a node if it has no external handles and no successors left.
    /// Called after a handle drop or a detach; a no-op otherwise (Data Model
    /// "Ownership" invariant: a node is destroyed only when both conditions
    /// hold).
    pub fn collect(&mut self, id: NodeId) {
        let Some(meta) = self.meta(id) else { return };
        if meta.external_refs > 0 || !meta.successors.is_empty() {
            return;
        }

        let predecessors = meta.predecessors.clone();
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            slot.meta = None;
        }
        self.free_list.push(id.index);

        for pred in predecessors {
            if let Some(pred_meta) = self.meta_mut(pred) {
                pred_meta.successors.retain(|s| *s != id);
            }
            self.collect(pred);
        }
    }

    /// Bounded DFS lifting levels of `start` and everything reachable from
    /// it to at least `min_level`, failing if the walk revisits
    /// `forbidden` (the node that would become a cycle).
    fn relevel_from(
        &mut self,
        start: NodeId,
        min_level: u32,
        forbidden: NodeId,
    ) -> Result<(), StructuralError> {
        let mut stack = vec![(start, min_level)];
        let mut visited = HashSet::new();

        while let Some((node, required_level)) = stack.pop() {
            if node == forbidden {
                return Err(StructuralError::CycleDetected {
                    attempted_edge: (forbidden, start),
                });
            }
            if !visited.insert(node) {
                continue;
            }

            let meta = self.meta_mut(node).ok_or(StructuralError::UnknownNode)?;
            if meta.level >= required_level {
                continue;
            }
            meta.level = required_level;
            let successors = meta.successors.clone();
            for succ in successors {
                stack.push((succ, required_level + 1));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TickResult;

    struct NoopNode {
        predecessors: Vec<NodeId>,
    }

    impl NodeKind for NoopNode {
        fn tick(&mut self, _ctx: &TickContext) -> TickResult {
            TickResult::Unchanged
        }
        fn tag(&self) -> super::super::NodeTag {
            super::super::NodeTag::Var
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

    fn noop(storage: &mut Storage, preds: Vec<NodeId>) -> NodeId {
        storage.allocate(
            Box::new(NoopNode {
                predecessors: preds.clone(),
            }),
            preds,
        )
    }

    #[test]
    fn fresh_node_has_level_zero() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        assert_eq!(storage.meta(a).unwrap().level, 0);
    }

    #[test]
    fn level_is_one_plus_max_predecessor() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let b = noop(&mut storage, vec![a]);
        assert_eq!(storage.meta(b).unwrap().level, 1);
    }

    #[test]
    fn attach_relevels_when_predecessor_outranks_successor() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let b = noop(&mut storage, vec![]);
        // b currently level 0, same as a; attaching a -> b must lift b above a.
        storage.attach(a, b).unwrap();
        assert!(storage.meta(b).unwrap().level > storage.meta(a).unwrap().level);
    }

    #[test]
    fn attach_rejects_cycle() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let b = noop(&mut storage, vec![a]);
        let err = storage.attach(b, a).unwrap_err();
        assert!(matches!(err, StructuralError::CycleDetected { .. }));
        // Graph unchanged: a has no predecessors, b's predecessor list untouched.
        assert!(storage.meta(a).unwrap().predecessors.is_empty());
        assert_eq!(storage.meta(b).unwrap().predecessors, vec![a]);
    }

    #[test]
    fn detach_rejects_non_predecessor() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let b = noop(&mut storage, vec![]);
        let err = storage.detach(a, b).unwrap_err();
        assert!(matches!(err, StructuralError::NotAPredecessor { .. }));
    }

    #[test]
    fn collect_reclaims_unreferenced_chain() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let b = noop(&mut storage, vec![a]);
        storage.meta_mut(b).unwrap().external_refs = 0;
        storage.meta_mut(a).unwrap().external_refs = 0;
        storage.collect(b);
        assert!(!storage.contains(b));
        assert!(!storage.contains(a));
    }

    #[test]
    fn collect_keeps_node_with_live_successor() {
        let mut storage = Storage::new();
        let a = noop(&mut storage, vec![]);
        let _b = noop(&mut storage, vec![a]);
        storage.meta_mut(a).unwrap().external_refs = 0;
        storage.collect(a);
        assert!(storage.contains(a));
    }
}
