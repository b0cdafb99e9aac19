// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`fold`]: a signal whose value is the left fold of an event stream's
//! per-turn buffer over an accumulator, combining [`crate::nodes::lift`]'s
//! "cached value, pure recompute, compared by `Equality`" shape with
//! [`crate::nodes::merge`]'s "read predecessor buffer" access pattern — the
//! two building blocks the teacher's own multi-predecessor
//! `collectors::*` functions compose from.

use std::any::Any;
use std::sync::Arc;

use crate::change::{ChangeResult, Equality, StructuralEquality};
use crate::domain::Domain;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::{EventStream, Signal};

pub(crate) struct FoldNode<S, A> {
    source: Box<dyn Fn() -> Vec<A> + Send + Sync>,
    step: Box<dyn Fn(&S, &A) -> S + Send + Sync>,
    state: S,
    equality: Box<dyn Equality<S>>,
    predecessors: Vec<NodeId>,
}

impl<S: Send + Sync + 'static, A: Send + Sync + 'static> NodeKind for FoldNode<S, A> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let events = (self.source)();
        if events.is_empty() {
            return TickResult::Unchanged;
        }
        let mut next = &self.state;
        let mut accumulated = None;
        for event in &events {
            let stepped = (self.step)(next, event);
            accumulated = Some(stepped);
            next = accumulated.as_ref().unwrap();
        }
        let new_state = accumulated.expect("fold buffer was non-empty");
        let changed = ChangeResult::from_bool(!self.equality.eq(&self.state, &new_state));
        self.state = new_state;
        if changed.is_changed() {
            TickResult::Changed
        } else {
            TickResult::Unchanged
        }
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Fold
    }

    fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Fold `source`'s per-turn event buffer into a running `Signal<S>`,
/// starting at `initial` and applying `step(state, event)` left-to-right
/// for every event buffered this turn (spec §4.8's "new value =
/// `F(state, event)` per event in buffer"). A panic inside `step` leaves
/// the accumulator at its last-good state and surfaces as
/// [`crate::CallbackFailure::Fold`], per spec §7.
pub fn fold<S, A, F>(domain: &Domain, source: &EventStream<A>, initial: S, step: F) -> Signal<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    F: Fn(&S, &A) -> S + Send + Sync + 'static,
{
    fold_with_equality(domain, source, initial, step, Box::new(StructuralEquality))
}

/// Like [`fold`], but with a caller-supplied equality comparator on the
/// accumulator type.
pub fn fold_with_equality<S, A, F>(
    domain: &Domain,
    source: &EventStream<A>,
    initial: S,
    step: F,
    equality: Box<dyn Equality<S>>,
) -> Signal<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    F: Fn(&S, &A) -> S + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let deps = vec![source.id()];
    let captured_source = source.clone();

    let node = FoldNode {
        source: Box::new(move || captured_source.events()),
        step: Box::new(step),
        state: initial,
        equality,
        predecessors: deps.clone(),
    };
    let id = inner.allocate(Box::new(node), deps);
    let reader: Arc<dyn Fn(&dyn Any) -> S + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<FoldNode<S, A>>()
            .expect("Signal handle pointed at a non-Fold node")
            .state
            .clone()
    });
    Signal::new(id, inner, reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::turn::TransactionMode;

    #[test]
    fn fold_accumulates_across_turns() {
        let domain = Domain::new(DomainConfig::sequential());
        let clicks = domain.event_source::<i32>();
        let total = fold(&domain, &clicks.as_stream(), 0i64, |state, event| state + *event as i64);
        assert_eq!(total.get(), 0);

        domain.transaction(TransactionMode::Sync, {
            let clicks = clicks;
            move |txn| {
                clicks.emit(txn, 3);
                clicks.emit(txn, 4);
            }
        });
        assert_eq!(total.get(), 7);
    }

    #[test]
    fn fold_is_unchanged_on_empty_turn_buffer() {
        let domain = Domain::new(DomainConfig::sequential());
        let clicks = domain.event_source::<i32>();
        let other = domain.var(0i64);
        let total = fold(&domain, &clicks.as_stream(), 0i64, |state, event| state + *event as i64);

        let other_clone = other;
        domain.transaction(TransactionMode::Sync, move |txn| {
            other_clone.set(txn, 1);
        });
        assert_eq!(total.get(), 0);
    }
}
