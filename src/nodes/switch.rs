// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`switch`]: a computed signal that may change which of its inputs it
//! reads between turns (spec §9: "a `Lift` that switches which upstream
//! signal it reads, for example"; spec §8 scenario 4, "dynamic switch").
//!
//! Tagged [`NodeTag::Lift`] like an ordinary [`crate::nodes::lift::lift`]
//! node — from the scheduler's point of view it is one, just one whose
//! compute closure also reports this turn's predecessor set, triggering
//! [`TickResult::DynamicReattach`] whenever that set differs from the last
//! tick's.

use std::any::Any;
use std::sync::Arc;

use crate::change::{ChangeResult, Equality, StructuralEquality};
use crate::domain::Domain;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::Signal;

pub(crate) struct SwitchNode<T> {
    compute: Box<dyn Fn() -> (T, Vec<NodeId>) + Send + Sync>,
    value: T,
    equality: Box<dyn Equality<T>>,
    predecessors: Vec<NodeId>,
}

impl<T: Send + Sync + 'static> NodeKind for SwitchNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let (new_value, new_predecessors) = (self.compute)();
        let reattached = new_predecessors != self.predecessors;
        let changed = ChangeResult::from_bool(!self.equality.eq(&self.value, &new_value));
        self.value = new_value;
        self.predecessors = new_predecessors;

        if reattached {
            TickResult::DynamicReattach
        } else if changed.is_changed() {
            TickResult::Changed
        } else {
            TickResult::Unchanged
        }
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Lift
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

/// A signal that reads `a` or `b` depending on `sel`'s current value, as
/// decided by `choose_a`. Switching branches detaches the previously-active
/// one and attaches the newly-active one (spec §8 scenario 4): a later
/// change to the now-detached branch alone does not tick this signal, only a
/// change to `sel` or the currently-attached branch does.
pub fn switch<S, T>(
    domain: &Domain,
    sel: &Signal<S>,
    a: &Signal<T>,
    b: &Signal<T>,
    choose_a: impl Fn(&S) -> bool + Send + Sync + 'static,
) -> Signal<T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    switch_with_equality(domain, sel, a, b, choose_a, Box::new(StructuralEquality))
}

/// Like [`switch`], but with a caller-supplied equality comparator.
pub fn switch_with_equality<S, T>(
    domain: &Domain,
    sel: &Signal<S>,
    a: &Signal<T>,
    b: &Signal<T>,
    choose_a: impl Fn(&S) -> bool + Send + Sync + 'static,
    equality: Box<dyn Equality<T>>,
) -> Signal<T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let sel_handle = sel.clone();
    let a_handle = a.clone();
    let b_handle = b.clone();
    let sel_id = sel.id();
    let a_id = a.id();
    let b_id = b.id();

    let compute = move || {
        let use_a = choose_a(&sel_handle.get());
        if use_a {
            (a_handle.get(), vec![sel_id, a_id])
        } else {
            (b_handle.get(), vec![sel_id, b_id])
        }
    };

    let (initial_value, initial_predecessors) = compute();
    let node = SwitchNode {
        compute: Box::new(compute),
        value: initial_value,
        equality,
        predecessors: initial_predecessors.clone(),
    };
    let id = inner.allocate(Box::new(node), initial_predecessors);
    let reader: Arc<dyn Fn(&dyn Any) -> T + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<SwitchNode<T>>()
            .expect("Signal handle pointed at a non-Switch node")
            .value
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
    fn dynamic_switch_scenario() {
        let domain = Domain::new(DomainConfig::sequential());
        let sel = domain.var(true); // true => read `a`
        let a = domain.var(1i64);
        let b = domain.var(100i64);

        let sel_signal = sel.as_signal();
        let out = switch(&domain, &sel_signal, &a.as_signal(), &b.as_signal(), |s| *s);
        assert_eq!(out.get(), 1);

        // Changing `b` alone while `a` is active must not tick `out`: the
        // only node reachable from `b` is `b` itself, since `out` is not
        // currently attached to it.
        let outcome = domain.transaction(TransactionMode::Sync, |txn| {
            b.set(txn, 200);
        });
        match outcome {
            crate::domain::TransactionOutcome::Report(Ok(report)) => {
                assert_eq!(report.nodes_ticked, 1);
            }
            _ => panic!("expected a synchronous report"),
        }
        assert_eq!(out.get(), 1);

        // Flipping `sel` detaches `a`, attaches `b`; `out` reads `b`'s
        // already-updated value immediately.
        domain.transaction(TransactionMode::Sync, |txn| {
            sel.set(txn, false);
        });
        assert_eq!(out.get(), 200);

        // `a` is now detached: changing it alone must not tick `out`.
        domain.transaction(TransactionMode::Sync, |txn| {
            a.set(txn, 999);
        });
        assert_eq!(out.get(), 200);

        // The next change of the now-active branch `b` does propagate.
        domain.transaction(TransactionMode::Sync, |txn| {
            b.set(txn, 300);
        });
        assert_eq!(out.get(), 300);
    }
}
