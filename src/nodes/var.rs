// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Var<T>`]: the input signal node kind — a value a caller writes into a
//! transaction, and every other node kind ultimately reads from, directly
//! or transitively.

use std::sync::Arc;

use crate::change::{ChangeResult, Equality, StructuralEquality};
use crate::domain::Domain;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::Signal;
use crate::turn::{StagedWrite, Transaction};

pub(crate) struct VarNode<T> {
    value: T,
    equality: Box<dyn Equality<T>>,
}

impl<T: Send + Sync + 'static> NodeKind for VarNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        // Var's value transitions happen in `Turn::apply_staged`, outside
        // the generic tick path (the engine never calls this for a `Var`
        // node — see `engine::tick_node`'s `NodeTag::Var` short-circuit).
        TickResult::Unchanged
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

/// A writable input signal.
pub struct Var<T> {
    signal: Signal<T>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Var<T> {
    /// Current value as of the last committed turn.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// A read-only [`Signal`] view of this input, for passing to `lift`,
    /// `fold`, or `Domain::observe` without exposing write access.
    pub fn as_signal(&self) -> Signal<T> {
        self.signal.clone()
    }

    pub fn id(&self) -> NodeId {
        self.signal.id()
    }

    /// Stage a new value, visible to the graph once `txn`'s transaction
    /// commits.
    pub fn set(&self, txn: &Transaction, value: T) {
        let node = self.signal.id;
        txn.stage(StagedWrite {
            node,
            apply: Box::new(move |storage| {
                let meta = storage.meta(node).expect("stale Var handle");
                let mut kind = meta.kind.lock().expect("node mutex poisoned");
                let var_node = kind
                    .as_any_mut()
                    .downcast_mut::<VarNode<T>>()
                    .expect("Var handle pointed at a non-Var node");
                let changed =
                    ChangeResult::from_bool(!var_node.equality.eq(&var_node.value, &value))
                        .is_changed();
                var_node.value = value;
                changed
            }),
        });
    }
}

/// Bind a new input signal to `domain` with an initial value, compared by
/// structural equality.
pub fn var<T>(domain: &Domain, initial: T) -> Var<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    var_with_equality(domain, initial, Box::new(StructuralEquality))
}

/// Like [`var`], but with a caller-supplied equality comparator (for types
/// whose `PartialEq` is unsuitable for change detection, e.g. floats that
/// should tolerate a small epsilon).
pub fn var_with_equality<T>(
    domain: &Domain,
    initial: T,
    equality: Box<dyn Equality<T>>,
) -> Var<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let node = VarNode {
        value: initial,
        equality,
    };
    let id = inner.allocate(Box::new(node), vec![]);
    let reader: Arc<dyn Fn(&dyn std::any::Any) -> T + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<VarNode<T>>()
            .expect("Signal handle pointed at a non-Var node")
            .value
            .clone()
    });
    Var {
        signal: Signal::new(id, inner, reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::turn::TransactionMode;

    #[test]
    fn set_and_commit_updates_value() {
        let domain = Domain::new(DomainConfig::sequential());
        let counter = domain.var(0i64);
        assert_eq!(counter.get(), 0);

        let counter_clone = Var {
            signal: counter.as_signal(),
        };
        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            counter_clone.set(txn, 5);
        });
        match outcome {
            crate::domain::TransactionOutcome::Report(Ok(report)) => assert!(report.is_ok()),
            _ => panic!("expected a synchronous report"),
        }
        assert_eq!(counter.get(), 5);
    }
}
