// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Lift<T>`]: a computed signal — data plus a pure recompute closure over
//! already-typed upstream handles it has captured internally (spec §9's
//! "re-architect as explicit `lift(fn, inputs...)`").
//!
//! The closure itself never sees the graph: it reads its inputs through
//! whatever `Signal`/`EventStream` handles its caller captured, so `Lift`'s
//! `NodeKind` implementation stays free of generics over its predecessors'
//! types — only the constructor (`lift`) and the handle it returns are
//! generic over `T`.

use std::sync::Arc;

use crate::change::{ChangeResult, Equality, StructuralEquality};
use crate::domain::Domain;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::Signal;

pub(crate) struct LiftNode<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: T,
    equality: Box<dyn Equality<T>>,
    predecessors: Vec<NodeId>,
}

impl<T: Send + Sync + 'static> NodeKind for LiftNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let new_value = (self.compute)();
        let changed = ChangeResult::from_bool(!self.equality.eq(&self.value, &new_value));
        self.value = new_value;
        if changed.is_changed() {
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

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A computed signal: `compute` re-runs whenever any node in `deps` ticks
/// with a changed value, reading its inputs through handles it captured by
/// closure rather than through `deps` itself (`deps` only wires the graph
/// edges; it is not consulted for values).
pub fn lift<T, F>(domain: &Domain, deps: &[NodeId], compute: F) -> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    lift_with_equality(domain, deps, compute, Box::new(StructuralEquality))
}

/// Like [`lift`], but with a caller-supplied equality comparator.
pub fn lift_with_equality<T, F>(
    domain: &Domain,
    deps: &[NodeId],
    compute: F,
    equality: Box<dyn Equality<T>>,
) -> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    lift_on_with_equality(domain.inner().clone(), deps, compute, equality)
}

/// Like [`lift`], but for call sites (the `Signal<T>` operator-sugar impls
/// in [`crate::nodes::handle`]) that already hold the domain's shared
/// inner state rather than a [`Domain`] handle.
pub(crate) fn lift_on<T, F>(
    domain: std::sync::Arc<crate::domain::DomainInner>,
    deps: &[NodeId],
    compute: F,
) -> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    lift_on_with_equality(domain, deps, compute, Box::new(StructuralEquality))
}

fn lift_on_with_equality<T, F>(
    inner: std::sync::Arc<crate::domain::DomainInner>,
    deps: &[NodeId],
    compute: F,
    equality: Box<dyn Equality<T>>,
) -> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let initial = compute();
    let node = LiftNode {
        compute: Box::new(compute),
        value: initial,
        equality,
        predecessors: deps.to_vec(),
    };
    let id = inner.allocate(Box::new(node), deps.to_vec());
    let reader: Arc<dyn Fn(&dyn std::any::Any) -> T + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<LiftNode<T>>()
            .expect("Signal handle pointed at a non-Lift node")
            .value
            .clone()
    });
    Signal::new(id, inner, reader)
}

/// Internal entry point for [`crate::Domain::signal`]; identical to
/// [`lift`], kept separate so the method can forward without re-exporting
/// the equality-customizing variant at the `Domain` level.
pub(crate) fn lift_raw<T, F>(domain: &Domain, deps: &[NodeId], compute: F) -> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    lift(domain, deps, compute)
}
