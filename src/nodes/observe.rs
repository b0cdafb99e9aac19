// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Observer`]: the sink node kind (spec §4.8). An observer never changes
//! and has no successors; ticking one does not run its callback inline —
//! it builds a commit-phase job (subject value captured, callback ready to
//! invoke) and hands it to the domain's [`crate::events::CommitQueue`] via
//! [`crate::domain::DomainInner::enqueue_commit_job`], so every observer's
//! side effect runs after propagation reaches quiescence, in
//! registration order (spec §4.7, P5).

use std::any::Any;
use std::sync::Arc;

use crate::domain::{Domain, DomainInner};
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::{EventStream, Signal};

pub(crate) struct ObserverNode {
    domain: Arc<DomainInner>,
    build_job: Box<dyn Fn() -> Box<dyn FnOnce() + Send> + Send + Sync>,
    predecessors: Vec<NodeId>,
}

impl NodeKind for ObserverNode {
    fn tick(&mut self, ctx: &TickContext) -> TickResult {
        let job = (self.build_job)();
        self.domain.enqueue_commit_job(ctx.node, job);
        TickResult::Unchanged
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Observe
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

/// A registered side-effect sink. Carries no reader of its own — its whole
/// job is to exist as a scheduled node so its subject's changes reach the
/// commit-phase queue; dropping the handle does not unregister it (the
/// engine does not support unobserving mid-domain, matching spec's silence
/// on observer teardown).
pub struct Observer {
    id: NodeId,
    #[allow(dead_code)]
    domain: Arc<DomainInner>,
}

impl Observer {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

/// Register `callback` to run, in commit order, whenever `signal` ticks
/// with a changed value.
pub fn observe_signal<T, F>(domain: &Domain, signal: &Signal<T>, callback: F) -> Observer
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let deps = vec![signal.id()];
    let captured_signal = signal.clone();
    let callback = Arc::new(callback);

    let build_job: Box<dyn Fn() -> Box<dyn FnOnce() + Send> + Send + Sync> = Box::new(move || {
        let value = captured_signal.get();
        let callback = callback.clone();
        Box::new(move || (callback)(&value)) as Box<dyn FnOnce() + Send>
    });

    let node = ObserverNode {
        domain: inner.clone(),
        build_job,
        predecessors: deps.clone(),
    };
    let id = inner.allocate(Box::new(node), deps);
    Observer { id, domain: inner }
}

/// Register `callback` to run, in commit order, with the events `stream`
/// buffered whenever it ticks with a non-empty buffer.
pub fn observe_events<T, F>(domain: &Domain, stream: &EventStream<T>, callback: F) -> Observer
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&[T]) + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let deps = vec![stream.id()];
    let captured_stream = stream.clone();
    let callback = Arc::new(callback);

    let build_job: Box<dyn Fn() -> Box<dyn FnOnce() + Send> + Send + Sync> = Box::new(move || {
        let events = captured_stream.events();
        let callback = callback.clone();
        Box::new(move || (callback)(&events)) as Box<dyn FnOnce() + Send>
    });

    let node = ObserverNode {
        domain: inner.clone(),
        build_job,
        predecessors: deps.clone(),
    };
    let id = inner.allocate(Box::new(node), deps);
    Observer { id, domain: inner }
}
