// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`map`]: an event stream that applies a pure function to every event
//! from its source, grounded in the same one-predecessor transform shape as
//! [`crate::nodes::filter::filter`] — the teacher's
//! `backends::local::processors::ReverseTextProcessor`-style single-input
//! transform, generalized from string payloads to arbitrary `A -> B`.

use std::any::Any;
use std::sync::Arc;

use crate::events::EventBuffer;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::EventStream;

pub(crate) struct MapNode<A, B> {
    source: Box<dyn Fn() -> Vec<A> + Send + Sync>,
    transform: Box<dyn Fn(&A) -> B + Send + Sync>,
    buffer: EventBuffer<B>,
    predecessors: Vec<NodeId>,
}

impl<A: Send + Sync + 'static, B: Send + Sync + 'static> NodeKind for MapNode<A, B> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let mut changed = false;
        for event in (self.source)() {
            self.buffer.push((self.transform)(&event));
            changed = true;
        }
        if changed {
            TickResult::Changed
        } else {
            TickResult::Unchanged
        }
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Map
    }

    fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    fn end_turn(&mut self) {
        self.buffer.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Apply `transform` to every event `source` buffers this turn, in order.
/// A panic inside `transform` is isolated per spec §7: the buffer keeps
/// whatever it already collected, the node reports no change for the
/// remainder, and the failure surfaces on the turn's report as
/// [`crate::CallbackFailure::Map`].
pub fn map<A, B, F>(source: &EventStream<A>, transform: F) -> EventStream<B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    F: Fn(&A) -> B + Send + Sync + 'static,
{
    let domain = source.domain.clone();
    let deps = vec![source.id()];
    let captured_source = source.clone();

    let node = MapNode {
        source: Box::new(move || captured_source.events()),
        transform: Box::new(transform),
        buffer: EventBuffer::new(),
        predecessors: deps.clone(),
    };
    let id = domain.allocate(Box::new(node), deps);
    let reader: Arc<dyn Fn(&dyn Any) -> Vec<B> + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<MapNode<A, B>>()
            .expect("EventStream handle pointed at a non-Map node")
            .buffer
            .to_vec()
    });
    EventStream::new(id, domain, reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::domain::Domain;
    use crate::turn::TransactionMode;

    #[test]
    fn map_transforms_every_buffered_event() {
        let domain = Domain::new(DomainConfig::sequential());
        let numbers = domain.event_source::<i32>();
        let doubled = map(&numbers.as_stream(), |n| n * 2);

        domain.transaction(TransactionMode::Sync, {
            let numbers = numbers;
            move |txn| {
                numbers.emit(txn, 1);
                numbers.emit(txn, 2);
                numbers.emit(txn, 3);
            }
        });

        assert_eq!(doubled.events(), vec![2, 4, 6]);
    }

    #[test]
    fn map_buffer_is_empty_when_source_is_empty() {
        let domain = Domain::new(DomainConfig::sequential());
        let numbers = domain.event_source::<i32>();
        let doubled = map(&numbers.as_stream(), |n| n * 2);
        assert!(doubled.events().is_empty());
    }
}
