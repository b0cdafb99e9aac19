// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`filter`]: an event stream that forwards only the events from its
//! source that satisfy a predicate.

use std::any::Any;
use std::sync::Arc;

use crate::events::EventBuffer;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::EventStream;

pub(crate) struct FilterNode<T> {
    source: Box<dyn Fn() -> Vec<T> + Send + Sync>,
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
    buffer: EventBuffer<T>,
    predecessors: Vec<NodeId>,
}

impl<T: Send + Sync + 'static> NodeKind for FilterNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let mut changed = false;
        for event in (self.source)() {
            if (self.predicate)(&event) {
                self.buffer.push(event);
                changed = true;
            }
        }
        if changed {
            TickResult::Changed
        } else {
            TickResult::Unchanged
        }
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Filter
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

/// Forward only the events from `source` for which `predicate` returns
/// `true`.
pub fn filter<T, F>(source: &EventStream<T>, predicate: F) -> EventStream<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    let domain = source.domain.clone();
    let deps = vec![source.id()];
    let captured_source = source.clone();

    let node = FilterNode {
        source: Box::new(move || captured_source.events()),
        predicate: Box::new(predicate),
        buffer: EventBuffer::new(),
        predecessors: deps.clone(),
    };
    let id = domain.allocate(Box::new(node), deps);
    let reader: Arc<dyn Fn(&dyn Any) -> Vec<T> + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<FilterNode<T>>()
            .expect("EventStream handle pointed at a non-Filter node")
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
    fn filter_drops_events_failing_predicate() {
        let domain = Domain::new(DomainConfig::sequential());
        let numbers = domain.event_source::<i32>();
        let evens = filter(&numbers.as_stream(), |n| n % 2 == 0);

        domain.transaction(TransactionMode::Sync, {
            let numbers = numbers;
            move |txn| {
                numbers.emit(txn, 1);
                numbers.emit(txn, 2);
                numbers.emit(txn, 3);
                numbers.emit(txn, 4);
            }
        });

        assert_eq!(evens.events(), vec![2, 4]);
    }
}
