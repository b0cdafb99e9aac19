// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`merge`]: combine several event streams of the same type into one —
//! the closest teacher analogue is its multi-predecessor
//! `collectors::{concatenate, json_merge, first_available}` style, adapted
//! here from string/JSON payload merging to event-value merging.

use std::any::Any;
use std::sync::Arc;

use crate::events::EventBuffer;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::EventStream;

pub(crate) struct MergeNode<T> {
    sources: Vec<Box<dyn Fn() -> Vec<T> + Send + Sync>>,
    buffer: EventBuffer<T>,
    predecessors: Vec<NodeId>,
}

impl<T: Send + Sync + 'static> NodeKind for MergeNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        let mut changed = false;
        for source in &self.sources {
            for event in source() {
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
        NodeTag::Merge
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

/// Merge `sources` (in the order given, then in push order within each
/// source) into a single event stream. Panics if `sources` is empty — a
/// merge with no inputs has no level to attach at.
pub fn merge<T>(sources: &[EventStream<T>]) -> EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    assert!(
        !sources.is_empty(),
        "merge requires at least one source event stream"
    );

    let domain = sources[0].domain.clone();
    let deps: Vec<NodeId> = sources.iter().map(EventStream::id).collect();
    let captured: Vec<Box<dyn Fn() -> Vec<T> + Send + Sync>> = sources
        .iter()
        .map(|source| {
            let source = source.clone();
            Box::new(move || source.events()) as Box<dyn Fn() -> Vec<T> + Send + Sync>
        })
        .collect();

    let node = MergeNode {
        sources: captured,
        buffer: EventBuffer::new(),
        predecessors: deps.clone(),
    };
    let id = domain.allocate(Box::new(node), deps);
    let reader: Arc<dyn Fn(&dyn Any) -> Vec<T> + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<MergeNode<T>>()
            .expect("EventStream handle pointed at a non-Merge node")
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
    fn merge_interleaves_both_sources_events() {
        let domain = Domain::new(DomainConfig::sequential());
        let left = domain.event_source::<i32>();
        let right = domain.event_source::<i32>();
        let merged = merge(&[left.as_stream(), right.as_stream()]);

        domain.transaction(TransactionMode::Sync, {
            let left = left;
            let right = right;
            move |txn| {
                left.emit(txn, 1);
                right.emit(txn, 2);
            }
        });

        let mut events = merged.events();
        events.sort();
        assert_eq!(events, vec![1, 2]);
    }
}
