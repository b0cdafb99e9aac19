// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`EventSource<T>`]: the input event-stream node kind — the event-stream
//! analogue of [`crate::nodes::var::Var`]. Every push is a change (there is
//! no "previous value" an event stream compares against, per spec §4.2);
//! the buffer is cleared at `end_turn` regardless of whether anything
//! downstream observed it.

use std::sync::Arc;

use crate::domain::Domain;
use crate::events::EventBuffer;
use crate::graph::{NodeId, NodeKind, NodeTag, TickContext, TickResult};
use crate::nodes::handle::EventStream;
use crate::turn::{StagedWrite, Transaction};

pub(crate) struct EventSourceNode<T> {
    buffer: EventBuffer<T>,
}

impl<T: Send + Sync + 'static> NodeKind for EventSourceNode<T> {
    fn tick(&mut self, _ctx: &TickContext) -> TickResult {
        TickResult::Unchanged
    }

    fn tag(&self) -> NodeTag {
        NodeTag::Var
    }

    fn predecessors(&self) -> &[NodeId] {
        &[]
    }

    fn end_turn(&mut self) {
        self.buffer.clear();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A writable input event stream.
pub struct EventSource<T> {
    stream: EventStream<T>,
}

impl<T: Clone + Send + Sync + 'static> EventSource<T> {
    pub fn as_stream(&self) -> EventStream<T> {
        self.stream.clone()
    }

    pub fn id(&self) -> NodeId {
        self.stream.id()
    }

    /// Stage a value to be pushed into this stream's buffer when `txn`
    /// commits.
    pub fn emit(&self, txn: &Transaction, value: T) {
        let node = self.stream.id;
        txn.stage(StagedWrite {
            node,
            apply: Box::new(move |storage| {
                let meta = storage.meta(node).expect("stale EventSource handle");
                let mut kind = meta.kind.lock().expect("node mutex poisoned");
                let source = kind
                    .as_any_mut()
                    .downcast_mut::<EventSourceNode<T>>()
                    .expect("EventSource handle pointed at a non-event-source node");
                source.buffer.push(value);
                true
            }),
        });
    }
}

/// Bind a new input event stream to `domain`.
pub fn event_source<T>(domain: &Domain) -> EventSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    let inner = domain.inner().clone();
    let node = EventSourceNode {
        buffer: EventBuffer::new(),
    };
    let id = inner.allocate(Box::new(node), vec![]);
    let reader: Arc<dyn Fn(&dyn std::any::Any) -> Vec<T> + Send + Sync> = Arc::new(|any| {
        any.downcast_ref::<EventSourceNode<T>>()
            .expect("EventStream handle pointed at a non-event-source node")
            .buffer
            .to_vec()
    });
    EventSource {
        stream: EventStream::new(id, inner, reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::turn::TransactionMode;

    #[test]
    fn emitted_events_are_visible_then_cleared_next_turn() {
        let domain = Domain::new(DomainConfig::sequential());
        let clicks = domain.event_source::<&'static str>();
        let clicks_clone = EventSource {
            stream: clicks.as_stream(),
        };

        domain.transaction(TransactionMode::Sync, move |txn| {
            clicks_clone.emit(txn, "click-a");
        });
        assert_eq!(clicks.as_stream().events(), vec!["click-a"]);

        let clicks_clone = EventSource {
            stream: clicks.as_stream(),
        };
        domain.transaction(TransactionMode::Sync, move |txn| {
            clicks_clone.emit(txn, "click-b");
        });
        assert_eq!(clicks.as_stream().events(), vec!["click-b"]);
    }
}
