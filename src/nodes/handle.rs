// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The two handle shapes every node kind hands back to callers:
//! [`Signal<T>`] for a value that holds steadily between turns, and
//! [`EventStream<T>`] for a stream of discrete values that only exist
//! during the turn they were pushed in.
//!
//! Neither handle downcasts against a fixed struct: each carries its own
//! `reader` closure, built by the constructor that created it, which already
//! knows which concrete `NodeKind` struct backs the node and performs the
//! `Any` downcast itself. This is the one place type erasure happens —
//! everywhere else, code works with concrete `T`.

use std::any::Any;
use std::sync::Arc;

use crate::domain::DomainInner;
use crate::graph::NodeId;

type Reader<T> = Arc<dyn Fn(&dyn Any) -> T + Send + Sync>;

/// A steady value produced by an input (`Var`) or computed (`Lift`, `Fold`)
/// node.
pub struct Signal<T> {
    pub(crate) id: NodeId,
    pub(crate) domain: Arc<DomainInner>,
    pub(crate) reader: Reader<T>,
}

impl<T: Clone + 'static> Signal<T> {
    pub(crate) fn new(id: NodeId, domain: Arc<DomainInner>, reader: Reader<T>) -> Self {
        Self { id, domain, reader }
    }

    /// Read the signal's current value as of the last committed turn.
    pub fn get(&self) -> T {
        self.domain.read_value(self.id, &self.reader)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            domain: self.domain.clone(),
            reader: self.reader.clone(),
        }
    }
}

/// Operator sugar over `lift` (spec §9: "re-architect as explicit
/// `lift(fn, inputs...)` plus a thin builder DSL... no semantic content is
/// lost"). `w * h` and `b + c` build an ordinary `Lift` node; there is no
/// separate "arithmetic node" kind.
impl<T> std::ops::Add for &Signal<T>
where
    T: Clone + PartialEq + Send + Sync + std::ops::Add<Output = T> + 'static,
{
    type Output = Signal<T>;

    fn add(self, rhs: &Signal<T>) -> Signal<T> {
        let lhs = self.clone();
        let rhs = rhs.clone();
        crate::nodes::lift::lift_on(self.domain.clone(), &[lhs.id, rhs.id], move || {
            lhs.get() + rhs.get()
        })
    }
}

impl<T> std::ops::Add for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + std::ops::Add<Output = T> + 'static,
{
    type Output = Signal<T>;

    fn add(self, rhs: Signal<T>) -> Signal<T> {
        (&self) + (&rhs)
    }
}

impl<T> std::ops::Mul for &Signal<T>
where
    T: Clone + PartialEq + Send + Sync + std::ops::Mul<Output = T> + 'static,
{
    type Output = Signal<T>;

    fn mul(self, rhs: &Signal<T>) -> Signal<T> {
        let lhs = self.clone();
        let rhs = rhs.clone();
        crate::nodes::lift::lift_on(self.domain.clone(), &[lhs.id, rhs.id], move || {
            lhs.get() * rhs.get()
        })
    }
}

impl<T> std::ops::Mul for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + std::ops::Mul<Output = T> + 'static,
{
    type Output = Signal<T>;

    fn mul(self, rhs: Signal<T>) -> Signal<T> {
        (&self) * (&rhs)
    }
}

/// The values an event-stream node buffered this turn. Readable any time
/// after that turn commits, up until the *next* turn begins — `NodeKind::end_turn`
/// clears the buffer at the start of the following turn, not the one that
/// produced it, so a caller can always read the events a just-committed
/// transaction produced.
pub struct EventStream<T> {
    pub(crate) id: NodeId,
    pub(crate) domain: Arc<DomainInner>,
    pub(crate) reader: Reader<Vec<T>>,
}

impl<T: Clone + 'static> EventStream<T> {
    pub(crate) fn new(id: NodeId, domain: Arc<DomainInner>, reader: Reader<Vec<T>>) -> Self {
        Self { id, domain, reader }
    }

    /// The events this stream buffered during the turn currently
    /// propagating (or the most recently committed one, if called outside a
    /// transaction).
    pub fn events(&self) -> Vec<T> {
        self.domain.read_value(self.id, &self.reader)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            domain: self.domain.clone(),
            reader: self.reader.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DomainConfig;
    use crate::domain::Domain;
    use crate::turn::TransactionMode;

    #[test]
    fn area_scenario_uses_mul_sugar() {
        let domain = Domain::new(DomainConfig::sequential());
        let width = domain.var(1i64);
        let height = domain.var(2i64);
        let area = width.as_signal() * height.as_signal();
        assert_eq!(area.get(), 2);

        let width_clone = width;
        domain.transaction(TransactionMode::Sync, move |txn| {
            width_clone.set(txn, 10);
        });
        assert_eq!(area.get(), 20);
    }

    #[test]
    fn diamond_scenario_uses_add_sugar_and_ticks_d_once() {
        let domain = Domain::new(DomainConfig::sequential());
        let a = domain.var(0i64);
        let b = domain.signal(&[a.id()], {
            let a = a.as_signal();
            move || a.get() + 1
        });
        let c = domain.signal(&[a.id()], {
            let a = a.as_signal();
            move || a.get() + 2
        });
        let d = &b + &c;
        assert_eq!(d.get(), 3);

        let a_clone = a;
        let outcome = domain.transaction(TransactionMode::Sync, move |txn| {
            a_clone.set(txn, 10);
        });
        assert_eq!(d.get(), 23);
        match outcome {
            crate::domain::TransactionOutcome::Report(Ok(report)) => {
                // a, b, c, d: each ticks exactly once despite d having two
                // paths back to a.
                assert_eq!(report.nodes_ticked, 4);
            }
            _ => panic!("expected a synchronous report"),
        }
    }
}
