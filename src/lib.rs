// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `dagflow` is a reactive dataflow engine: a runtime that maintains a DAG of
//! signals and event streams and automatically re-evaluates dependents when
//! inputs change.
//!
//! Three guarantees define the engine:
//!
//! * **Update minimality** — a node recomputes at most once per turn, and
//!   only if at least one input actually changed.
//! * **Glitch freedom** — no observer ever sees a node computed from a mix
//!   of old and new input values.
//! * **Data-race freedom under parallel evaluation** — independent nodes may
//!   tick concurrently without locks in user callbacks.
//!
//! A [`Domain`] owns one propagation engine and the nodes bound to it.
//! Multiple domains may coexist; they never share nodes.

pub mod change;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod events;
pub mod graph;
pub mod nodes;
pub mod observability;
pub mod scheduler;
pub mod turn;

pub use domain::Domain;
pub use errors::{CallbackFailure, EngineError, ObserverFailure, StructuralError};
pub use graph::NodeId;
pub use nodes::event_source::EventSource;
pub use nodes::filter::filter;
pub use nodes::fold::fold;
pub use nodes::handle::{EventStream, Signal};
pub use nodes::lift::lift;
pub use nodes::map::map;
pub use nodes::merge::merge;
pub use nodes::observe::Observer;
pub use nodes::switch::switch;
pub use nodes::var::Var;
pub use turn::{TransactionMode, TurnReport};
