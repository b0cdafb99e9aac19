// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for `dagflow`, split by the subsystem that raises it —
//! mirroring the teacher's `errors::{config, processor_map}` split, but with
//! every variant `thiserror`-derived rather than hand-rolled `Display` impls:
//! `thiserror` is already a direct dependency pulled in for other error
//! types, so there's no reason for two of them to roll their own.

mod config;
mod engine;

pub use config::ConfigError;
pub use engine::{CallbackFailure, EngineError, ObserverFailure, StructuralError};
