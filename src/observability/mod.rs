// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for `dagflow`, following the same shape the teacher
//! repo uses for its own event logging: rather than scattering
//! `tracing::info!("...")` format strings through the codebase, each
//! noteworthy event is a small struct that implements [`std::fmt::Display`]
//! and the [`messages::StructuredLog`] convenience trait. Call sites read as
//! `SomeEvent { .. }.log()` instead of a free-floating format string, which
//! keeps the fields a log line carries in one place, next to the type that
//! describes the event, rather than interpolated into a string.
//!
//! Organized by subsystem, matching the component breakdown in the crate
//! root docs: [`messages::graph`], [`messages::turn`], [`messages::scheduler`],
//! [`messages::engine`].

pub mod messages;
