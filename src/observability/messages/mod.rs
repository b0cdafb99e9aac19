// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::Display;
use tracing::Span;

pub mod engine;
pub mod graph;
pub mod scheduler;
pub mod turn;

/// A loggable event: a `Display` message plus a convenience `log()` that
/// emits it at the right level, and an optional `span()` for messages that
/// also bound a unit of work (a turn, a level-barrier pass).
pub trait StructuredLog: Display {
    /// Emit this message at its natural level. Most messages are `debug!`;
    /// failures override this to `warn!`/`error!`.
    fn log(&self) {
        tracing::debug!("{}", self);
    }

    /// A span callers can `.enter()` for the duration of the work this
    /// message announces the start of. Default: an unnamed, level-agnostic
    /// span tagged only with the message text; message types that bound a
    /// long-lived unit of work override this with real fields.
    fn span(&self) -> Span {
        tracing::debug_span!("dagflow_event", message = %self)
    }
}
