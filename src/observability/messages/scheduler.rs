// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use super::StructuredLog;

/// The scheduler seeded its ready set for a new turn.
pub struct ReadySetSeeded {
    pub turn_id: u64,
    pub ready_count: usize,
}

impl fmt::Display for ReadySetSeeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {} seeded {} ready node(s)",
            self.turn_id, self.ready_count
        )
    }
}

impl StructuredLog for ReadySetSeeded {}

/// A node changed its own predecessor set mid-tick and was re-leveled.
pub struct DynamicReattachHandled {
    pub turn_id: u64,
    pub new_level: u32,
}

impl fmt::Display for DynamicReattachHandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {}: node dynamically reattached, new level {}",
            self.turn_id, self.new_level
        )
    }
}

impl StructuredLog for DynamicReattachHandled {}
