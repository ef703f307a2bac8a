// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence window bookkeeping for sample requests.

use crate::model::{Header, StreamsDocument};

/// Position of the client in the agent's observation buffer.
///
/// `from` is the next sequence number to request; `to` is the highest
/// sequence number received so far. Both only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCursor {
    instance_id: u64,
    from: u64,
    to: u64,
}

/// Outcome of applying a streams document to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorUpdate {
    /// Window moved (or stayed put for an empty heartbeat).
    Advanced { from: u64, to: u64 },
    /// The agent restarted; sequence numbers are no longer comparable.
    InstanceChanged { previous: u64, current: u64 },
    /// The agent buffer rolled past the window; observations were lost.
    Gap { expected: u64, first: u64 },
}

impl SequenceCursor {
    /// Start a window from a current response.
    ///
    /// Uses `nextSequence`, falling back to `lastSequence + 1`. Returns
    /// `None` when the header carries neither.
    pub fn from_header(header: &Header) -> Option<Self> {
        let from = header
            .next_sequence
            .or_else(|| header.last_sequence.map(|s| s + 1))?;
        Some(Self {
            instance_id: header.instance_id,
            from,
            to: from.saturating_sub(1),
        })
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Current `[from, to]` window.
    pub fn window(&self) -> (u64, u64) {
        (self.from, self.to)
    }

    /// Apply a sample document. The cursor is left untouched unless the
    /// result is `Advanced`.
    pub fn advance(&mut self, doc: &StreamsDocument) -> CursorUpdate {
        let header = &doc.header;
        if header.instance_id != self.instance_id {
            return CursorUpdate::InstanceChanged {
                previous: self.instance_id,
                current: header.instance_id,
            };
        }

        if let Some(first) = header.first_sequence {
            if first > self.from {
                return CursorUpdate::Gap {
                    expected: self.from,
                    first,
                };
            }
        }

        let highest = doc.max_sequence();
        let next = header
            .next_sequence
            .or_else(|| highest.map(|s| s + 1))
            .unwrap_or(self.from);

        self.from = self.from.max(next);
        if let Some(highest) = highest {
            self.to = self.to.max(highest);
        }

        CursorUpdate::Advanced {
            from: self.from,
            to: self.to,
        }
    }
}
