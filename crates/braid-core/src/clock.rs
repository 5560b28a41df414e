//! Lamport logical clock.
//!
//! Each replica carries a `(id, time)` pair where `id` is the replica's
//! public key and `time` is a logical counter. There is no in-place
//! increment: every append computes the replacement clock as
//! `max(local.time, max head time) + 1`, so the clock type itself stays a
//! plain immutable value.
//!
//! Clocks order first by `time`, then by `id` (lexicographic byte compare),
//! which makes the ordering total across replicas.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A Lamport clock stamp: the issuing replica's key and a logical time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LamportClock {
    /// Public key bytes of the replica that issued this stamp.
    #[serde(with = "crate::entry::encoding::hexstr")]
    pub id: Vec<u8>,
    /// Logical time. Strictly increases along any causal chain.
    pub time: u64,
}

impl LamportClock {
    /// Construct a clock stamp from an id and a time.
    #[must_use]
    pub fn new(id: Vec<u8>, time: u64) -> Self {
        Self { id, time }
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LamportClock {
    /// Total order: logical time first, issuer id bytes as tie-break.
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
