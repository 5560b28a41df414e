//! Breadth-first entry fetching from a block store.
//!
//! [`fetch_all`] expands a DAG from seed addresses: each fetched entry's
//! `next` addresses are enqueued unless excluded or already seen. The walk
//! stops when the queue drains, the entry count reaches `length`, or the
//! `timeout` elapses — a timeout yields the partial result gathered so
//! far, not an error. Individual block failures are logged and skipped, so
//! a fully failed fetch returns an empty list.
//!
//! Ordering of the result is breadth-first discovery order and is not a
//! total order; callers that need one sort with the log's comparator.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::store::BlockStore;

use super::encoding;
use super::Entry;

/// Per-entry progress callback.
pub type ProgressFn<'a> = Box<dyn FnMut(&Entry) + 'a>;

/// Bounds and hooks for [`fetch_all`].
#[derive(Default)]
pub struct FetchOptions<'a> {
    /// Stop after this many entries. `None` fetches everything reachable.
    pub length: Option<usize>,
    /// Addresses to treat as already known: never fetched, never returned,
    /// not counted toward `length`.
    pub exclude: Vec<String>,
    /// Wall-clock budget; on expiry the partial result is returned.
    pub timeout: Option<Duration>,
    /// Invoked once per fetched entry, in discovery order.
    pub progress: Option<ProgressFn<'a>>,
}

/// Fetch the DAG reachable from `seeds` out of `store`, breadth-first.
pub fn fetch_all(store: &dyn BlockStore, seeds: &[String], mut options: FetchOptions<'_>) -> Vec<Entry> {
    let mut visited: HashSet<String> = options.exclude.iter().cloned().collect();
    let mut queue: VecDeque<String> = VecDeque::new();

    for seed in seeds {
        if visited.insert(seed.clone()) {
            queue.push_back(seed.clone());
        }
    }

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let mut result: Vec<Entry> = Vec::new();

    while let Some(address) = queue.pop_front() {
        if options.length.is_some_and(|length| result.len() >= length) {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let bytes = match store.get(&address) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%address, %err, "skipping unfetchable block");
                continue;
            }
        };

        let entry = match encoding::decode_block(&bytes, &address) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%address, %err, "skipping undecodable block");
                continue;
            }
        };

        if let Some(progress) = options.progress.as_mut() {
            progress(&entry);
        }

        for next in &entry.next {
            if visited.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }

        result.push(entry);
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
