//! The append-only log: a Merkle-DAG of signed entries with a
//! deterministic total order.
//!
//! A [`Log`] owns handles to every known entry (the block store owns the
//! bytes), the current heads (entries with no known successor), and a
//! `next_index` marking which predecessor addresses are already
//! referenced. Appending extends the local frontier; joining merges
//! another replica's entries after verifying all of them. Two replicas
//! holding the same entry set produce identical orders and identical
//! serializations.
//!
//! # Invariants
//!
//! - Every head is in `entries`, and nothing in `entries` references it.
//! - `next_index` marks exactly the referenced predecessor addresses.
//! - `clock.time` is at least every head's clock time.
//! - Every entry was signature-verified and admitted by the access
//!   controller when it was inserted.
//! - Content addressing makes the graph acyclic by construction.

pub mod io;
pub mod iter;

pub use io::{JsonLog, Snapshot};
pub use iter::IteratorOptions;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::access::{AccessController, PermissiveAccess};
use crate::clock::LamportClock;
use crate::entry::{
    no_zeroes, sort_entries, Comparator, Entry, EntryMap, EntryTemplate,
};
use crate::error::Error;
use crate::identity::{Identity, IdentityProvider};
use crate::store::BlockStore;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Construction options for [`Log::new`]. Every field has a default.
#[derive(Default)]
pub struct LogOptions {
    /// Log id. Defaults to the current Unix time in milliseconds; supplying
    /// an explicit id is strongly recommended.
    pub id: Option<String>,
    /// Append authorization policy. Defaults to admit-all.
    pub access: Option<Arc<dyn AccessController>>,
    /// Initial entry set.
    pub entries: Option<EntryMap>,
    /// Initial heads. When omitted and `entries` is non-empty, heads are
    /// recomputed with [`find_heads`].
    pub heads: Option<Vec<Entry>>,
    /// Initial clock. Only the time is kept; the id is always the local
    /// identity's public key.
    pub clock: Option<LamportClock>,
    /// Total-order comparator. Defaults to [`crate::entry::last_write_wins`].
    /// The log wraps whatever is supplied in [`no_zeroes`].
    pub sort_fn: Option<Comparator>,
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// A single-owner append-only log replica.
pub struct Log {
    store: Arc<dyn BlockStore>,
    provider: Arc<dyn IdentityProvider>,
    id: String,
    identity: Identity,
    access: Arc<dyn AccessController>,
    sort_fn: Comparator,
    entries: EntryMap,
    heads: EntryMap,
    next_index: EntryMap,
    clock: LamportClock,
}

impl Log {
    /// Construct a log from collaborators and options.
    pub fn new(
        store: Arc<dyn BlockStore>,
        provider: Arc<dyn IdentityProvider>,
        identity: Identity,
        options: LogOptions,
    ) -> Result<Log, Error> {
        let id = options
            .id
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

        let sort_fn = no_zeroes(
            options
                .sort_fn
                .unwrap_or_else(|| Arc::new(crate::entry::last_write_wins)),
        );

        let access = options
            .access
            .unwrap_or_else(|| Arc::new(PermissiveAccess));

        let entries = options.entries.unwrap_or_default();

        // The clock seeds from the caller's clock and the heads the caller
        // actually passed, before any head recomputation.
        let supplied_heads = options.heads.unwrap_or_default();
        let mut max_time = options.clock.map(|c| c.time).unwrap_or(0);
        max_time = supplied_heads
            .iter()
            .map(|e| e.clock.time)
            .fold(max_time, u64::max);

        let heads = if supplied_heads.is_empty() && !entries.is_empty() {
            find_heads(&entries)
        } else {
            supplied_heads
        };

        let mut next_index = EntryMap::new();
        for (_, entry) in &entries {
            for next in &entry.next {
                next_index.set(next.clone(), entry.clone());
            }
        }

        let clock = LamportClock::new(identity.pub_key.clone(), max_time);

        Ok(Log {
            store,
            provider,
            id,
            identity,
            access,
            sort_fn,
            entries,
            heads: EntryMap::from_entries(&heads),
            next_index,
            clock,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The log id. Every contained entry carries the same id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The local author's identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The current Lamport clock.
    #[must_use]
    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    /// All known entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    /// Number of known entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current heads, sorted descending under the log's comparator.
    pub fn heads(&self) -> Result<Vec<Entry>, Error> {
        let mut heads = self.heads.slice();
        sort_entries(&self.sort_fn, &mut heads)?;
        heads.reverse();
        Ok(heads)
    }

    /// The predecessor-reference index: each referenced predecessor
    /// address maps to one of its successors.
    #[must_use]
    pub fn next_index(&self) -> &EntryMap {
        &self.next_index
    }

    /// Look up an entry by content address.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&Entry> {
        self.entries.get(hash)
    }

    /// Returns `true` if the log knows an entry under `hash`.
    #[must_use]
    pub fn has(&self, hash: &str) -> bool {
        self.entries.has(hash)
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Walk the DAG from `roots` in descending total order.
    ///
    /// The stack is re-sorted on every push, so the next entry yielded is
    /// always the comparator-maximum of the reachable frontier; the walk is
    /// deterministic for a given entry set. `amount` bounds the number of
    /// entries yielded (`None` is exhaustive); `end_hash` stops the walk
    /// after yielding the named entry.
    pub fn traverse(
        &self,
        roots: &EntryMap,
        amount: Option<usize>,
        end_hash: Option<&str>,
    ) -> Result<Vec<Entry>, Error> {
        let mut stack = roots.slice();
        sort_entries(&self.sort_fn, &mut stack)?;
        stack.reverse();

        let mut traversed: HashSet<String> = HashSet::new();
        let mut result: Vec<Entry> = Vec::new();

        while !stack.is_empty() && amount.map_or(true, |limit| result.len() < limit) {
            let entry = stack.remove(0);

            for next in &entry.next {
                let Some(next_entry) = self.entries.get(next) else {
                    continue;
                };
                if !traversed.insert(next.clone()) {
                    continue;
                }
                stack.insert(0, next_entry.clone());
                sort_entries(&self.sort_fn, &mut stack)?;
                stack.reverse();
            }

            let at_end = end_hash.is_some_and(|end| entry.hash == end);
            result.push(entry);
            if at_end {
                break;
            }
        }

        Ok(result)
    }

    /// Every known entry in ascending total order (tails first, heads
    /// last).
    pub fn values(&self) -> Result<Vec<Entry>, Error> {
        if self.heads.is_empty() {
            return Ok(Vec::new());
        }
        let mut stack = self.traverse(&self.heads, None, None)?;
        stack.reverse();
        Ok(EntryMap::from_entries(&stack).slice())
    }

    // -----------------------------------------------------------------------
    // Append
    // -----------------------------------------------------------------------

    /// Append a payload, producing the new single head.
    ///
    /// The new entry references every current head plus further entries
    /// from the frontier, up to `pointer_count` references total
    /// (deduplicated, heads first). The local clock advances past every
    /// head's time. The block is written to the store only after the
    /// access controller admits the entry, so a denial leaves no orphan
    /// block.
    pub fn append(&mut self, payload: &[u8], pointer_count: usize) -> Result<Entry, Error> {
        let head_time = self
            .heads
            .iter()
            .map(|(_, e)| e.clock.time)
            .max()
            .unwrap_or(0);
        let new_time = self.clock.time.max(head_time) + 1;
        self.clock = LamportClock::new(self.clock.id.clone(), new_time);

        let reference_count = pointer_count.max(self.heads.len());
        let references = self
            .traverse(&self.heads, Some(reference_count), None)
            .map_err(Error::append)?;

        let mut next: Vec<String> = Vec::new();
        for hash in self.heads.keys() {
            if !next.contains(hash) {
                next.push(hash.clone());
            }
        }
        for reference in &references {
            if !next.contains(&reference.hash) {
                next.push(reference.hash.clone());
            }
        }

        let entry = Entry::create(
            self.provider.as_ref(),
            &self.identity,
            EntryTemplate {
                log_id: self.id.clone(),
                payload: payload.to_vec(),
                next,
            },
            &self.clock,
        )
        .map_err(Error::append)?;

        self.access
            .can_append(&entry, &self.identity)
            .map_err(|err| Error::append(Error::Access(err)))?;

        self.store
            .put(&entry.to_block().map_err(Error::append)?)
            .map_err(|err| Error::append(Error::Store(err)))?;

        let prior_heads = self.heads.slice();
        self.entries.set(entry.hash.clone(), entry.clone());
        for head in &prior_heads {
            self.next_index.set(head.hash.clone(), entry.clone());
        }
        self.heads = EntryMap::from_entries([&entry]);

        Ok(entry)
    }

    // -----------------------------------------------------------------------
    // Join
    // -----------------------------------------------------------------------

    /// Merge another replica's entries into this log.
    ///
    /// A join is always safe: it takes the union of both entry sets,
    /// deduplicated by content address. Joining a log with a different id
    /// is a silent no-op. Every incoming entry is checked against the
    /// access controller and signature-verified *before* any is inserted;
    /// on failure the log is unchanged.
    ///
    /// `size` truncates the merged log to its most recent entries in total
    /// order (`None` keeps everything).
    pub fn join(&mut self, other: &Log, size: Option<usize>) -> Result<(), Error> {
        if self.id != other.id {
            return Ok(());
        }

        let new_items = Self::difference(other, self);

        for (_, entry) in &new_items {
            self.access
                .can_append(entry, &self.identity)
                .map_err(|err| Error::join(Error::Access(err)))?;
            entry.verify(self.provider.as_ref())?;
        }

        for (_, entry) in &new_items {
            for next in &entry.next {
                self.next_index.set(next.clone(), entry.clone());
            }
            self.entries.set(entry.hash.clone(), entry.clone());
        }

        let mut nexts_from_new: HashSet<&String> = HashSet::new();
        for (_, entry) in &new_items {
            for next in &entry.next {
                nexts_from_new.insert(next);
            }
        }

        // A merged head survives only if nothing references it: neither a
        // freshly joined entry nor anything already indexed.
        let mut merged = self.heads.clone();
        merged.merge(&other.heads);
        let merged_heads: Vec<Entry> = find_heads(&merged)
            .into_iter()
            .filter(|head| {
                !nexts_from_new.contains(&head.hash) && !self.next_index.has(&head.hash)
            })
            .collect();
        self.heads = EntryMap::from_entries(&merged_heads);

        if let Some(size) = size {
            let values = self.values()?;
            let start = values.len().saturating_sub(size);
            let kept = &values[start..];
            self.entries = EntryMap::from_entries(kept);
            let heads = find_heads(&self.entries);
            self.heads = EntryMap::from_entries(&heads);
        }

        let head_time = self
            .heads
            .iter()
            .map(|(_, e)| e.clock.time)
            .max()
            .unwrap_or(0);
        self.clock = LamportClock::new(self.clock.id.clone(), self.clock.time.max(head_time));

        debug!(id = %self.id, new_entries = new_items.len(), "joined log");
        Ok(())
    }

    /// Entries reachable from `a`'s heads that `b` does not hold.
    ///
    /// Walks `a`'s DAG from its heads, stopping at addresses `b` already
    /// knows. Entries belonging to a different log are skipped and not
    /// expanded through.
    fn difference(a: &Log, b: &Log) -> EntryMap {
        let mut stack: VecDeque<String> = a.heads.keys().cloned().collect();
        let mut traversed: HashSet<String> = HashSet::new();
        let mut result = EntryMap::new();

        while let Some(hash) = stack.pop_front() {
            let Some(entry) = a.entries.get(&hash) else {
                continue;
            };
            if b.entries.has(&hash) || entry.log_id != b.id {
                continue;
            }

            result.set(hash.clone(), entry.clone());
            traversed.insert(hash);
            for next in &entry.next {
                if !traversed.contains(next) && !b.entries.has(next) {
                    traversed.insert(next.clone());
                    stack.push_back(next.clone());
                }
            }
        }

        result
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Render the log as an indented tree, newest entry first.
    ///
    /// `mapper` converts an entry to its display line; the default prints
    /// the payload as lossy UTF-8.
    pub fn to_string_with(
        &self,
        mapper: Option<&dyn Fn(&Entry) -> String>,
    ) -> Result<String, Error> {
        let universe = self.values()?;
        let mut values = universe.clone();
        values.reverse();

        let lines: Vec<String> = values
            .iter()
            .map(|entry| {
                let children = entry.find_children(&universe);
                let depth = children.len();
                let mut line = "  ".repeat(depth.saturating_sub(1));
                if depth > 0 {
                    line.push_str("└─");
                }
                match mapper {
                    Some(mapper) => line.push_str(&mapper(entry)),
                    None => line.push_str(&String::from_utf8_lossy(&entry.payload)),
                }
                line
            })
            .collect();

        Ok(lines.join("\n"))
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("heads", &self.heads.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Clone for Log {
    fn clone(&self) -> Self {
        Log {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            id: self.id.clone(),
            identity: self.identity.clone(),
            access: Arc::clone(&self.access),
            sort_fn: Arc::clone(&self.sort_fn),
            entries: self.entries.clone(),
            heads: self.heads.clone(),
            next_index: self.next_index.clone(),
            clock: self.clock.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Head / tail discovery
// ---------------------------------------------------------------------------

/// Entries with no successor in `entries`, sorted by clock id bytes
/// ascending (stable, so ties keep insertion order).
#[must_use]
pub fn find_heads(entries: &EntryMap) -> Vec<Entry> {
    let mut referenced: HashSet<&String> = HashSet::new();
    for (_, entry) in entries {
        for next in &entry.next {
            referenced.insert(next);
        }
    }

    let mut heads: Vec<Entry> = entries
        .iter()
        .filter(|(hash, _)| !referenced.contains(hash))
        .map(|(_, entry)| entry.clone())
        .collect();

    heads.sort_by(|a, b| a.clock.id.cmp(&b.clock.id));
    heads
}

/// Entries whose predecessor set is not fully known: root entries plus any
/// entry referencing an address absent from `entries`. Deduplicated,
/// discovery order.
#[must_use]
pub fn find_tails(entries: &EntryMap) -> Vec<Entry> {
    let tails: Vec<Entry> = entries
        .iter()
        .filter(|(_, entry)| {
            entry.next.is_empty() || entry.next.iter().any(|next| !entries.has(next))
        })
        .map(|(_, entry)| entry.clone())
        .collect();

    EntryMap::from_entries(&tails).slice()
}

/// Hashes of entries referencing at least one address absent from
/// `entries`, in reverse discovery order.
#[must_use]
pub fn find_tail_hashes(entries: &EntryMap) -> Vec<String> {
    let mut hashes: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.next.iter().any(|next| !entries.has(next)))
        .map(|(hash, _)| hash.clone())
        .collect();

    hashes.reverse();
    hashes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Keystore;
    use crate::store::MemoryStore;

    // -------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------

    fn fixture() -> (Arc<MemoryStore>, Arc<Keystore>, Identity) {
        let store = Arc::new(MemoryStore::new());
        let keystore = Arc::new(Keystore::new());
        let identity = keystore.create_identity("userA");
        (store, keystore, identity)
    }

    fn new_log(store: &Arc<MemoryStore>, keystore: &Arc<Keystore>, identity: &Identity) -> Log {
        Log::new(
            store.clone(),
            keystore.clone(),
            identity.clone(),
            LogOptions {
                id: Some("X".into()),
                ..LogOptions::default()
            },
        )
        .expect("new log")
    }

    fn payloads(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| String::from_utf8_lossy(&e.payload).into_owned())
            .collect()
    }

    // -------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------

    #[test]
    fn new_log_is_empty() {
        let (store, keystore, identity) = fixture();
        let log = new_log(&store, &keystore, &identity);
        assert_eq!(log.id(), "X");
        assert!(log.is_empty());
        assert!(log.heads().unwrap().is_empty());
        assert_eq!(log.clock().time, 0);
        assert_eq!(log.clock().id, identity.pub_key);
    }

    #[test]
    fn default_id_is_millisecond_timestamp() {
        let (store, keystore, identity) = fixture();
        let log = Log::new(
            store,
            keystore,
            identity,
            LogOptions::default(),
        )
        .unwrap();
        let millis: i64 = log.id().parse().expect("numeric id");
        assert!(millis > 1_000_000_000_000, "expected milliseconds, got {millis}");
    }

    #[test]
    fn heads_recomputed_from_entries() {
        let (store, keystore, identity) = fixture();
        let mut source = new_log(&store, &keystore, &identity);
        source.append(b"one", 1).unwrap();
        let head = source.append(b"two", 1).unwrap();

        let rebuilt = Log::new(
            store.clone(),
            keystore.clone(),
            identity.clone(),
            LogOptions {
                id: Some("X".into()),
                entries: Some(source.entries().clone()),
                ..LogOptions::default()
            },
        )
        .unwrap();

        let heads = rebuilt.heads().unwrap();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].hash, head.hash);
    }

    // -------------------------------------------------------------------
    // Append
    // -------------------------------------------------------------------

    #[test]
    fn append_chains_entries() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);

        log.append(b"one", 1).unwrap();
        let two = log.append(b"two", 1).unwrap();
        let three = log.append(b"three", 1).unwrap();

        assert_eq!(payloads(&log.values().unwrap()), vec!["one", "two", "three"]);

        let heads = log.heads().unwrap();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].hash, three.hash);
        assert!(heads[0].next.contains(&two.hash));
    }

    #[test]
    fn append_advances_clock_strictly() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);

        let mut previous = log.clock().time;
        for i in 0..5 {
            let entry = log.append(format!("p{i}").as_bytes(), 1).unwrap();
            assert!(entry.clock.time > previous);
            previous = entry.clock.time;
            assert_eq!(log.clock().time, entry.clock.time);
        }
    }

    #[test]
    fn append_writes_block_to_store() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        let entry = log.append(b"one", 1).unwrap();
        assert!(store.has(&entry.hash).unwrap());
    }

    #[test]
    fn pointer_count_pulls_extra_references() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);

        let a = log.append(b"a", 1).unwrap();
        let b = log.append(b"b", 1).unwrap();
        let c = log.append(b"c", 4).unwrap();

        assert!(c.next.contains(&b.hash));
        assert!(c.next.contains(&a.hash));
        // Deduplicated: the head appears once even though the traversal
        // also yields it.
        assert_eq!(c.next.iter().filter(|n| **n == b.hash).count(), 1);
    }

    #[test]
    fn denied_append_leaves_log_and_store_untouched() {
        struct DenyAll;
        impl AccessController for DenyAll {
            fn can_append(
                &self,
                _entry: &Entry,
                _identity: &Identity,
            ) -> Result<(), crate::access::AccessError> {
                Err(crate::access::AccessError::denied("writes disabled"))
            }
        }

        let (store, keystore, identity) = fixture();
        let mut log = Log::new(
            store.clone(),
            keystore.clone(),
            identity.clone(),
            LogOptions {
                id: Some("X".into()),
                access: Some(Arc::new(DenyAll)),
                ..LogOptions::default()
            },
        )
        .unwrap();

        let err = log.append(b"one", 1).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::AccessDenied);
        assert!(log.is_empty());
        assert!(store.is_empty(), "denied append must not write the block");
    }

    // -------------------------------------------------------------------
    // Traverse / values
    // -------------------------------------------------------------------

    #[test]
    fn traverse_respects_amount_and_end_hash() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        let entries: Vec<Entry> = (0..5)
            .map(|i| log.append(format!("e{i}").as_bytes(), 1).unwrap())
            .collect();

        let heads = EntryMap::from_entries(&[entries[4].clone()]);
        let capped = log.traverse(&heads, Some(2), None).unwrap();
        assert_eq!(payloads(&capped), vec!["e4", "e3"]);

        let until = log
            .traverse(&heads, None, Some(entries[2].hash.as_str()))
            .unwrap();
        assert_eq!(payloads(&until), vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn traverse_zero_amount_is_empty() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        log.append(b"one", 1).unwrap();
        assert!(log.traverse(&EntryMap::from_entries(&log.heads().unwrap()), Some(0), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn values_of_empty_log() {
        let (store, keystore, identity) = fixture();
        let log = new_log(&store, &keystore, &identity);
        assert!(log.values().unwrap().is_empty());
    }

    // -------------------------------------------------------------------
    // Join
    // -------------------------------------------------------------------

    #[test]
    fn join_interleaves_by_clock_and_identity() {
        let store = Arc::new(MemoryStore::new());
        let keystore = Arc::new(Keystore::new());

        // Fix the identity byte order so the interleaving is predictable.
        let first = keystore.create_identity("user1");
        let second = keystore.create_identity("user2");
        let (identity_a, identity_b) = if first.pub_key < second.pub_key {
            (first, second)
        } else {
            (second, first)
        };

        let mut a = new_log(&store, &keystore, &identity_a);
        let mut b = new_log(&store, &keystore, &identity_b);

        a.append(b"one", 1).unwrap();
        b.append(b"hello", 1).unwrap();
        a.append(b"two", 1).unwrap();
        b.append(b"world", 1).unwrap();

        a.join(&b, None).unwrap();

        assert_eq!(
            payloads(&a.values().unwrap()),
            vec!["one", "hello", "two", "world"]
        );
        assert_eq!(a.heads().unwrap().len(), 2);
    }

    #[test]
    fn join_is_idempotent() {
        let (store, keystore, identity) = fixture();
        let mut a = new_log(&store, &keystore, &identity);
        a.append(b"one", 1).unwrap();
        a.append(b"two", 1).unwrap();

        let snapshot = a.clone();
        let copy = a.clone();
        a.join(&copy, None).unwrap();

        assert_eq!(a.entries(), snapshot.entries());
        assert_eq!(
            payloads(&a.values().unwrap()),
            payloads(&snapshot.values().unwrap())
        );
    }

    #[test]
    fn join_different_id_is_silent_noop() {
        let (store, keystore, identity) = fixture();
        let mut a = new_log(&store, &keystore, &identity);
        a.append(b"one", 1).unwrap();

        let mut b = Log::new(
            store.clone(),
            keystore.clone(),
            identity.clone(),
            LogOptions {
                id: Some("Y".into()),
                ..LogOptions::default()
            },
        )
        .unwrap();
        b.append(b"other", 1).unwrap();

        let before = a.entries().clone();
        a.join(&b, None).unwrap();
        assert_eq!(*a.entries(), before);
    }

    #[test]
    fn join_rejects_tampered_entry_and_leaves_log_unchanged() {
        let (store, keystore, identity) = fixture();
        let mut a = new_log(&store, &keystore, &identity);
        a.append(b"one", 1).unwrap();
        let before_entries = a.entries().clone();
        let before_heads = a.heads().unwrap();

        let mut b = new_log(&store, &keystore, &identity);
        let forged = b.append(b"legit", 1).unwrap();
        // Tamper after signing: flip the payload inside b's copy.
        let mut tampered = forged.clone();
        tampered.payload = b"evil".to_vec();
        b.entries.set(tampered.hash.clone(), tampered.clone());
        b.heads = EntryMap::from_entries(&[tampered]);

        let err = a.join(&b, None).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::SignatureFailure);
        assert_eq!(*a.entries(), before_entries);
        assert_eq!(a.heads().unwrap(), before_heads);
    }

    #[test]
    fn size_bounded_join_keeps_newest_entries() {
        let (store, keystore, identity) = fixture();
        let mut a = new_log(&store, &keystore, &identity);
        let mut b = new_log(&store, &keystore, &identity);

        for i in 0..10 {
            a.append(format!("a{i}").as_bytes(), 1).unwrap();
        }
        b.append(b"b0", 1).unwrap();

        b.join(&a, Some(4)).unwrap();
        let values = b.values().unwrap();
        assert_eq!(values.len(), 4);
        // The newest entries in total order survive, including the head.
        assert_eq!(payloads(&values), vec!["a6", "a7", "a8", "a9"]);

        let heads = b.heads().unwrap();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].payload, b"a9");
    }

    #[test]
    fn join_updates_clock_to_max_head_time() {
        let (store, keystore, identity) = fixture();
        let other_identity = keystore.create_identity("userB");

        let mut a = new_log(&store, &keystore, &identity);
        let mut b = new_log(&store, &keystore, &other_identity);
        for i in 0..5 {
            b.append(format!("b{i}").as_bytes(), 1).unwrap();
        }

        a.join(&b, None).unwrap();
        assert_eq!(a.clock().time, 5);
        assert_eq!(a.clock().id, identity.pub_key, "clock id stays local");
    }

    // -------------------------------------------------------------------
    // Heads / tails
    // -------------------------------------------------------------------

    #[test]
    fn find_heads_on_linear_chain() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        log.append(b"one", 1).unwrap();
        let head = log.append(b"two", 1).unwrap();

        let heads = find_heads(log.entries());
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].hash, head.hash);
    }

    #[test]
    fn find_heads_matches_log_heads_after_join() {
        let (store, keystore, identity) = fixture();
        let identity_b = keystore.create_identity("userB");
        let mut a = new_log(&store, &keystore, &identity);
        let mut b = new_log(&store, &keystore, &identity_b);

        a.append(b"one", 1).unwrap();
        b.append(b"hello", 1).unwrap();
        a.join(&b, None).unwrap();

        let mut computed: Vec<String> =
            find_heads(a.entries()).iter().map(|e| e.hash.clone()).collect();
        let mut held: Vec<String> = a.heads().unwrap().iter().map(|e| e.hash.clone()).collect();
        computed.sort();
        held.sort();
        assert_eq!(computed, held);
    }

    #[test]
    fn find_tails_with_complete_and_partial_sets() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        let root = log.append(b"one", 1).unwrap();
        let middle = log.append(b"two", 1).unwrap();
        let head = log.append(b"three", 1).unwrap();

        // Complete set: only the root is a tail.
        let tails = find_tails(log.entries());
        assert_eq!(tails.len(), 1);
        assert_eq!(tails[0].hash, root.hash);

        // Drop the root: the middle entry's parents are no longer known.
        let partial = EntryMap::from_entries(&[middle.clone(), head.clone()]);
        let tails = find_tails(&partial);
        assert_eq!(tails.len(), 1);
        assert_eq!(tails[0].hash, middle.hash);

        let tail_hashes = find_tail_hashes(&partial);
        assert_eq!(tail_hashes, vec![middle.hash.clone()]);
    }

    #[test]
    fn find_tail_hashes_of_complete_set_is_empty() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        log.append(b"one", 1).unwrap();
        log.append(b"two", 1).unwrap();
        assert!(find_tail_hashes(log.entries()).is_empty());
    }

    // -------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------

    #[test]
    fn to_string_renders_newest_first_with_tree_prefix() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        log.append(b"one", 1).unwrap();
        log.append(b"two", 1).unwrap();
        log.append(b"three", 1).unwrap();

        let rendered = log.to_string_with(None).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["three", "└─two", "└─one"]);
    }

    #[test]
    fn to_string_with_custom_mapper() {
        let (store, keystore, identity) = fixture();
        let mut log = new_log(&store, &keystore, &identity);
        log.append(b"one", 1).unwrap();

        let rendered = log
            .to_string_with(Some(&|e: &Entry| format!("<{}>", String::from_utf8_lossy(&e.payload))))
            .unwrap();
        assert_eq!(rendered, "<one>");
    }
}
