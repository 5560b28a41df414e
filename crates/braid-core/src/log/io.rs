//! Log persistence: headers, snapshots, and reconstruction through the
//! block store.
//!
//! A log persists as a small JSON header (`{ id, heads }`) whose content
//! address identifies the whole DAG: the heads transitively pin every
//! entry. The `from_*` constructors resolve seeds back into an entry set
//! via [`fetch_all`] and rebuild a [`Log`] with recomputed heads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::encoding::canonical_json;
use crate::entry::{fetch_all, Entry, EntryMap, FetchOptions};
use crate::error::Error;
use crate::identity::{Identity, IdentityProvider};
use crate::store::BlockStore;

use super::{Log, LogOptions};

/// The persisted log header: id plus head addresses in descending total
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonLog {
    /// Log id.
    pub id: String,
    /// Head content addresses, descending under the log's comparator.
    pub heads: Vec<String>,
}

/// A materialized view of a log: header plus every entry in ascending
/// total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Log id.
    pub id: String,
    /// Head content addresses, in head insertion order.
    pub heads: Vec<String>,
    /// Entries in ascending total order.
    pub values: Vec<Entry>,
}

impl Log {
    /// The JSON header for this log, heads sorted descending.
    pub fn to_json(&self) -> Result<JsonLog, Error> {
        let heads = self.heads()?.into_iter().map(|e| e.hash).collect();
        Ok(JsonLog {
            id: self.id().to_owned(),
            heads,
        })
    }

    /// Canonical JSON bytes of the header. Identical entry sets serialize
    /// to identical bytes on every replica.
    pub fn to_buffer(&self) -> Result<Vec<u8>, Error> {
        let value = serde_json::to_value(self.to_json()?)?;
        Ok(canonical_json(&value).into_bytes())
    }

    /// Persist the header to the block store, returning its content
    /// address. The heads pin the DAG, so this address is enough to
    /// reconstruct the log with [`Log::from_multihash`].
    pub fn to_multihash(&self) -> Result<String, Error> {
        Ok(self.store.put(&self.to_buffer()?)?)
    }

    /// A materialized snapshot of this log.
    pub fn snapshot(&self) -> Result<Snapshot, Error> {
        Ok(Snapshot {
            id: self.id().to_owned(),
            heads: self.heads.keys().cloned().collect(),
            values: self.values()?,
        })
    }

    // -----------------------------------------------------------------------
    // Reconstruction
    // -----------------------------------------------------------------------

    /// Rebuild a log from a header address produced by
    /// [`Log::to_multihash`].
    ///
    /// Fetch bounds (`length`, `exclude`, `timeout`, `progress`) pass to
    /// the fetcher unchanged; with a `length` the newest entries win
    /// because fetching expands from the heads.
    pub fn from_multihash(
        store: Arc<dyn BlockStore>,
        provider: Arc<dyn IdentityProvider>,
        identity: Identity,
        hash: &str,
        log_options: LogOptions,
        fetch_options: FetchOptions<'_>,
    ) -> Result<Log, Error> {
        let bytes = store.get(hash)?;
        let header: JsonLog = serde_json::from_slice(&bytes)?;

        let entries = fetch_all(store.as_ref(), &header.heads, fetch_options);
        let heads: Vec<Entry> = entries
            .iter()
            .filter(|e| header.heads.contains(&e.hash))
            .cloned()
            .collect();

        Log::new(
            store,
            provider,
            identity,
            LogOptions {
                id: Some(header.id),
                access: log_options.access,
                entries: Some(EntryMap::from_entries(&entries)),
                heads: Some(heads),
                clock: None,
                sort_fn: log_options.sort_fn,
            },
        )
    }

    /// Rebuild a log from a single entry address, expanding through its
    /// ancestry. Heads are recomputed from whatever was fetched.
    pub fn from_entry_hash(
        store: Arc<dyn BlockStore>,
        provider: Arc<dyn IdentityProvider>,
        identity: Identity,
        hash: &str,
        log_options: LogOptions,
        fetch_options: FetchOptions<'_>,
    ) -> Result<Log, Error> {
        let entries = fetch_all(store.as_ref(), &[hash.to_owned()], fetch_options);

        Log::new(
            store,
            provider,
            identity,
            LogOptions {
                id: log_options.id,
                access: log_options.access,
                entries: Some(EntryMap::from_entries(&entries)),
                heads: None,
                clock: None,
                sort_fn: log_options.sort_fn,
            },
        )
    }

    /// Rebuild a log from a parsed [`JsonLog`] header.
    pub fn from_json(
        store: Arc<dyn BlockStore>,
        provider: Arc<dyn IdentityProvider>,
        identity: Identity,
        header: JsonLog,
        log_options: LogOptions,
        fetch_options: FetchOptions<'_>,
    ) -> Result<Log, Error> {
        let entries = fetch_all(store.as_ref(), &header.heads, fetch_options);

        Log::new(
            store,
            provider,
            identity,
            LogOptions {
                id: Some(header.id),
                access: log_options.access,
                entries: Some(EntryMap::from_entries(&entries)),
                heads: None,
                clock: None,
                sort_fn: log_options.sort_fn,
            },
        )
    }

    /// Rebuild a log from already-held seed entries, fetching their
    /// ancestry from the store.
    ///
    /// The seeds count toward `length`; their ancestors fill the rest of
    /// the budget.
    pub fn from_entry(
        store: Arc<dyn BlockStore>,
        provider: Arc<dyn IdentityProvider>,
        identity: Identity,
        seeds: &[Entry],
        log_options: LogOptions,
        fetch_options: FetchOptions<'_>,
    ) -> Result<Log, Error> {
        if seeds.is_empty() {
            return Err(Error::NotDefined("entries"));
        }

        let mut exclude: Vec<String> = seeds.iter().map(|e| e.hash.clone()).collect();
        exclude.extend(fetch_options.exclude);

        let mut parent_hashes: Vec<String> = Vec::new();
        for seed in seeds {
            for next in &seed.next {
                if !parent_hashes.contains(next) {
                    parent_hashes.push(next.clone());
                }
            }
        }

        let fetched = fetch_all(
            store.as_ref(),
            &parent_hashes,
            FetchOptions {
                length: fetch_options
                    .length
                    .map(|length| length.saturating_sub(seeds.len())),
                exclude,
                timeout: fetch_options.timeout,
                progress: fetch_options.progress,
            },
        );

        let mut all: Vec<Entry> = seeds.to_vec();
        all.extend(fetched);

        Log::new(
            store,
            provider,
            identity,
            LogOptions {
                id: log_options.id,
                access: log_options.access,
                entries: Some(EntryMap::from_entries(&all)),
                heads: None,
                clock: None,
                sort_fn: log_options.sort_fn,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
