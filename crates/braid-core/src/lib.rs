#![forbid(unsafe_code)]
//! braid-core: an append-only, signed Merkle-DAG log with a deterministic
//! total order (an operation-based CRDT).
//!
//! Entries are content-addressed and reference their predecessors by
//! address, forming a DAG; a Lamport clock plus deterministic tie-breaking
//! turns the partial order into a total order every replica agrees on.
//! Two replicas that have exchanged the same entries converge to the same
//! sequence without coordination.
//!
//! ```
//! use std::sync::Arc;
//! use braid_core::{Keystore, Log, LogOptions, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let keystore = Arc::new(Keystore::new());
//! let identity = keystore.create_identity("userA");
//!
//! let mut log = Log::new(
//!     store,
//!     keystore,
//!     identity,
//!     LogOptions { id: Some("example".into()), ..LogOptions::default() },
//! )?;
//! log.append(b"hello", 1)?;
//! log.append(b"world", 1)?;
//!
//! let payloads: Vec<_> = log.values()?.into_iter().map(|e| e.payload).collect();
//! assert_eq!(payloads, vec![b"hello".to_vec(), b"world".to_vec()]);
//! # Ok::<(), braid_core::Error>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: typed [`Error`] with machine-readable [`ErrorCode`]s;
//!   fallible paths never panic.
//! - **Logging**: `tracing` macros at interesting seams.

pub mod access;
pub mod clock;
pub mod entry;
pub mod error;
pub mod identity;
pub mod log;
pub mod store;

pub use access::{AccessController, AccessError, PermissiveAccess};
pub use clock::LamportClock;
pub use entry::{
    fetch_all, last_write_wins, no_zeroes, sort_entries, Comparator, Entry, EntryMap,
    EntryTemplate, FetchOptions,
};
pub use error::{Error, ErrorCode};
pub use identity::{Identity, IdentityError, IdentityProvider, Keystore};
pub use log::{
    find_heads, find_tail_hashes, find_tails, IteratorOptions, JsonLog, Log, LogOptions, Snapshot,
};
pub use store::{content_address, BlockStore, MemoryStore, StoreError};
