//! Signed, content-addressed log entries.
//!
//! An [`Entry`] is an immutable node of the log's Merkle-DAG: an opaque
//! payload, the content addresses of its predecessors (`next`), a Lamport
//! clock stamp, and the author's identity and signature. Its own content
//! address covers all of that (see [`encoding`]), so modifying any ancestor
//! invalidates every descendant's address.

pub mod encoding;
pub mod fetch;
pub mod map;
pub mod sorting;

pub use fetch::{fetch_all, FetchOptions};
pub use map::EntryMap;
pub use sorting::{last_write_wins, no_zeroes, sort_entries, Comparator};

use serde::{Deserialize, Serialize};

use crate::clock::LamportClock;
use crate::error::Error;
use crate::identity::{Identity, IdentityProvider};

/// Current entry format version.
pub const ENTRY_VERSION: u32 = 1;

/// A single immutable entry in the log's DAG.
///
/// # Wire fields
///
/// The canonical encoding carries, in key-sorted order: `clock`, `hash`
/// (nullable, stamped from the content address after decode), `id` (the
/// log id), `identity`, `key`, `next`, `payload`, `sig`, `v`. Binary
/// fields are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Content address of this entry's block, `blake3:<hex>`.
    ///
    /// Derived, not part of the signed preimage. Empty only while an entry
    /// is being built.
    #[serde(default, deserialize_with = "encoding::nullable_hash")]
    pub hash: String,

    /// Id of the log this entry belongs to.
    #[serde(rename = "id")]
    pub log_id: String,

    /// Opaque payload bytes.
    #[serde(with = "encoding::hexstr")]
    pub payload: Vec<u8>,

    /// Content addresses of predecessor entries. Empty for a root entry.
    /// Order is significant and preserved by the canonical encoding.
    pub next: Vec<String>,

    /// Entry format version.
    pub v: u32,

    /// Lamport stamp assigned at creation.
    pub clock: LamportClock,

    /// Public key bytes the signature verifies under.
    #[serde(with = "encoding::hexstr")]
    pub key: Vec<u8>,

    /// The author's identity record.
    pub identity: Identity,

    /// Signature over the canonical encoding minus `hash` and `sig`.
    #[serde(with = "encoding::hexstr")]
    pub sig: Vec<u8>,
}

/// The caller-supplied part of a new entry; [`Entry::create`] fills in the
/// rest.
#[derive(Debug, Clone)]
pub struct EntryTemplate {
    /// Id of the log the entry extends.
    pub log_id: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Predecessor content addresses.
    pub next: Vec<String>,
}

impl Entry {
    /// Build, sign, and address a new entry.
    ///
    /// Fills `v`, `clock`, `key`, and `identity`, signs the canonical
    /// preimage with `provider`, and stamps the content address. The block
    /// is **not** written to any store; callers persist it with
    /// [`Entry::to_block`] once the entry has passed their checks.
    pub fn create(
        provider: &dyn IdentityProvider,
        identity: &Identity,
        template: EntryTemplate,
        clock: &LamportClock,
    ) -> Result<Entry, Error> {
        let mut entry = Entry {
            hash: String::new(),
            log_id: template.log_id,
            payload: template.payload,
            next: template.next,
            v: ENTRY_VERSION,
            clock: clock.clone(),
            key: identity.pub_key.clone(),
            identity: identity.clone(),
            sig: Vec::new(),
        };

        let preimage = encoding::signing_preimage(&entry)?;
        entry.sig = provider.sign(identity, &preimage)?;
        entry.hash = crate::store::content_address(&encoding::encode_block(&entry)?);

        Ok(entry)
    }

    /// Verify this entry's signature against its canonical preimage.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEntry`] if the entry is missing its key or
    /// signature; [`Error::Signature`] if the signature does not verify or
    /// the key is malformed.
    pub fn verify(&self, provider: &dyn IdentityProvider) -> Result<(), Error> {
        if self.key.is_empty() {
            return Err(Error::InvalidEntry("entry has no public key".into()));
        }
        if self.sig.is_empty() {
            return Err(Error::InvalidEntry("entry has no signature".into()));
        }

        let preimage = encoding::signing_preimage(self)?;
        if provider.verify(&self.key, &preimage, &self.sig)? {
            Ok(())
        } else {
            Err(Error::Signature(
                crate::identity::IdentityError::VerificationFailed,
            ))
        }
    }

    /// The canonical block bytes to persist in a content-addressed store.
    pub fn to_block(&self) -> Result<Vec<u8>, Error> {
        encoding::encode_block(self)
    }

    /// Returns `true` iff `self` is a direct predecessor of `other`.
    #[must_use]
    pub fn is_parent(&self, other: &Entry) -> bool {
        other.next.iter().any(|n| *n == self.hash)
    }

    /// Entries in `universe` that list `self` as a direct predecessor.
    #[must_use]
    pub fn find_children<'a>(&self, universe: &'a [Entry]) -> Vec<&'a Entry> {
        universe.iter().filter(|e| self.is_parent(e)).collect()
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\tt={}\t{}",
            self.hash,
            self.identity.id,
            self.clock.time,
            String::from_utf8_lossy(&self.payload),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
