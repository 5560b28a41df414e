//! Content-addressed block storage.
//!
//! Blocks are opaque byte strings addressed by the BLAKE3 hash of their
//! content, rendered `blake3:<lowercase hex>`. The address algorithm is
//! fixed: the same bytes always yield the same address, on every replica.
//!
//! [`MemoryStore`] is the bundled backend, suitable for tests and
//! memory-only replicas; durable backends implement [`BlockStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

/// Compute the content address of a block: `blake3:<lowercase hex>`.
#[must_use]
pub fn content_address(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes).to_hex())
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No block exists under the requested address.
    #[error("block not found: {0}")]
    NotFound(String),

    /// The backend failed (I/O, network, capacity).
    #[error("store backend failure: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A content-addressed block store.
///
/// Implementations must be `Send + Sync`; the log itself is single-owner
/// but stores are commonly shared between replicas in tests and between
/// logs in applications.
pub trait BlockStore: Send + Sync {
    /// Store `bytes` and return their content address.
    ///
    /// Writing the same bytes twice is a no-op returning the same address.
    fn put(&self, bytes: &[u8]) -> Result<String, StoreError>;

    /// Fetch the block stored under `address`.
    fn get(&self, address: &str) -> Result<Vec<u8>, StoreError>;

    /// Return whether a block exists under `address`.
    fn has(&self, address: &str) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory block store backed by a `RwLock<HashMap>`.
pub struct MemoryStore {
    blocks: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().expect("store lock poisoned").len()
    }

    /// Returns `true` if the store holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for MemoryStore {
    fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let address = content_address(bytes);
        let mut blocks = self.blocks.write().expect("store lock poisoned");
        if blocks.insert(address.clone(), bytes.to_vec()).is_none() {
            debug!(%address, size = bytes.len(), "stored block");
        }
        Ok(address)
    }

    fn get(&self, address: &str) -> Result<Vec<u8>, StoreError> {
        let blocks = self.blocks.read().expect("store lock poisoned");
        blocks
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.to_owned()))
    }

    fn has(&self, address: &str) -> Result<bool, StoreError> {
        let blocks = self.blocks.read().expect("store lock poisoned");
        Ok(blocks.contains_key(address))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
