//! Author identities and the signing provider seam.
//!
//! An [`Identity`] is the serializable record embedded in every entry: a
//! caller-chosen id plus the Ed25519 public key the entry's signature
//! verifies under. Signing itself goes through the [`IdentityProvider`]
//! trait so the log never touches private key material; the in-memory
//! [`Keystore`] is the default provider.

use std::collections::HashMap;
use std::sync::RwLock;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Ed25519 public keys are 32 bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;
/// Ed25519 signatures are 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from signing, verification, or key handling.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The keystore holds no signing key for the given identity id.
    #[error("no signing key for identity {0:?}")]
    UnknownIdentity(String),

    /// A public key had the wrong length or was not a valid curve point.
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    /// A signature had the wrong length.
    #[error("malformed signature: expected {SIGNATURE_LENGTH} bytes, got {0}")]
    MalformedSignature(usize),

    /// The signature did not verify under the given public key.
    #[error("signature verification failed")]
    VerificationFailed,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The public, serializable record of an entry author.
///
/// Embedded verbatim in every entry; its canonical encoding is part of the
/// signed preimage, so two replicas always agree on its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Caller-chosen identifier (e.g. `"userA"`).
    pub id: String,
    /// Ed25519 public key bytes the author signs under.
    #[serde(with = "crate::entry::encoding::hexstr")]
    pub pub_key: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

/// Signs on behalf of a local identity and verifies foreign signatures.
///
/// `verify` is stateless (everything needed is in the entry), so a provider
/// can check entries authored by identities it has never seen.
pub trait IdentityProvider: Send + Sync {
    /// Sign `data` with the private key backing `identity`.
    fn sign(&self, identity: &Identity, data: &[u8]) -> Result<Vec<u8>, IdentityError>;

    /// Verify `sig` over `data` under the raw public `key` bytes.
    fn verify(&self, key: &[u8], data: &[u8], sig: &[u8]) -> Result<bool, IdentityError>;
}

// ---------------------------------------------------------------------------
// Keystore
// ---------------------------------------------------------------------------

/// In-memory keystore mapping identity ids to Ed25519 signing keys.
pub struct Keystore {
    keys: RwLock<HashMap<String, SigningKey>>,
}

impl Keystore {
    /// Create an empty keystore.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Generate a fresh keypair for `id` and return its public [`Identity`].
    ///
    /// Calling this again for the same id rotates the key; entries signed
    /// under the old key still verify (the public key travels with the
    /// entry).
    pub fn create_identity(&self, id: &str) -> Identity {
        let signing = SigningKey::generate(&mut OsRng);
        let identity = Identity {
            id: id.to_owned(),
            pub_key: signing.verifying_key().to_bytes().to_vec(),
        };
        self.keys
            .write()
            .expect("keystore lock poisoned")
            .insert(id.to_owned(), signing);
        identity
    }

    /// Return the identity record for `id`, if a key exists.
    #[must_use]
    pub fn identity(&self, id: &str) -> Option<Identity> {
        let keys = self.keys.read().expect("keystore lock poisoned");
        keys.get(id).map(|signing| Identity {
            id: id.to_owned(),
            pub_key: signing.verifying_key().to_bytes().to_vec(),
        })
    }
}

impl Default for Keystore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for Keystore {
    fn sign(&self, identity: &Identity, data: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let keys = self.keys.read().expect("keystore lock poisoned");
        let signing = keys
            .get(&identity.id)
            .ok_or_else(|| IdentityError::UnknownIdentity(identity.id.clone()))?;
        Ok(signing.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, key: &[u8], data: &[u8], sig: &[u8]) -> Result<bool, IdentityError> {
        verify_detached(key, data, sig)
    }
}

/// Verify an Ed25519 signature from raw byte slices.
///
/// Uses strict verification, rejecting malleable encodings.
pub fn verify_detached(key: &[u8], data: &[u8], sig: &[u8]) -> Result<bool, IdentityError> {
    let key: [u8; PUBLIC_KEY_LENGTH] = key
        .try_into()
        .map_err(|_| IdentityError::MalformedKey(format!("expected {PUBLIC_KEY_LENGTH} bytes, got {}", key.len())))?;
    let key = VerifyingKey::from_bytes(&key)
        .map_err(|err| IdentityError::MalformedKey(err.to_string()))?;
    let sig: [u8; SIGNATURE_LENGTH] = sig
        .try_into()
        .map_err(|_| IdentityError::MalformedSignature(sig.len()))?;
    let sig = Signature::from_bytes(&sig);
    Ok(key.verify_strict(data, &sig).is_ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
