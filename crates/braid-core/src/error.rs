//! Crate-wide error type with machine-readable codes.

use crate::access::AccessError;
use crate::identity::IdentityError;
use crate::store::StoreError;

/// Machine-readable codes for [`Error`], for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A required collaborator or option was not supplied.
    ConfigurationMissing,
    /// The block store failed.
    StoreFailure,
    /// Signing or signature verification failed.
    SignatureFailure,
    /// The access controller refused an entry.
    AccessDenied,
    /// An entry was malformed or failed integrity checks.
    InvalidEntry,
    /// A traversal was started without usable roots.
    TraversalInvalid,
    /// The comparator could not produce a total order.
    AmbiguousOrder,
}

/// Errors surfaced by log operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required collaborator or option was not supplied.
    #[error("{0} not defined")]
    NotDefined(&'static str),

    /// A block store operation failed.
    #[error("block store failure: {0}")]
    Store(#[from] StoreError),

    /// Signing failed or a signature could not be verified.
    #[error("unable to check signature: {0}")]
    Signature(#[from] IdentityError),

    /// The access controller refused an entry.
    #[error("access denied: {0}")]
    Access(#[from] AccessError),

    /// An entry was malformed or failed an integrity check.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// Entry (de)serialization failed.
    #[error("entry encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A traversal was requested without any usable root entries.
    #[error("traversal requires at least one root entry")]
    Traversal,

    /// The comparator returned equality for distinct entries even after the
    /// payload and hash fallbacks. Impossible for well-formed
    /// content-addressed entries; kept as a guard.
    #[error("comparator could not order entries {a} and {b}")]
    AmbiguousOrder {
        /// Hash of the first entry.
        a: String,
        /// Hash of the second entry.
        b: String,
    },

    /// An append aborted; the log was left unchanged.
    #[error("append failed: {source}")]
    Append {
        /// The underlying failure.
        source: Box<Error>,
    },

    /// A join aborted; the log was left unchanged.
    #[error("join failed: {source}")]
    Join {
        /// The underlying failure.
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error as an append failure.
    #[must_use]
    pub fn append(source: Error) -> Self {
        Error::Append {
            source: Box::new(source),
        }
    }

    /// Wrap an error as a join failure.
    #[must_use]
    pub fn join(source: Error) -> Self {
        Error::Join {
            source: Box::new(source),
        }
    }

    /// Return the machine-readable code for this error.
    ///
    /// Wrapper variants (`Append`, `Join`) delegate to their cause.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotDefined(_) => ErrorCode::ConfigurationMissing,
            Error::Store(_) => ErrorCode::StoreFailure,
            Error::Signature(_) => ErrorCode::SignatureFailure,
            Error::Access(_) => ErrorCode::AccessDenied,
            Error::InvalidEntry(_) | Error::Encoding(_) => ErrorCode::InvalidEntry,
            Error::Traversal => ErrorCode::TraversalInvalid,
            Error::AmbiguousOrder { .. } => ErrorCode::AmbiguousOrder,
            Error::Append { source } | Error::Join { source } => source.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
