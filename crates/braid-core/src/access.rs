//! Append authorization seam.
//!
//! The log consults an [`AccessController`] before admitting any entry,
//! whether produced locally by `append` or received through `join`. The
//! default controller admits everything; deployments gate writes by
//! supplying their own implementation.

use crate::entry::Entry;
use crate::identity::Identity;

/// Error returned when a controller refuses an entry.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct AccessError {
    /// Human-readable refusal reason.
    pub reason: String,
}

impl AccessError {
    /// Build a refusal with the given reason.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Policy predicate deciding whether an entry may enter the log.
pub trait AccessController: Send + Sync {
    /// Return `Ok(())` to admit `entry`, or an [`AccessError`] to refuse it.
    ///
    /// `identity` is the local log owner's identity, not necessarily the
    /// entry author's (the author travels inside the entry).
    fn can_append(&self, entry: &Entry, identity: &Identity) -> Result<(), AccessError>;
}

/// The default controller: admits every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAccess;

impl AccessController for PermissiveAccess {
    fn can_append(&self, _entry: &Entry, _identity: &Identity) -> Result<(), AccessError> {
        Ok(())
    }
}
