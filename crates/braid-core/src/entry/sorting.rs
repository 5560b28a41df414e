//! Entry comparators and the total-order guarantee.
//!
//! The log sorts entries with a caller-supplied comparator wrapped by
//! [`no_zeroes`], which turns any partial tie into a deterministic order:
//!
//! 1. The wrapped comparator (default [`last_write_wins`]: Lamport time,
//!    then clock id bytes).
//! 2. Payload bytes.
//! 3. Content address bytes. Distinct entries always differ here, so the
//!    chain cannot tie; [`Error::AmbiguousOrder`] is a defensive guard.
//!
//! Comparators are first-class values (`Arc` closures) so decorators like
//! `no_zeroes` compose without any trait machinery.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::Error;

use super::Entry;

/// A fallible comparator over entries, shared by the log and its walks.
pub type Comparator = Arc<dyn Fn(&Entry, &Entry) -> Result<Ordering, Error> + Send + Sync>;

/// Base total-order comparator: Lamport time first, then clock id bytes.
///
/// Returns `Equal` for entries whose stamps tie exactly; the log always
/// runs this under [`no_zeroes`].
pub fn last_write_wins(a: &Entry, b: &Entry) -> Result<Ordering, Error> {
    Ok(sort_step_clocks(a, b))
}

fn sort_step_clocks(a: &Entry, b: &Entry) -> Ordering {
    a.clock
        .time
        .cmp(&b.clock.time)
        .then_with(|| a.clock.id.cmp(&b.clock.id))
}

/// Decorate `inner` so it never returns `Equal` for distinct entries.
///
/// Falls back to payload bytes, then content address bytes. Errors with
/// [`Error::AmbiguousOrder`] only if every level ties.
#[must_use]
pub fn no_zeroes(inner: Comparator) -> Comparator {
    Arc::new(move |a, b| {
        let ord = inner(a, b)?;
        if ord != Ordering::Equal {
            return Ok(ord);
        }

        let ord = a.payload.cmp(&b.payload);
        if ord != Ordering::Equal {
            return Ok(ord);
        }

        let ord = a.hash.cmp(&b.hash);
        if ord != Ordering::Equal {
            return Ok(ord);
        }

        Err(Error::AmbiguousOrder {
            a: a.hash.clone(),
            b: b.hash.clone(),
        })
    })
}

/// Stable-sort `entries` ascending under `comparator`.
///
/// The comparator is fallible but `sort_by` is not, so the first error is
/// parked and re-raised after the sort completes; the slice's order is
/// unspecified in that case.
pub fn sort_entries(comparator: &Comparator, entries: &mut [Entry]) -> Result<(), Error> {
    let mut first_error: Option<Error> = None;

    entries.sort_by(|a, b| match comparator(a, b) {
        Ok(ord) => ord,
        Err(err) => {
            if first_error.is_none() {
                first_error = Some(err);
            }
            Ordering::Equal
        }
    });

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
