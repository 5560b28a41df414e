//! Range queries over the total order.
//!
//! [`Log::iterator`] walks the DAG in descending total order between
//! optional bound entries. Bounds follow interval-query conventions:
//! `lte`/`lt` pick the starting frontier (defaulting to the heads),
//! `gte`/`gt` name the entry the walk stops at, and `gt` additionally
//! drops the bound itself from the result. `amount` caps the result,
//! keeping the entries closest to the lower bound when one is given.

use crate::entry::{Entry, EntryMap};
use crate::error::Error;

use super::Log;

/// Bounds for [`Log::iterator`]. All fields default to unbounded.
#[derive(Default, Clone)]
pub struct IteratorOptions {
    /// Exclusive lower bound: stop at this entry and drop it.
    pub gt: Option<Entry>,
    /// Inclusive lower bound: stop at this entry and keep it.
    pub gte: Option<Entry>,
    /// Start the walk from this entry (kept in the result).
    pub lt: Option<Entry>,
    /// Inclusive upper bound: start the walk from this entry.
    pub lte: Option<Entry>,
    /// Maximum number of entries. `None` is unbounded; `Some(0)` yields
    /// nothing.
    pub amount: Option<usize>,
}

impl Log {
    /// Entries between the given bounds, in descending total order.
    pub fn iterator(&self, options: IteratorOptions) -> Result<Vec<Entry>, Error> {
        if options.amount == Some(0) {
            return Ok(Vec::new());
        }

        let start: Vec<Entry> = if let Some(lte) = &options.lte {
            vec![lte.clone()]
        } else if let Some(lt) = &options.lt {
            vec![lt.clone()]
        } else {
            self.heads()?
        };

        let end_hash = options
            .gte
            .as_ref()
            .map(|e| e.hash.clone())
            .or_else(|| options.gt.as_ref().map(|e| e.hash.clone()));

        // With a lower bound the walk must reach it before the cap applies;
        // the amount is enforced afterwards, keeping the bound-adjacent end.
        let count = if end_hash.is_none() {
            options.amount
        } else {
            None
        };

        let roots = EntryMap::from_entries(&start);
        let mut entries = self.traverse(&roots, count, end_hash.as_deref())?;

        if options.gt.is_some() {
            entries.pop();
        }

        if options.gt.is_some() || options.gte.is_some() {
            if let Some(amount) = options.amount {
                if entries.len() > amount {
                    entries = entries.split_off(entries.len() - amount);
                }
            }
        }

        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
