//! Process-lifetime record of items that have already been relayed.
//!
//! Identifiers are kept per [`SourceKind`] in plain hash sets. Nothing is
//! ever evicted and nothing is persisted: the sets grow for as long as the
//! process runs and are lost on restart. Long-running deployments would
//! want a bounded structure here (e.g. an LRU of identifiers).

use std::collections::{HashMap, HashSet};

use crate::source::SourceKind;

#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashMap<SourceKind, HashSet<String>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn has(&self, kind: SourceKind, id: &str) -> bool {
        self.seen.get(&kind).is_some_and(|ids| ids.contains(id))
    }

    /// Record `id` for `kind`. Idempotent.
    ///
    /// Returns `true` if the identifier was not known before, which lets the
    /// poll loop check and record in one step.
    pub fn record(&mut self, kind: SourceKind, id: &str) -> bool {
        self.seen.entry(kind).or_default().insert(id.to_string())
    }

    /// Number of identifiers recorded for `kind`.
    pub fn len(&self, kind: SourceKind) -> usize {
        self.seen.get(&kind).map_or(0, HashSet::len)
    }
}
