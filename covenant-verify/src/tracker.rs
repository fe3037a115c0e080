#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{BvInfo, SmtType};

/// Side table from term identity to its semantic kind.
///
/// Solver terms are opaque; width and signedness live here instead of on the term.
#[derive(Debug)]
pub struct TermTracker<K> {
    kinds: HashMap<K, SmtType>,
}

impl<K> Default for TermTracker<K> {
    fn default() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq> TermTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, term: K, kind: SmtType) {
        self.kinds.insert(term, kind);
    }

    pub fn kind(&self, term: &K) -> Option<SmtType> {
        self.kinds.get(term).copied()
    }

    /// Bit-vector metadata, defaulting to signed 32-bit for untracked terms.
    pub fn bv_info(&self, term: &K) -> BvInfo {
        match self.kinds.get(term) {
            Some(SmtType::BitVec(info)) => *info,
            _ => BvInfo::I32,
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
