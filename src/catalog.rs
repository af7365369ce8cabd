// catalog.rs
// Per-seller catalog store with atomic removal

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::matcher;
use crate::model::{ItemRecord, RequestCriteria};

/// A seller's catalog: normalized key -> ordered records under that key.
///
/// Keys are lowercased before storage; item names need not be unique, so
/// one key may shelve several records (insertion order preserved).
/// Exclusively owned by one seller and mutated only inside that seller's
/// single-threaded message processing, which is what makes
/// `remove_first` a check-and-remove no racing purchase can split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    shelves: BTreeMap<String, Vec<ItemRecord>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Add a record under its normalized name, keeping earlier records
    /// with the same key.
    pub fn insert(&mut self, record: ItemRecord) {
        self.shelves
            .entry(Self::normalize(&record.name))
            .or_default()
            .push(record);
    }

    /// Insert-or-overwrite form: any previous records under the same
    /// normalized key are dropped first.
    pub fn replace(&mut self, record: ItemRecord) {
        self.shelves
            .insert(Self::normalize(&record.name), vec![record]);
    }

    /// All records satisfying the criteria, in natural catalog order
    /// (key-sorted, insertion order within a key).
    pub fn matching(&self, criteria: &RequestCriteria) -> Vec<ItemRecord> {
        self.iter()
            .filter(|record| matcher::matches(record, criteria))
            .cloned()
            .collect()
    }

    /// Remove and return the first record under the key, if present.
    ///
    /// At most one caller can ever obtain a given record from here.
    pub fn remove_first(&mut self, key: &str) -> Option<ItemRecord> {
        let key = Self::normalize(key);
        match self.shelves.get_mut(&key) {
            Some(shelf) if !shelf.is_empty() => {
                let record = shelf.remove(0);
                if shelf.is_empty() {
                    self.shelves.remove(&key);
                }
                Some(record)
            }
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shelves.contains_key(&Self::normalize(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemRecord> {
        self.shelves.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.shelves.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }
}

impl FromIterator<ItemRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = ItemRecord>>(records: I) -> Self {
        let mut catalog = Catalog::new();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }
}
