use hashbrown::HashTable;

use crate::heap::ObjId;

/// Hashes a dict key with a fixed-seed hasher.
///
/// Seeds are fixed so hashes are stable across runs; dict iteration order is
/// insertion order regardless, so no hash-order behavior leaks out.
pub(crate) fn str_hash(key: &str) -> u64 {
    use std::hash::BuildHasher;
    ahash::RandomState::with_seeds(0x9e37_79b9, 0x7f4a_7c15, 0xf39c_c060, 0x5ced_c834).hash_one(key)
}

#[derive(Debug, Clone)]
struct DictEntry {
    key: String,
    value: ObjId,
    /// cached so table rebuilds don't re-hash
    hash: u64,
}

/// Insertion-ordered mapping from canonical-string keys to object handles.
///
/// Storage strategy: a `HashTable<usize>` maps key hashes to indices in a
/// dense `Vec<DictEntry>` that preserves insertion order. Lookups are O(1);
/// iteration follows insertion order. Overwriting an existing key keeps its
/// position; removing a key removes it from the order.
#[derive(Debug, Default)]
pub(crate) struct Dict {
    /// indices mapping from the entry hash to its index.
    indices: HashTable<usize>,
    /// entries is a dense vec maintaining entry order.
    entries: Vec<DictEntry>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<ObjId> {
        let hash = str_hash(key);
        let entries = &self.entries;
        self.indices
            .find(hash, |&i| entries[i].key == key)
            .map(|&i| entries[i].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a key/value pair. An existing key keeps its insertion
    /// position; the previous value is returned.
    pub fn insert(&mut self, key: String, value: ObjId) -> Option<ObjId> {
        let hash = str_hash(&key);
        let entries = &self.entries;
        let existing = self.indices.find(hash, |&i| entries[i].key == key).copied();
        match existing {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].value, value)),
            None => {
                let i = self.entries.len();
                self.entries.push(DictEntry { key, value, hash });
                let entries = &self.entries;
                self.indices.insert_unique(hash, i, |&j| entries[j].hash);
                None
            }
        }
    }

    /// Removes a key, dropping it from the insertion order.
    pub fn remove(&mut self, key: &str) -> Option<ObjId> {
        let hash = str_hash(key);
        let entries = &self.entries;
        let Ok(occupied) = self.indices.find_entry(hash, |&i| entries[i].key == key) else {
            return None;
        };
        let (i, _) = occupied.remove();
        let entry = self.entries.remove(i);
        // later entries shifted down by one; fix their table indices
        for slot in self.indices.iter_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(entry.value)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = ObjId> {
        self.entries.iter().map(|e| e.value)
    }

    /// Key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjId)> {
        self.entries.iter().map(|e| (e.key.as_str(), e.value))
    }
}

impl Clone for Dict {
    fn clone(&self) -> Self {
        let entries = self.entries.clone();
        let mut indices = HashTable::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            indices.insert_unique(entry.hash, i, |&j| entries[j].hash);
        }
        Self { indices, entries }
    }
}

impl FromIterator<(String, ObjId)> for Dict {
    fn from_iter<I: IntoIterator<Item = (String, ObjId)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}
