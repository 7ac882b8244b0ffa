//! MemTable implementation

use std::collections::BTreeMap;

use crate::wal::Operation;

/// In-memory key/value image of a store
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<String, Vec<u8>>,
    /// Approximate size in bytes (keys + values)
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Put a key-value pair, replacing any previous value
    pub fn put(&mut self, key: String, value: Vec<u8>) {
        let key_len = key.len();
        let value_len = value.len();
        match self.data.insert(key, value) {
            // key already counted
            Some(old) => self.size = self.size + value_len - old.len(),
            None => self.size += key_len + value_len,
        }
    }

    /// Delete a key, returning whether it existed
    pub fn delete(&mut self, key: &str) -> bool {
        match self.data.remove(key) {
            Some(old) => {
                self.size -= key.len() + old.len();
                true
            }
            None => false,
        }
    }

    /// Apply a logged operation
    pub fn apply(&mut self, operation: Operation) {
        match operation {
            Operation::Put { key, value } => self.put(key, value),
            Operation::Delete { key } => {
                self.delete(&key);
            }
            Operation::Clear => self.clear(),
        }
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }

    /// All keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Entries in sorted key order (for snapshots)
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.data.iter()
    }
}

impl FromIterator<(String, Vec<u8>)> for MemTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        let mut table = MemTable::new();
        for (key, value) in iter {
            table.put(key, value);
        }
        table
    }
}
