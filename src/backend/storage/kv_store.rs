// src/backend/storage/kv_store.rs
// Size-bounded key-value store holding the persisted library.

use ic_stable_structures::{Memory as StableMemory, StableBTreeMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("quota exceeded: {requested} bytes requested, quota is {quota} bytes")]
    QuotaExceeded { requested: u64, quota: u64 },

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// String-keyed byte store with a fixed capacity.
///
/// A rejected `set` leaves the previous value for that key untouched.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
    /// Bytes currently held, keys included.
    fn used_bytes(&self) -> u64;
    fn quota_bytes(&self) -> u64;
}

/// `KvStore` over a stable B-tree map, with the quota enforced on every write.
pub struct StableKvStore<M: StableMemory> {
    map: StableBTreeMap<String, Vec<u8>, M>,
    quota_bytes: u64,
}

impl<M: StableMemory> StableKvStore<M> {
    pub fn init(memory: M, quota_bytes: u64) -> Self {
        Self {
            map: StableBTreeMap::init(memory),
            quota_bytes,
        }
    }

    fn entry_size(key: &str, value_len: usize) -> u64 {
        (key.len() + value_len) as u64
    }
}

impl<M: StableMemory> KvStore for StableKvStore<M> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.map.get(&key.to_string())
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let key = key.to_string();
        let current = self
            .map
            .get(&key)
            .map_or(0, |old| Self::entry_size(&key, old.len()));
        let requested = Self::entry_size(&key, value.len());
        let projected = self.used_bytes() - current + requested;
        if projected > self.quota_bytes {
            return Err(StoreError::QuotaExceeded {
                requested,
                quota: self.quota_bytes,
            });
        }
        self.map.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(&key.to_string());
    }

    fn used_bytes(&self) -> u64 {
        self.map
            .iter()
            .map(|(key, value)| Self::entry_size(&key, value.len()))
            .sum()
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_stable_structures::DefaultMemoryImpl;

    fn store(quota: u64) -> StableKvStore<DefaultMemoryImpl> {
        StableKvStore::init(DefaultMemoryImpl::default(), quota)
    }

    #[test]
    fn writes_within_quota_are_readable() {
        let mut kv = store(64);
        kv.set("k", b"hello".to_vec()).unwrap();
        assert_eq!(kv.get("k"), Some(b"hello".to_vec()));
        assert_eq!(kv.used_bytes(), 6);
    }

    #[test]
    fn rejected_write_keeps_previous_value() {
        let mut kv = store(16);
        kv.set("k", vec![1; 10]).unwrap();
        let err = kv.set("k", vec![2; 20]).unwrap_err();
        assert_eq!(
            err,
            StoreError::QuotaExceeded {
                requested: 21,
                quota: 16
            }
        );
        assert_eq!(kv.get("k"), Some(vec![1; 10]));
    }

    #[test]
    fn overwrite_only_counts_the_new_value() {
        let mut kv = store(12);
        kv.set("k", vec![0; 11]).unwrap();
        // Replacing an 11-byte value with another still fits.
        kv.set("k", vec![1; 11]).unwrap();
        kv.remove("k");
        assert_eq!(kv.used_bytes(), 0);
        assert_eq!(kv.get("k"), None);
    }
}
