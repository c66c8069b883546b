use crate::types::{Address, H256};
use std::collections::BTreeMap;

/// Persistent state of every enforcer, namespaced by enforcer address.
///
/// Cloned as a whole to snapshot before a redemption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnforcerStorage {
    entries: BTreeMap<(Address, H256), Vec<u8>>,
}

impl EnforcerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// View restricted to `enforcer`'s namespace.
    pub fn scoped(&mut self, enforcer: Address) -> EnforcerStore<'_> {
        EnforcerStore {
            enforcer,
            storage: self,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct EnforcerStore<'a> {
    enforcer: Address,
    storage: &'a mut EnforcerStorage,
}

impl EnforcerStore<'_> {
    pub fn enforcer(&self) -> Address {
        self.enforcer
    }

    pub fn get(&self, key: &H256) -> Option<&[u8]> {
        self.storage
            .entries
            .get(&(self.enforcer, *key))
            .map(Vec::as_slice)
    }

    pub fn contains(&self, key: &H256) -> bool {
        self.storage.entries.contains_key(&(self.enforcer, *key))
    }

    pub fn set(&mut self, key: H256, value: Vec<u8>) {
        self.storage.entries.insert((self.enforcer, key), value);
    }

    pub fn remove(&mut self, key: &H256) -> Option<Vec<u8>> {
        self.storage.entries.remove(&(self.enforcer, *key))
    }

    /// Read a counter; missing or malformed entries read as zero.
    pub fn get_u128(&self, key: &H256) -> u128 {
        self.get(key)
            .and_then(|raw| <[u8; 16]>::try_from(raw).ok())
            .map(u128::from_be_bytes)
            .unwrap_or(0)
    }

    pub fn set_u128(&mut self, key: H256, value: u128) {
        self.set(key, value.to_be_bytes().to_vec());
    }
}
