//! In-process key/value loader

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::item::Item;
use crate::loader::Loader;

/// Loader backed by an in-memory map of target name to content
///
/// Values are copied on the way in and on the way out, so callers never
/// share a buffer with the store.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `target` unless the target already exists.
    ///
    /// Returns `true` when the value was stored, or when the existing value
    /// is equal to `value`. An existing value is never overwritten.
    pub fn add(&self, target: impl Into<String>, value: &[u8]) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let target = target.into();

        match items.get(&target) {
            Some(existing) => existing.as_slice() == value,
            None => {
                log::trace!("memory loader: added '{}' ({} bytes)", target, value.len());
                items.insert(target, value.to_vec());
                true
            }
        }
    }

    /// Store `value` under `target`, replacing any existing value.
    ///
    /// `None` removes the target.
    pub fn set(&self, target: impl Into<String>, value: Option<&[u8]>) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let target = target.into();

        match value {
            Some(value) => {
                items.insert(target, value.to_vec());
            }
            None => {
                items.remove(&target);
            }
        }
    }

    /// Remove `target`, returning whether it was present
    pub fn remove(&self, target: &str) -> bool {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(target)
            .is_some()
    }

    /// Copy of the value stored under `target`
    pub fn get(&self, target: &str) -> Option<Vec<u8>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Loader for MemoryLoader {
    fn load(&self, target: &str) -> Result<Option<Item>> {
        Ok(self.get(target).map(Item::new))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
