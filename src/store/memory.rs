//! In-memory [`Table`] backend, the test substitute for the sled store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::Result;

use super::table::Table;

#[derive(Default)]
pub struct MemTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<u64, Vec<u8>>,
    next_id: u64,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Table for MemTable {
    fn next_id(&self) -> Result<u64> {
        let mut inner = self.inner.write().expect("table lock poisoned");
        inner.next_id += 1;
        Ok(inner.next_id)
    }

    fn get(&self, id: u64) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().expect("table lock poisoned");
        Ok(inner.rows.get(&id).cloned())
    }

    fn put(&self, id: u64, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().expect("table lock poisoned");
        inner.rows.insert(id, bytes.to_vec());
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<bool> {
        let mut inner = self.inner.write().expect("table lock poisoned");
        Ok(inner.rows.remove(&id).is_some())
    }

    fn scan(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        let inner = self.inner.read().expect("table lock poisoned");
        Ok(inner.rows.iter().map(|(id, b)| (*id, b.clone())).collect())
    }
}
