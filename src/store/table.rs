//! Storage-access seam for the place stores.
//!
//! Every store receives a [`Table`] at construction instead of opening
//! connections ad hoc, so the same store logic runs against the sled backend
//! in production and the in-memory backend in tests.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// An id-keyed table of serialized rows with monotonic id allocation.
///
/// `scan` yields rows in ascending id order; first-wins and lowest-id-wins
/// policies in the stores rely on that.
pub trait Table: Send + Sync {
    fn next_id(&self) -> Result<u64>;
    fn get(&self, id: u64) -> Result<Option<Vec<u8>>>;
    fn put(&self, id: u64, bytes: &[u8]) -> Result<()>;
    /// Returns whether a row existed.
    fn delete(&self, id: u64) -> Result<bool>;
    fn scan(&self) -> Result<Vec<(u64, Vec<u8>)>>;
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
