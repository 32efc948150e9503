//! Durable key-value storage for client state.
//!
//! Everything the client remembers between runs (the session, today) goes
//! through [`KeyValueStore`]. Values are opaque strings; callers own the
//! encoding.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A synchronous string-to-string store.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads and decodes a JSON value.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(sonic_rs::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes and writes a JSON value.
pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = sonic_rs::to_string(value)?;
    store.set(key, &raw)
}
