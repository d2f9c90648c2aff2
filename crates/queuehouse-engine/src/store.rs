//! Tier Contracts and Reference Implementations
//!
//! Two storage tiers back every queue actor:
//!
//! - **Hot tier** ([`HotStore`]): the actor's own persisted state region.
//!   Mutations are staged and land together on `commit` - this is the only
//!   atomicity the engine relies on. Reads observe staged mutations, so an
//!   operation sees its own writes before committing.
//! - **Cold tier** ([`ColdStore`]): a key-value store shared across actors.
//!   Operations execute individually and may fail independently; there is no
//!   atomicity contract across keys.
//!
//! ## Implementations
//!
//! - [`InMemoryHotStore`]: committed map plus a staged overlay. Stands in for
//!   the host runtime's state transport in tests and examples, and exposes
//!   the committed view so tests can assert on persisted layout.
//! - [`ObjectStoreColdStore`]: wraps any `object_store::ObjectStore`
//!   (in-memory for tests, S3-compatible stores in production).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use queuehouse_core::{Error, Result};

/// The actor's atomically-persisted state region.
#[async_trait]
pub trait HotStore: Send + Sync {
    /// Read a value. Staged mutations from the current operation are visible.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Stage a write. Not persisted until `commit`.
    async fn put(&mut self, key: &str, value: Bytes) -> Result<()>;

    /// Stage a deletion. Not persisted until `commit`.
    async fn delete(&mut self, key: &str) -> Result<()>;

    /// Atomically persist every mutation staged since the previous commit.
    /// On failure nothing staged is persisted.
    async fn commit(&mut self) -> Result<()>;
}

/// The shared cold store. No atomicity across keys; each call may fail on
/// its own.
#[async_trait]
pub trait ColdStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
struct HotState {
    committed: HashMap<String, Bytes>,
    /// Staged overlay; `None` marks a staged deletion.
    staged: HashMap<String, Option<Bytes>>,
}

/// In-memory hot tier with commit semantics.
///
/// Clones share the same underlying state, so a test can keep one handle for
/// inspection while the engine owns another:
///
/// ```ignore
/// let hot = InMemoryHotStore::new();
/// let view = hot.clone();
/// let mut engine = QueueEngine::new(Box::new(hot), cold, "actor-1");
/// // ... drive the engine, then assert on view.committed_keys()
/// ```
#[derive(Clone, Default)]
pub struct InMemoryHotStore {
    state: Arc<Mutex<HotState>>,
}

impl InMemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed value of `key`, ignoring staged mutations.
    pub fn committed(&self, key: &str) -> Option<Bytes> {
        self.state.lock().unwrap().committed.get(key).cloned()
    }

    /// All committed keys, sorted.
    pub fn committed_keys(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut keys: Vec<String> = state.committed.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Discard staged mutations without committing, as a crash between
    /// suspension points would.
    pub fn drop_staged(&self) {
        self.state.lock().unwrap().staged.clear();
    }
}

#[async_trait]
impl HotStore for InMemoryHotStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let state = self.state.lock().unwrap();
        match state.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(state.committed.get(key).cloned()),
        }
    }

    async fn put(&mut self, key: &str, value: Bytes) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .staged
            .insert(key.to_string(), Some(value));
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .staged
            .insert(key.to_string(), None);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let staged: Vec<(String, Option<Bytes>)> = state.staged.drain().collect();
        for (key, value) in staged {
            match value {
                Some(value) => {
                    state.committed.insert(key, value);
                }
                None => {
                    state.committed.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Cold tier backed by an `object_store::ObjectStore`.
pub struct ObjectStoreColdStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreColdStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ColdStore for ObjectStoreColdStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match self.store.get(&Path::from(key)).await {
            Ok(result) => {
                let data = result
                    .bytes()
                    .await
                    .map_err(|e| Error::ColdStoreUnavailable(e.to_string()))?;
                Ok(Some(data))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(Error::ColdStoreUnavailable(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.store
            .put(&Path::from(key), PutPayload::from(value))
            .await
            .map_err(|e| Error::ColdStoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.store.delete(&Path::from(key)).await {
            Ok(()) => Ok(()),
            // Idempotent: a retried delete after a partial failure is fine.
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(Error::ColdStoreUnavailable(e.to_string())),
        }
    }
}
