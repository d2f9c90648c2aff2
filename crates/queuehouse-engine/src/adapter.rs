//! Typed Two-Tier State Access
//!
//! [`StateAdapter`] sits between the engine and the raw tier contracts. It
//! owns the key layout and the blob codec so the rest of the engine works in
//! terms of `Vec<Item>` segments and the [`Metadata`] document, never raw
//! bytes. Blobs decode once on load and encode once at write time.
//!
//! The cold client is injected by the host and shared across actors; the hot
//! store is owned exclusively by this actor.

use std::sync::Arc;

use bytes::Bytes;
use queuehouse_core::{Item, Metadata, Result};

use crate::keys;
use crate::store::{ColdStore, HotStore};

pub struct StateAdapter {
    hot: Box<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    actor_id: String,
}

impl StateAdapter {
    pub fn new(hot: Box<dyn HotStore>, cold: Arc<dyn ColdStore>, actor_id: impl Into<String>) -> Self {
        Self {
            hot,
            cold,
            actor_id: actor_id.into(),
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    // --- hot tier -------------------------------------------------------

    pub async fn metadata(&self) -> Result<Option<Metadata>> {
        match self.hot.get(keys::METADATA_KEY).await? {
            Some(raw) => Ok(Some(Metadata::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_metadata(&mut self, meta: &Metadata) -> Result<()> {
        self.hot.put(keys::METADATA_KEY, meta.encode()?).await
    }

    pub async fn segment(&self, priority: u32, segment: u64) -> Result<Option<Vec<Item>>> {
        match self.hot.get(&keys::segment_key(priority, segment)).await? {
            Some(raw) => Ok(Some(decode_segment(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_segment(&mut self, priority: u32, segment: u64, items: &[Item]) -> Result<()> {
        self.hot
            .put(&keys::segment_key(priority, segment), encode_segment(items)?)
            .await
    }

    pub async fn delete_segment(&mut self, priority: u32, segment: u64) -> Result<()> {
        self.hot.delete(&keys::segment_key(priority, segment)).await
    }

    /// Atomically persist every staged hot mutation.
    pub async fn commit(&mut self) -> Result<()> {
        self.hot.commit().await
    }

    // --- cold tier ------------------------------------------------------

    pub async fn cold_segment(&self, priority: u32, segment: u64) -> Result<Option<Vec<Item>>> {
        let key = keys::offloaded_segment_key(priority, segment, &self.actor_id);
        match self.cold.get(&key).await? {
            Some(raw) => Ok(Some(decode_segment(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_cold_segment(
        &mut self,
        priority: u32,
        segment: u64,
        items: &[Item],
    ) -> Result<()> {
        let key = keys::offloaded_segment_key(priority, segment, &self.actor_id);
        self.cold.put(&key, encode_segment(items)?).await
    }

    pub async fn delete_cold_segment(&mut self, priority: u32, segment: u64) -> Result<()> {
        let key = keys::offloaded_segment_key(priority, segment, &self.actor_id);
        self.cold.delete(&key).await
    }
}

fn encode_segment(items: &[Item]) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(items)?))
}

fn decode_segment(raw: &[u8]) -> Result<Vec<Item>> {
    Ok(serde_json::from_slice(raw)?)
}
