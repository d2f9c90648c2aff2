//! Queue Actor Façade
//!
//! One [`QueueActor`] hosts one priority-ordered FIFO queue, identified by
//! its actor id. The host runtime serializes operations per actor, so every
//! operation takes `&mut self` and the façade uses no locking.
//!
//! The wall clock is sampled exactly once per operation, in the thin public
//! wrappers; every time-dependent path below them takes an explicit
//! `now_ms`. TTL expiry is only ever evaluated at these sample points -
//! there is no background timer, and an expired lock persists untouched
//! until the next operation observes it.

use std::sync::Arc;

use queuehouse_core::{Error, Item, Result};
use queuehouse_engine::{AckPop, ColdStore, HotStore, QueueEngine};
use tracing::info;

use crate::response::{AcknowledgeResponse, PopWithAckResponse};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct QueueActor {
    engine: QueueEngine,
}

impl QueueActor {
    pub fn new(
        hot: Box<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            engine: QueueEngine::new(hot, cold, actor_id),
        }
    }

    pub fn actor_id(&self) -> &str {
        self.engine.actor_id()
    }

    /// Activation hook: ensures the metadata document exists. Idempotent;
    /// operations also initialize lazily, so calling this is optional but
    /// matches the host runtime's activation contract.
    pub async fn activate(&mut self) -> Result<()> {
        info!(actor = %self.engine.actor_id(), "activating queue actor");
        self.engine.load_or_init().await?;
        Ok(())
    }

    /// Push an item onto the queue at the given priority (0 = highest).
    ///
    /// Items must be JSON objects - the structural constraint the outer API
    /// imposes; the engine below treats them as opaque.
    pub async fn push(&mut self, item: Item, priority: u32) -> Result<()> {
        if !item.is_object() {
            return Err(Error::InvalidArgument(
                "item must be a JSON object".to_string(),
            ));
        }
        let mut meta = self.engine.load_or_init().await?;
        self.engine.push(&mut meta, item, priority).await
    }

    /// Destructively pop the highest-priority item, if any. Returns `None`
    /// when the queue is empty or an unexpired acknowledgement lock is held.
    pub async fn pop(&mut self) -> Result<Option<Item>> {
        self.pop_at(now_ms()).await
    }

    /// [`Self::pop`] with an explicit clock, for deterministic tests.
    pub async fn pop_at(&mut self, now_ms: i64) -> Result<Option<Item>> {
        let mut meta = self.engine.load_or_init().await?;
        self.engine.pop(&mut meta, now_ms).await
    }

    /// Pop one item and hold it under a TTL lock until acknowledged.
    /// `ttl_seconds` is clamped into `[1, 300]`; `None` means 30.
    pub async fn pop_with_ack(&mut self, ttl_seconds: Option<u32>) -> Result<PopWithAckResponse> {
        self.pop_with_ack_at(ttl_seconds, now_ms()).await
    }

    /// [`Self::pop_with_ack`] with an explicit clock.
    pub async fn pop_with_ack_at(
        &mut self,
        ttl_seconds: Option<u32>,
        now_ms: i64,
    ) -> Result<PopWithAckResponse> {
        let mut meta = self.engine.load_or_init().await?;
        let outcome = self
            .engine
            .pop_with_ack(&mut meta, ttl_seconds, now_ms)
            .await?;
        Ok(match outcome {
            AckPop::Locked { expires_at } => PopWithAckResponse {
                items: Vec::new(),
                count: 0,
                locked: true,
                lock_id: None,
                lock_expires_at: Some(expires_at),
                message: Some("queue is locked pending acknowledgement".to_string()),
            },
            AckPop::Empty => PopWithAckResponse {
                items: Vec::new(),
                count: 0,
                locked: false,
                lock_id: None,
                lock_expires_at: None,
                message: Some("no items available".to_string()),
            },
            AckPop::Popped {
                lock_id,
                expires_at,
                items,
            } => PopWithAckResponse {
                count: items.len(),
                items,
                locked: true,
                lock_id: Some(lock_id),
                lock_expires_at: Some(expires_at),
                message: None,
            },
        })
    }

    /// Acknowledge the items held by `lock_id`, releasing the lock.
    ///
    /// Lock-state failures come back as `success: false` with a stable
    /// `error_code`; only storage failures escape as `Err`.
    pub async fn acknowledge(&mut self, lock_id: &str) -> Result<AcknowledgeResponse> {
        self.acknowledge_at(lock_id, now_ms()).await
    }

    /// [`Self::acknowledge`] with an explicit clock.
    pub async fn acknowledge_at(
        &mut self,
        lock_id: &str,
        now_ms: i64,
    ) -> Result<AcknowledgeResponse> {
        let mut meta = self.engine.load_or_init().await?;
        match self.engine.acknowledge(&mut meta, lock_id, now_ms).await {
            Ok(acknowledged) => Ok(AcknowledgeResponse {
                success: true,
                message: format!("{acknowledged} items acknowledged successfully"),
                items_acknowledged: Some(acknowledged),
                error_code: None,
            }),
            Err(
                e @ (Error::InvalidArgument(_)
                | Error::LockNotFound
                | Error::InvalidLockId
                | Error::LockExpired),
            ) => Ok(AcknowledgeResponse {
                success: false,
                message: e.to_string(),
                items_acknowledged: None,
                error_code: Some(e.error_code().to_string()),
            }),
            Err(e) => Err(e),
        }
    }
}
