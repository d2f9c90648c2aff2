//! Segmented Queue Engine
//!
//! [`QueueEngine`] implements the four queue operations over the two-tier
//! state adapter. Each priority is a chain of bounded segments addressed by
//! `[head_segment, tail_segment]`; pops read the head, pushes fill the tail,
//! and a contiguous middle range may live in the cold tier (see
//! [`crate::offload`]).
//!
//! ## Invariants restored before every commit
//!
//! - `head_segment <= tail_segment`, and a priority record exists only while
//!   it holds at least one item.
//! - `count` equals the summed length of all live segments of the priority.
//! - Every segment except head and tail is exactly full. The head segment may
//!   exceed `segment_size` after an expired lock re-prepends items; it is
//!   drained normally and never split.
//! - At most one active lock exists per actor.
//!
//! The host runtime runs one operation at a time per actor, so the engine
//! needs no interior locking; `&mut self` is the concurrency model.

use std::sync::Arc;

use queuehouse_core::{Error, Item, LockedItem, Metadata, Result};
use tracing::{debug, info, warn};

use crate::adapter::StateAdapter;
use crate::lock;
use crate::offload;
use crate::store::{ColdStore, HotStore};

/// Outcome of a pop-with-acknowledgement attempt.
#[derive(Debug)]
pub enum AckPop {
    /// Another pop already holds the queue; nothing was popped.
    Locked { expires_at: i64 },
    /// No items were available; no lock was created.
    Empty,
    /// Items popped and held under a fresh lock until acknowledged.
    Popped {
        lock_id: String,
        expires_at: i64,
        items: Vec<Item>,
    },
}

pub struct QueueEngine {
    adapter: StateAdapter,
}

impl QueueEngine {
    pub fn new(
        hot: Box<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            adapter: StateAdapter::new(hot, cold, actor_id),
        }
    }

    pub fn actor_id(&self) -> &str {
        self.adapter.actor_id()
    }

    /// Activation initializer: load the metadata document, committing a
    /// default one if the actor has never run before. Config values loaded
    /// here are authoritative for the lifetime of the activation.
    pub async fn load_or_init(&mut self) -> Result<Metadata> {
        match self.adapter.metadata().await? {
            Some(meta) => Ok(meta),
            None => {
                let meta = Metadata::default();
                self.adapter.put_metadata(&meta).await?;
                self.adapter.commit().await?;
                info!(
                    actor = %self.adapter.actor_id(),
                    "initialized empty metadata document"
                );
                Ok(meta)
            }
        }
    }

    /// Append an item to the tail of its priority queue.
    ///
    /// The fill predicate is checked before appending, so a push never grows
    /// a segment past `segment_size`; only expired-lock recovery may do that,
    /// and only on the head. The segment and metadata commit atomically; the
    /// offload scan runs after the commit and cannot fail the push.
    pub async fn push(&mut self, meta: &mut Metadata, item: Item, priority: u32) -> Result<()> {
        let segment_size = meta.config.segment_size;

        let queue = meta.queue_entry(priority);
        let mut tail = queue.tail_segment;
        let mut segment = self
            .adapter
            .segment(priority, tail)
            .await?
            .unwrap_or_default();
        if segment.len() >= segment_size {
            tail += 1;
            segment = Vec::new();
        }
        segment.push(item);

        let queue = meta.queue_entry(priority);
        queue.tail_segment = tail;
        queue.count += 1;
        let count = queue.count;
        let segment_len = segment.len();

        self.adapter.put_segment(priority, tail, &segment).await?;
        self.adapter.put_metadata(meta).await?;
        self.adapter.commit().await?;

        debug!(
            actor = %self.adapter.actor_id(),
            priority,
            segment = tail,
            segment_len,
            count,
            "pushed item"
        );

        if let Err(e) = offload::offload_scan(&mut self.adapter, meta, priority).await {
            warn!(
                actor = %self.adapter.actor_id(),
                priority,
                error = %e,
                "offload scan failed after push; queue stays hot"
            );
        }
        Ok(())
    }

    /// Destructively pop the single highest-priority item, if any.
    ///
    /// An active unexpired lock blocks destructive reads entirely; an expired
    /// one is recovered first.
    pub async fn pop(&mut self, meta: &mut Metadata, now_ms: i64) -> Result<Option<Item>> {
        if let Some(active) = &meta.active_lock {
            if !active.is_expired(now_ms) {
                debug!(
                    actor = %self.adapter.actor_id(),
                    expires_at = active.expires_at,
                    "pop blocked by active lock"
                );
                return Ok(None);
            }
            self.recover_expired_lock(meta).await?;
        }

        let Some((item, priority)) = self.pop_one(meta).await? else {
            return Ok(None);
        };
        self.adapter.put_metadata(meta).await?;
        self.adapter.commit().await?;
        debug!(actor = %self.adapter.actor_id(), priority, "popped item");

        self.promote_after_pop(meta, priority).await;
        Ok(Some(item))
    }

    /// Pop one item and hold it under a TTL lock until acknowledged.
    ///
    /// The pop and the lock creation land in a single commit: a popped item
    /// is never persisted without its lock.
    pub async fn pop_with_ack(
        &mut self,
        meta: &mut Metadata,
        ttl_seconds: Option<u32>,
        now_ms: i64,
    ) -> Result<AckPop> {
        let ttl = lock::clamp_ttl(ttl_seconds);

        if let Some(active) = &meta.active_lock {
            if !active.is_expired(now_ms) {
                debug!(
                    actor = %self.adapter.actor_id(),
                    expires_at = active.expires_at,
                    "pop-with-ack blocked by active lock"
                );
                return Ok(AckPop::Locked {
                    expires_at: active.expires_at,
                });
            }
            self.recover_expired_lock(meta).await?;
        }

        let Some((item, priority)) = self.pop_one(meta).await? else {
            return Ok(AckPop::Empty);
        };

        let active = lock::new_lock(
            vec![LockedItem {
                item: item.clone(),
                priority,
            }],
            ttl,
            now_ms,
        );
        let lock_id = active.lock_id.clone();
        let expires_at = active.expires_at;
        meta.active_lock = Some(active);

        self.adapter.put_metadata(meta).await?;
        self.adapter.commit().await?;
        info!(
            actor = %self.adapter.actor_id(),
            lock_id = %lock_id,
            expires_at,
            ttl_seconds = ttl,
            "created acknowledgement lock"
        );

        self.promote_after_pop(meta, priority).await;
        Ok(AckPop::Popped {
            lock_id,
            expires_at,
            items: vec![item],
        })
    }

    /// Release the active lock.
    ///
    /// Check order is fixed so error codes are deterministic: empty id,
    /// absent lock, mismatched id (lock preserved), expired (recovered as a
    /// side effect), success. Returns the number of items acknowledged.
    pub async fn acknowledge(
        &mut self,
        meta: &mut Metadata,
        lock_id: &str,
        now_ms: i64,
    ) -> Result<usize> {
        if lock_id.is_empty() {
            return Err(Error::InvalidArgument(
                "lock_id is required to acknowledge items".to_string(),
            ));
        }
        let Some(active) = &meta.active_lock else {
            return Err(Error::LockNotFound);
        };
        if active.lock_id != lock_id {
            return Err(Error::InvalidLockId);
        }
        let expired = active.is_expired(now_ms);
        let acknowledged = active.items.len();
        if expired {
            self.recover_expired_lock(meta).await?;
            return Err(Error::LockExpired);
        }

        meta.active_lock = None;
        self.adapter.put_metadata(meta).await?;
        self.adapter.commit().await?;
        info!(
            actor = %self.adapter.actor_id(),
            lock_id = %lock_id,
            acknowledged,
            "lock acknowledged"
        );
        Ok(acknowledged)
    }

    /// Return an expired lock's items to the front of their original
    /// priority queues and clear the lock.
    ///
    /// Items are grouped by priority preserving pop order, and each group is
    /// prepended as a whole, so the recovered items come out ahead of
    /// anything pushed while the lock was held, in their original order. The
    /// head segment may exceed `segment_size` afterwards; it drains normally.
    pub async fn recover_expired_lock(&mut self, meta: &mut Metadata) -> Result<()> {
        let Some(active) = meta.active_lock.take() else {
            return Ok(());
        };
        let lock_id = active.lock_id;

        let mut groups: Vec<(u32, Vec<Item>)> = Vec::new();
        for entry in active.items {
            match groups.iter_mut().find(|(p, _)| *p == entry.priority) {
                Some((_, items)) => items.push(entry.item),
                None => groups.push((entry.priority, vec![entry.item])),
            }
        }

        for (priority, items) in groups {
            let returned = items.len() as u64;
            // Recreates the record at head = tail = 0 if pops destroyed it
            // while the lock was held.
            let head = meta.queue_entry(priority).head_segment;
            let mut segment = self
                .adapter
                .segment(priority, head)
                .await?
                .unwrap_or_default();
            segment.splice(0..0, items);
            self.adapter.put_segment(priority, head, &segment).await?;
            meta.queue_entry(priority).count += returned;

            debug!(
                actor = %self.adapter.actor_id(),
                priority,
                returned,
                segment_len = segment.len(),
                "returned expired lock items to queue head"
            );
        }

        self.adapter.put_metadata(meta).await?;
        self.adapter.commit().await?;
        warn!(
            actor = %self.adapter.actor_id(),
            lock_id = %lock_id,
            "expired lock recovered; items returned to their original priorities"
        );
        Ok(())
    }

    /// The destructive scan shared by both pop paths. Stages segment
    /// mutations and updates `meta` in memory; the caller commits. Emits the
    /// source priority so the lock can re-enqueue correctly on expiry.
    async fn pop_one(&mut self, meta: &mut Metadata) -> Result<Option<(Item, u32)>> {
        let priorities: Vec<u32> = meta.queues.keys().copied().collect();

        for priority in priorities {
            offload::load_scan(&mut self.adapter, meta, priority).await?;

            let Some(queue) = meta.queues.get(&priority) else {
                continue;
            };
            if queue.count == 0 {
                continue;
            }

            loop {
                let (head, tail, count) = match meta.queues.get(&priority) {
                    Some(queue) => (queue.head_segment, queue.tail_segment, queue.count),
                    None => break,
                };
                let mut segment = self
                    .adapter
                    .segment(priority, head)
                    .await?
                    .unwrap_or_default();

                if segment.is_empty() {
                    if head < tail {
                        // Stray empty head; consume it and keep scanning the
                        // same priority.
                        self.adapter.delete_segment(priority, head).await?;
                        meta.queue_entry(priority).head_segment = head + 1;
                        continue;
                    }
                    warn!(
                        actor = %self.adapter.actor_id(),
                        priority,
                        count,
                        "segment store desynchronized from metadata; dropping priority record"
                    );
                    self.adapter.delete_segment(priority, head).await?;
                    meta.queues.remove(&priority);
                    self.adapter.put_metadata(meta).await?;
                    self.adapter.commit().await?;
                    break;
                }

                let item = segment.remove(0);
                if segment.is_empty() {
                    self.adapter.delete_segment(priority, head).await?;
                    if head < tail {
                        let queue = meta.queue_entry(priority);
                        queue.head_segment = head + 1;
                        queue.count = count - 1;
                    } else {
                        // Last item of the last segment: the priority record
                        // is destroyed with it.
                        meta.queues.remove(&priority);
                    }
                } else {
                    self.adapter.put_segment(priority, head, &segment).await?;
                    meta.queue_entry(priority).count = count - 1;
                }
                return Ok(Some((item, priority)));
            }
        }
        Ok(None)
    }

    /// Post-commit promotion of segments the head pointer just moved toward.
    /// Best-effort: a failure here is retried by the next pop's load scan,
    /// which is where unavailability surfaces.
    async fn promote_after_pop(&mut self, meta: &mut Metadata, priority: u32) {
        if let Err(e) = offload::load_scan(&mut self.adapter, meta, priority).await {
            warn!(
                actor = %self.adapter.actor_id(),
                priority,
                error = %e,
                "segment promotion after pop failed; next pop will retry"
            );
        }
    }
}
