//! Metadata Document
//!
//! This module defines the single metadata document each queue actor persists
//! in its hot state under the `metadata` key.
//!
//! ## Structure
//!
//! ```text
//! Metadata
//!   ├─ config: EngineConfig          segment sizing, read once at activation
//!   ├─ queues: { priority → QueueMeta }
//!   │    ├─ head_segment / tail_segment   segment pointers
//!   │    ├─ count                         authoritative logical size
//!   │    └─ head/tail_offloaded_segment   contiguous cold-resident range
//!   └─ active_lock: Option<ActiveLock>    at most one unacknowledged pop
//! ```
//!
//! ## Design Decisions
//!
//! - Priorities are `u32` map keys in a `BTreeMap`, so the ascending scan the
//!   pop path needs falls out of iteration order. serde_json stores them as
//!   stringified object keys.
//! - The offloaded endpoints are optional and present together or absent
//!   together; `skip_serializing_if` keeps them out of the stored document
//!   when unused.
//! - Unknown keys are ignored on decode and optional fields default, so the
//!   document survives schema evolution in both directions.
//! - Timestamps are i64 milliseconds since epoch.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An opaque user payload. The engine never inspects item contents; the
/// façade imposes the outer structural constraint (JSON object).
pub type Item = serde_json::Value;

fn default_segment_size() -> usize {
    100
}

fn default_buffer_segments() -> u64 {
    1
}

/// Engine configuration, stored inside the metadata document.
///
/// Values loaded at activation are authoritative for the lifetime of the
/// activation; changing the defaults does not rewrite existing segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of items per segment (default: 100).
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,

    /// Number of full segments kept hot between the head segment and the
    /// nearest offloaded segment (default: 1).
    #[serde(default = "default_buffer_segments")]
    pub buffer_segments: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment_size: default_segment_size(),
            buffer_segments: default_buffer_segments(),
        }
    }
}

/// Per-priority segment pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMeta {
    /// Segment the next pop reads from.
    pub head_segment: u64,

    /// Segment the next push writes to.
    pub tail_segment: u64,

    /// Total items across all segments of this priority.
    pub count: u64,

    /// First segment currently resident in the cold tier (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_offloaded_segment: Option<u64>,

    /// Last segment currently resident in the cold tier (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_offloaded_segment: Option<u64>,
}

impl QueueMeta {
    pub fn new() -> Self {
        Self {
            head_segment: 0,
            tail_segment: 0,
            count: 0,
            head_offloaded_segment: None,
            tail_offloaded_segment: None,
        }
    }

    /// The inclusive cold-resident range, if any segments are offloaded.
    pub fn offloaded_range(&self) -> Option<(u64, u64)> {
        match (self.head_offloaded_segment, self.tail_offloaded_segment) {
            (Some(head), Some(tail)) => Some((head, tail)),
            _ => None,
        }
    }

    /// True when segment `n` currently resides in the cold tier.
    pub fn is_offloaded(&self, n: u64) -> bool {
        self.offloaded_range()
            .is_some_and(|(head, tail)| head <= n && n <= tail)
    }
}

impl Default for QueueMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry held by the active lock. The originating priority is retained
/// so expiry recovery can re-enqueue to the correct queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedItem {
    pub item: Item,
    pub priority: u32,
}

/// The singleton unacknowledged-pop lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLock {
    /// URL-safe random token handed to the caller.
    pub lock_id: String,

    /// Milliseconds since epoch at lock creation.
    pub created_at: i64,

    /// Milliseconds since epoch after which the lock no longer blocks pops.
    pub expires_at: i64,

    /// Items held by the lock, in pop order.
    pub items: Vec<LockedItem>,
}

impl ActiveLock {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// The complete per-actor metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub config: EngineConfig,

    #[serde(default)]
    pub queues: BTreeMap<u32, QueueMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_lock: Option<ActiveLock>,
}

impl Metadata {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            queues: BTreeMap::new(),
            active_lock: None,
        }
    }

    /// Encode to the stored blob. Runs once per commit; there is no partial
    /// re-encoding of nested fragments.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode from the stored blob, tolerating unknown keys.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// The queue record for `priority`, created empty if absent.
    pub fn queue_entry(&mut self, priority: u32) -> &mut QueueMeta {
        self.queues.entry(priority).or_default()
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
