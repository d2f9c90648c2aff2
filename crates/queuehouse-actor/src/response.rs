//! Typed Operation Responses
//!
//! The lock-held state of a pop-with-ack is data, not an error, so the
//! response carries `locked` / `count` / `message` rather than failing the
//! call. Acknowledge failures caused by lock state likewise surface as
//! `success: false` plus a stable `error_code`; only storage-level failures
//! escape as errors.

use queuehouse_core::Item;
use serde::{Deserialize, Serialize};

/// Response of a pop-with-acknowledgement operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopWithAckResponse {
    /// Popped items, held under the lock until acknowledged.
    pub items: Vec<Item>,

    /// Number of popped items.
    pub count: usize,

    /// Whether a lock is in place after this call (either freshly created,
    /// or pre-existing and blocking).
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<String>,

    /// Lock expiry, milliseconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_expires_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of an acknowledge operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgeResponse {
    pub success: bool,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_acknowledged: Option<usize>,

    /// Stable machine-readable failure code (e.g. `LOCK_EXPIRED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}
