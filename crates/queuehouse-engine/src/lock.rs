//! Lock Id Generation and TTL Policy
//!
//! A successful pop-with-ack holds its items under a single lock until the
//! caller acknowledges. The lock id is an 11-character URL-safe random token
//! (64-symbol alphabet, 66 bits of entropy) - collisions are negligible with
//! at most one outstanding lock per actor.
//!
//! TTLs are clamped into `[1, 300]` seconds, defaulting to 30. Expiry is
//! sampled only when an operation observes the lock; there is no background
//! timer, so an expired lock persists untouched until the next observation.

use queuehouse_core::{ActiveLock, LockedItem};
use rand::Rng;

pub const MIN_TTL_SECONDS: u32 = 1;
pub const MAX_TTL_SECONDS: u32 = 300;
pub const DEFAULT_TTL_SECONDS: u32 = 30;

pub const LOCK_ID_LEN: usize = 11;

const LOCK_ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Clamp a caller-supplied TTL into the allowed window.
pub fn clamp_ttl(ttl_seconds: Option<u32>) -> u32 {
    ttl_seconds
        .unwrap_or(DEFAULT_TTL_SECONDS)
        .clamp(MIN_TTL_SECONDS, MAX_TTL_SECONDS)
}

/// Generate a fresh URL-safe lock id.
pub fn generate_lock_id() -> String {
    let mut rng = rand::thread_rng();
    (0..LOCK_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..LOCK_ID_ALPHABET.len());
            LOCK_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// Build the lock for a freshly popped batch.
pub fn new_lock(items: Vec<LockedItem>, ttl_seconds: u32, now_ms: i64) -> ActiveLock {
    ActiveLock {
        lock_id: generate_lock_id(),
        created_at: now_ms,
        expires_at: now_ms + i64::from(ttl_seconds) * 1_000,
        items,
    }
}
