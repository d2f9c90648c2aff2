//! State-Store Key Layout
//!
//! Hot keys live inside one actor's private state region, so they carry no
//! actor id. Cold keys land in the shared store and embed the actor id to
//! globalize the namespace.
//!
//! ```text
//! hot:   metadata
//! hot:   queue_{priority}_seg_{segment}
//! cold:  offloaded_queue_{priority}_seg_{segment}_{actor_id}
//! ```

/// Hot key of the singleton metadata document.
pub const METADATA_KEY: &str = "metadata";

/// Hot key of one segment blob.
pub fn segment_key(priority: u32, segment: u64) -> String {
    format!("queue_{priority}_seg_{segment}")
}

/// Cold key of one offloaded segment blob.
pub fn offloaded_segment_key(priority: u32, segment: u64, actor_id: &str) -> String {
    format!("offloaded_queue_{priority}_seg_{segment}_{actor_id}")
}
