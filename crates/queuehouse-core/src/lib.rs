//! queuehouse-core
//!
//! Core types shared by the queuehouse engine and the actor façade:
//!
//! - The metadata document that describes every priority queue hosted by one
//!   actor (per-priority segment pointers, the offloaded range, the active
//!   acknowledgement lock).
//! - The opaque item payload type.
//! - The crate-wide error taxonomy.
//!
//! Everything here is plain data: no I/O, no clocks. The engine crate owns
//! the behavior.

pub mod error;
pub mod metadata;

pub use error::{Error, Result};
pub use metadata::{ActiveLock, EngineConfig, Item, LockedItem, Metadata, QueueMeta};
