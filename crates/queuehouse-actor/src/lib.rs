//! queuehouse-actor
//!
//! The operation façade for one queue actor. [`QueueActor`] validates
//! arguments, runs the activation initializer, dispatches into the engine,
//! and assembles the typed responses callers see. It owns no persistent
//! state of its own.
//!
//! The host runtime is expected to provide single-threaded invocation per
//! actor and the hot-tier state transport; this crate's in-memory reference
//! stores (from `queuehouse-engine`) stand in for both in tests and
//! examples.
//!
//! ```ignore
//! use std::sync::Arc;
//! use object_store::memory::InMemory;
//! use queuehouse_actor::QueueActor;
//! use queuehouse_engine::{InMemoryHotStore, ObjectStoreColdStore};
//!
//! let hot = InMemoryHotStore::new();
//! let cold = Arc::new(ObjectStoreColdStore::new(Arc::new(InMemory::new())));
//! let mut actor = QueueActor::new(Box::new(hot), cold, "orders-queue");
//! actor.activate().await?;
//!
//! actor.push(serde_json::json!({"order": 17}), 0).await?;
//! let item = actor.pop().await?;
//! ```

pub mod actor;
pub mod response;

pub use actor::QueueActor;
pub use response::{AcknowledgeResponse, PopWithAckResponse};
