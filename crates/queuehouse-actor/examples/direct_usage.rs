//! Direct Usage Example
//!
//! Drives a queue actor in-process, without any host runtime: in-memory hot
//! tier, in-memory object store as the cold tier.
//!
//! Run with:
//! ```bash
//! cargo run --package queuehouse-actor --example direct_usage
//! ```

use std::sync::Arc;

use object_store::memory::InMemory;
use queuehouse_actor::QueueActor;
use queuehouse_engine::{InMemoryHotStore, ObjectStoreColdStore};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cold = Arc::new(ObjectStoreColdStore::new(Arc::new(InMemory::new())));
    let mut actor = QueueActor::new(Box::new(InMemoryHotStore::new()), cold, "demo-queue");
    actor.activate().await?;

    // Mixed-priority producers
    actor.push(json!({"task": "send-invoice", "order": 1001}), 1).await?;
    actor.push(json!({"task": "page-oncall", "incident": 7}), 0).await?;
    actor.push(json!({"task": "nightly-report"}), 5).await?;

    // Plain destructive pops drain by priority, FIFO within each level
    while let Some(item) = actor.pop().await? {
        println!("popped: {item}");
    }

    // The at-least-once path: pop under a lock, then acknowledge
    actor.push(json!({"task": "charge-card", "order": 1002}), 0).await?;

    let popped = actor.pop_with_ack(Some(30)).await?;
    let lock_id = popped.lock_id.expect("one item was available");
    println!(
        "holding {} item(s) under lock {lock_id}, expires_at={}",
        popped.count,
        popped.lock_expires_at.unwrap()
    );

    // A second consumer arriving now would see the locked state as data
    let blocked = actor.pop_with_ack(None).await?;
    println!(
        "second consumer: locked={}, message={:?}",
        blocked.locked, blocked.message
    );

    let ack = actor.acknowledge(&lock_id).await?;
    println!("acknowledge: success={}, {}", ack.success, ack.message);

    Ok(())
}
