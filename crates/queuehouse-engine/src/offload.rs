//! Segment Tier Migration
//!
//! Bounds the hot-tier footprint of each priority to roughly
//! `(buffer_segments + 2) * segment_size` items: the head segment, a buffer
//! of full segments behind it, and the tail segment stay hot; full middle
//! segments move to the cold tier.
//!
//! ```text
//! [head][buffer...]        [offloaded range]        [.....][tail]
//!   hot    hot              cold, contiguous          hot    hot
//! ```
//!
//! ## Failure Asymmetry
//!
//! Offload failure is survivable: the segment simply stays hot and the engine
//! degrades to a full-memory mode, so errors are logged and swallowed. Load
//! failure threatens data (the next pop would miss those items), so it
//! surfaces to the caller as `ColdStoreUnavailable`.
//!
//! ## Commit Ordering
//!
//! Both scans treat the hot commit as the linearization point. Offload writes
//! the cold copy first, then commits the hot deletion + range extension - a
//! crash in between leaves an orphan cold blob that the next offload of the
//! same key overwrites. Load commits the hot copy first, then deletes the
//! cold key best-effort - a crash in between again leaves only an orphan,
//! never a lost segment.

use queuehouse_core::{Error, Metadata, Result};
use tracing::{debug, warn};

use crate::adapter::StateAdapter;

/// Migrate every offload-eligible segment of `priority` to the cold tier.
///
/// Called after a push has committed. Segment `n` is eligible when it lies
/// strictly between the hot head buffer and the tail
/// (`head + buffer_segments < n < tail`), is exactly full, and is not already
/// inside the offloaded range. Candidates appear in ascending order, so the
/// range only ever extends contiguously at its tail end.
///
/// Cold-store failure aborts the scan (skipping would punch a hole in the
/// contiguous range) and is not an error.
pub async fn offload_scan(
    adapter: &mut StateAdapter,
    meta: &mut Metadata,
    priority: u32,
) -> Result<()> {
    let segment_size = meta.config.segment_size;
    let buffer_segments = meta.config.buffer_segments;

    let Some(queue) = meta.queues.get(&priority) else {
        return Ok(());
    };
    let first = queue.head_segment + buffer_segments + 1;
    let candidates: Vec<u64> = (first..queue.tail_segment)
        .filter(|n| !queue.is_offloaded(*n))
        .collect();

    for n in candidates {
        let Some(segment) = adapter.segment(priority, n).await? else {
            continue;
        };
        if segment.len() != segment_size {
            continue;
        }

        if let Err(e) = adapter.put_cold_segment(priority, n, &segment).await {
            warn!(
                actor = %adapter.actor_id(),
                priority,
                segment = n,
                error = %e,
                "cold store rejected segment offload; staying hot"
            );
            return Ok(());
        }

        let queue = meta.queue_entry(priority);
        match queue.offloaded_range() {
            None => {
                queue.head_offloaded_segment = Some(n);
                queue.tail_offloaded_segment = Some(n);
            }
            Some(_) => {
                queue.tail_offloaded_segment = Some(n);
            }
        }

        adapter.delete_segment(priority, n).await?;
        adapter.put_metadata(meta).await?;
        adapter.commit().await?;

        debug!(
            actor = %adapter.actor_id(),
            priority,
            segment = n,
            "offloaded segment to cold tier"
        );
    }

    Ok(())
}

/// Promote offloaded segments back into the hot tier ahead of consumption.
///
/// Called before each consuming access (and again after the head pointer
/// advances). Promotes from the head end of the offloaded range while
/// `head_offloaded_segment <= head_segment + buffer_segments`, so segments
/// come back in exactly the order they will be consumed.
pub async fn load_scan(
    adapter: &mut StateAdapter,
    meta: &mut Metadata,
    priority: u32,
) -> Result<()> {
    loop {
        let buffer_segments = meta.config.buffer_segments;
        let Some(queue) = meta.queues.get(&priority) else {
            return Ok(());
        };
        let Some((head_off, tail_off)) = queue.offloaded_range() else {
            return Ok(());
        };
        if head_off > queue.head_segment + buffer_segments {
            return Ok(());
        }

        let n = head_off;
        let segment = adapter.cold_segment(priority, n).await?.ok_or_else(|| {
            Error::ColdStoreUnavailable(format!(
                "offloaded segment {n} of priority {priority} is missing from the cold store"
            ))
        })?;

        adapter.put_segment(priority, n, &segment).await?;
        let queue = meta.queue_entry(priority);
        if n == tail_off {
            queue.head_offloaded_segment = None;
            queue.tail_offloaded_segment = None;
        } else {
            queue.head_offloaded_segment = Some(n + 1);
        }
        adapter.put_metadata(meta).await?;
        adapter.commit().await?;

        if let Err(e) = adapter.delete_cold_segment(priority, n).await {
            warn!(
                actor = %adapter.actor_id(),
                priority,
                segment = n,
                error = %e,
                "failed to delete cold copy after promotion; orphan will be overwritten"
            );
        }

        debug!(
            actor = %adapter.actor_id(),
            priority,
            segment = n,
            "promoted segment from cold tier"
        );
    }
}
