//! Hand-off queue between the real-time producer and the consumer thread.
//!
//! The producer side never blocks: a bounded queue that is full applies an
//! explicit [`OverloadPolicy`] instead of waiting or growing. FIFO order and
//! at-most-once delivery come from the underlying crossbeam channel.

use crate::block::SampleBlock;
use crate::constants::DEFAULT_QUEUE_BLOCKS;
use anyhow::{bail, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What to do when a bounded queue is full and a new block arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverloadPolicy {
    /// Evict the oldest queued block to admit the new one. Keeps consumer
    /// latency bounded at the cost of losing the stalest audio first.
    DropOldest,
    /// Discard the new block and leave the queue untouched. Preserves the
    /// already-queued run of audio under sustained overload.
    DropNewest,
}

/// Hand-off queue capacity, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

/// Configuration for one relay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub capacity: Capacity,
    pub overload_policy: OverloadPolicy,
}

impl Default for RelayConfig {
    /// Bounded queue of [`DEFAULT_QUEUE_BLOCKS`] with drop-oldest eviction,
    /// which bounds end-to-end latency for live audio.
    fn default() -> Self {
        Self {
            capacity: Capacity::Bounded(DEFAULT_QUEUE_BLOCKS),
            overload_policy: OverloadPolicy::DropOldest,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == Capacity::Bounded(0) {
            bail!("bounded queue capacity must be at least 1 block");
        }
        Ok(())
    }
}

/// Outcome of a non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Block queued; ownership transferred to the consumer side.
    Enqueued,
    /// Queue was full: the oldest queued block was evicted and the new
    /// block queued in its place.
    DroppedOldest,
    /// Queue was full: the new block was discarded.
    DroppedNewest,
    /// The receiver is gone; nothing was queued and no later send can succeed.
    Closed,
}

/// Creates the hand-off queue for a validated configuration.
pub fn block_channel(config: &RelayConfig) -> Result<(BlockSender, BlockReceiver)> {
    config.validate()?;
    let (tx, rx) = match config.capacity {
        Capacity::Bounded(n) => bounded(n),
        Capacity::Unbounded => unbounded(),
    };
    let consumer_gone = Arc::new(AtomicBool::new(false));
    let sender = BlockSender {
        tx,
        evict_rx: rx.clone(),
        consumer_gone: consumer_gone.clone(),
        policy: config.overload_policy,
    };
    let receiver = BlockReceiver { rx, consumer_gone };
    Ok((sender, receiver))
}

/// Producer half of the hand-off queue. Lives on the real-time context;
/// every operation is non-blocking.
pub struct BlockSender {
    tx: Sender<SampleBlock>,
    // Receiver clone used only to evict the head under DropOldest. Because
    // this clone keeps the channel connected, consumer departure is tracked
    // via the flag below rather than sender disconnection.
    evict_rx: Receiver<SampleBlock>,
    consumer_gone: Arc<AtomicBool>,
    policy: OverloadPolicy,
}

impl BlockSender {
    /// Queues a block without ever blocking. A full bounded queue is
    /// resolved by this sender's [`OverloadPolicy`].
    pub fn try_send(&self, block: SampleBlock) -> SendOutcome {
        if self.consumer_gone.load(Ordering::Acquire) {
            return SendOutcome::Closed;
        }
        match self.tx.try_send(block) {
            Ok(()) => SendOutcome::Enqueued,
            Err(TrySendError::Disconnected(_)) => SendOutcome::Closed,
            Err(TrySendError::Full(block)) => match self.policy {
                OverloadPolicy::DropNewest => SendOutcome::DroppedNewest,
                OverloadPolicy::DropOldest => {
                    // Evict the head, then retry once. Both steps are
                    // non-blocking; if the consumer drained the queue in
                    // between, the retry simply succeeds.
                    let _ = self.evict_rx.try_recv();
                    match self.tx.try_send(block) {
                        Ok(()) => SendOutcome::DroppedOldest,
                        Err(TrySendError::Disconnected(_)) => SendOutcome::Closed,
                        Err(TrySendError::Full(_)) => SendOutcome::DroppedNewest,
                    }
                }
            },
        }
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    /// Number of blocks currently queued.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer half of the hand-off queue. Lives on a non-real-time context;
/// blocking here never affects the producer.
pub struct BlockReceiver {
    rx: Receiver<SampleBlock>,
    consumer_gone: Arc<AtomicBool>,
}

impl BlockReceiver {
    /// Blocks until a block arrives. Returns `None` once the producer side
    /// is gone and the queue is drained.
    pub fn recv(&self) -> Option<SampleBlock> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<SampleBlock> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Blocking iterator over incoming blocks, ending when the producer
    /// side is gone.
    pub fn iter(&self) -> impl Iterator<Item = SampleBlock> + '_ {
        self.rx.iter()
    }
}

impl Drop for BlockReceiver {
    fn drop(&mut self) {
        self.consumer_gone.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(value: f32) -> SampleBlock {
        SampleBlock::copy_from(&[value; 4])
    }

    fn config(capacity: Capacity, policy: OverloadPolicy) -> RelayConfig {
        RelayConfig {
            capacity,
            overload_policy: policy,
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let cfg = config(Capacity::Bounded(0), OverloadPolicy::DropOldest);
        assert!(block_channel(&cfg).is_err());
    }

    #[test]
    fn test_fifo_order() {
        let cfg = config(Capacity::Bounded(8), OverloadPolicy::DropNewest);
        let (tx, rx) = block_channel(&cfg).unwrap();
        for i in 0..5 {
            assert_eq!(tx.try_send(block(i as f32)), SendOutcome::Enqueued);
        }
        for i in 0..5 {
            let got = rx.try_recv().unwrap();
            assert_eq!(got.samples()[0], i as f32);
        }
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_drop_oldest_evicts_head_and_keeps_len() {
        let cfg = config(Capacity::Bounded(2), OverloadPolicy::DropOldest);
        let (tx, rx) = block_channel(&cfg).unwrap();
        assert_eq!(tx.try_send(block(1.0)), SendOutcome::Enqueued);
        assert_eq!(tx.try_send(block(2.0)), SendOutcome::Enqueued);
        assert_eq!(tx.try_send(block(3.0)), SendOutcome::DroppedOldest);
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.try_recv().unwrap().samples()[0], 2.0);
        assert_eq!(rx.try_recv().unwrap().samples()[0], 3.0);
    }

    #[test]
    fn test_drop_newest_leaves_queue_unchanged() {
        let cfg = config(Capacity::Bounded(2), OverloadPolicy::DropNewest);
        let (tx, rx) = block_channel(&cfg).unwrap();
        assert_eq!(tx.try_send(block(1.0)), SendOutcome::Enqueued);
        assert_eq!(tx.try_send(block(2.0)), SendOutcome::Enqueued);
        assert_eq!(tx.try_send(block(3.0)), SendOutcome::DroppedNewest);
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.try_recv().unwrap().samples()[0], 1.0);
        assert_eq!(rx.try_recv().unwrap().samples()[0], 2.0);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_unbounded_never_drops() {
        let cfg = config(Capacity::Unbounded, OverloadPolicy::DropNewest);
        let (tx, rx) = block_channel(&cfg).unwrap();
        for i in 0..100 {
            assert_eq!(tx.try_send(block(i as f32)), SendOutcome::Enqueued);
        }
        assert_eq!(rx.len(), 100);
    }

    #[test]
    fn test_closed_after_receiver_dropped() {
        let cfg = config(Capacity::Bounded(2), OverloadPolicy::DropOldest);
        let (tx, rx) = block_channel(&cfg).unwrap();
        drop(rx);
        assert_eq!(tx.try_send(block(1.0)), SendOutcome::Closed);
    }
}
