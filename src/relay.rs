//! The frame relay: bridges a real-time audio production callback to the
//! consumer-side hand-off queue.
//!
//! `on_produce` is meant to be called once per time slice from a real-time
//! scheduler. It never blocks, never performs I/O, and after warm-up does
//! not allocate beyond the mandatory per-block copy.

use crate::block::SampleBlock;
use crate::channel::{block_channel, BlockReceiver, BlockSender, RelayConfig, SendOutcome};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Signal returned to the host scheduler after each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Continuation {
    /// Keep invoking the relay every time slice.
    Continue,
    /// Unregister the relay; it will not enqueue anything further.
    Stop,
}

/// Lifecycle of one relay instance. Transitions to `Stopped` only on
/// explicit shutdown or when the consumer disappears, never on overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Active,
    Stopped,
}

/// Requests relay shutdown from outside the real-time context. The relay
/// observes the request at its next invocation boundary; an in-flight
/// invocation always completes normally.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Delivery counters shared between the relay and any observer thread.
#[derive(Clone, Default)]
pub struct RelayStats {
    enqueued: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl RelayStats {
    /// Blocks handed to the consumer queue (including ones that evicted an
    /// older block to get in).
    pub fn blocks_enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Blocks lost to the overload policy, whichever end of the queue they
    /// were dropped from.
    pub fn blocks_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Bridges a real-time production callback to a consumer-side queue.
///
/// Single-producer by construction: `on_produce` takes `&mut self`, so one
/// relay instance serves exactly one host callback. Shutdown and stats cross
/// the thread boundary through shared atomics.
pub struct FrameRelay {
    tx: BlockSender,
    state: RelayState,
    shutdown: Arc<AtomicBool>,
    stats: RelayStats,
    scratch: Vec<f32>,
}

impl FrameRelay {
    /// Creates a relay and the receiver its consumer will drain.
    pub fn new(config: RelayConfig) -> Result<(Self, BlockReceiver)> {
        let (tx, rx) = block_channel(&config)?;
        let relay = Self {
            tx,
            state: RelayState::Active,
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: RelayStats::default(),
            scratch: Vec::new(),
        };
        Ok((relay, rx))
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: self.shutdown.clone(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats.clone()
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Per-time-slice production callback for planar input.
    ///
    /// Takes the first channel's buffer, copies it into an owned
    /// [`SampleBlock`] and queues it without blocking. Missing or empty
    /// input is a benign transient (device switch, disconnected source) and
    /// enqueues nothing. Exactly zero or one block is enqueued per call.
    pub fn on_produce(&mut self, channels: &[&[f32]]) -> Continuation {
        if self.observe_shutdown() {
            return Continuation::Stop;
        }
        let Some(first) = channels.first().filter(|c| !c.is_empty()) else {
            return Continuation::Continue;
        };
        let block = SampleBlock::copy_from(first);
        self.forward(block)
    }

    /// Per-time-slice production callback for interleaved input, as
    /// delivered by cpal-style hosts. Extracts channel 0 and behaves like
    /// [`Self::on_produce`]. The de-interleave scratch buffer is reused
    /// across calls.
    pub fn on_produce_interleaved(&mut self, data: &[f32], channels: usize) -> Continuation {
        if self.observe_shutdown() {
            return Continuation::Stop;
        }
        if data.is_empty() || channels == 0 {
            return Continuation::Continue;
        }
        self.scratch.clear();
        self.scratch.extend(data.iter().step_by(channels).copied());
        let block = SampleBlock::copy_from(&self.scratch);
        self.forward(block)
    }

    // Shutdown is observed only at the invocation boundary; returns true
    // once the relay is (or just became) stopped.
    fn observe_shutdown(&mut self) -> bool {
        if self.state == RelayState::Stopped {
            return true;
        }
        if self.shutdown.load(Ordering::Acquire) {
            self.state = RelayState::Stopped;
            return true;
        }
        false
    }

    fn forward(&mut self, block: SampleBlock) -> Continuation {
        match self.tx.try_send(block) {
            SendOutcome::Enqueued => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Continuation::Continue
            }
            SendOutcome::DroppedOldest => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Continuation::Continue
            }
            SendOutcome::DroppedNewest => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Continuation::Continue
            }
            SendOutcome::Closed => {
                log::warn!("Block receiver disconnected, stopping relay");
                self.state = RelayState::Stopped;
                Continuation::Stop
            }
        }
    }
}
