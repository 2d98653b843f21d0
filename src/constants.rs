//! Shared constants for the PCM relay.

/// Default block size in samples (one 128-sample render quantum, the fixed
/// callback size used by worklet-style hosts). The host's actual block size
/// is session configuration; this is only a sizing hint.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Default hand-off queue depth, in blocks.
pub const DEFAULT_QUEUE_BLOCKS: usize = 32;
