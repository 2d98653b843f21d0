pub mod block;
pub mod channel;
pub mod constants;
pub mod relay;

pub use block::SampleBlock;
pub use channel::{
    block_channel, BlockReceiver, BlockSender, Capacity, OverloadPolicy, RelayConfig, SendOutcome,
};
pub use relay::{Continuation, FrameRelay, RelayState, RelayStats, ShutdownHandle};
