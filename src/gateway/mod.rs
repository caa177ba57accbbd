//! Chat-platform gateway plumbing: the dispatches we consume, the member
//! cache they feed, and the voice commands we send back.

pub mod bridge;
pub mod cache;
pub mod events;
pub mod shard;

pub use bridge::GatewayBridge;
pub use cache::MemberCache;
pub use events::{GatewayCommand, GatewayEvent};
pub use shard::{ChannelShard, ShardSender};
