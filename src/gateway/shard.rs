use tracing::debug;

use crate::{common::types::AnyResult, gateway::GatewayCommand};

/// Outbound half of the gateway connection.
pub trait ShardSender: Send + Sync {
    fn send(&self, command: GatewayCommand) -> AnyResult<()>;
}

/// Queues commands for whichever gateway connection drains the receiver.
#[derive(Clone)]
pub struct ChannelShard {
    tx: flume::Sender<GatewayCommand>,
}

impl ChannelShard {
    pub fn new() -> (Self, flume::Receiver<GatewayCommand>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl ShardSender for ChannelShard {
    fn send(&self, command: GatewayCommand) -> AnyResult<()> {
        debug!("Queueing gateway command for guild {}", command.guild_id());
        self.tx
            .send(command)
            .map_err(|_| "Gateway command channel is closed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::GuildId;

    #[test]
    fn test_send_fails_once_receiver_is_gone() {
        let (shard, rx) = ChannelShard::new();
        shard.send(GatewayCommand::leave(GuildId::from("1"))).unwrap();
        assert_eq!(rx.len(), 1);

        drop(rx);
        assert!(shard.send(GatewayCommand::leave(GuildId::from("1"))).is_err());
    }
}
