//! Outbound side of the relay contract.

use std::sync::Arc;

use couchlink_proto::messages::RelayCommand;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

/// Transport used to hand commands to the relay.
///
/// Sends are fire-and-forget: implementations must not block and must not
/// report relay liveness through this call. The relay reports degraded links
/// through the `slow_connection` flag of the affected devices instead.
pub trait RelayClient: Send + Sync {
    fn send(&self, command: RelayCommand);
}

impl<R: RelayClient + ?Sized> RelayClient for Arc<R> {
    fn send(&self, command: RelayCommand) {
        (**self).send(command)
    }
}

/// Relay client backed by a bounded tokio channel.
///
/// The receiving half is owned by whatever drives the real connection.
#[derive(Debug, Clone)]
pub struct ChannelRelay {
    tx: mpsc::Sender<RelayCommand>,
}

impl ChannelRelay {
    pub fn new(tx: mpsc::Sender<RelayCommand>) -> Self {
        Self { tx }
    }

    /// Create a relay client together with the receiver for its commands.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RelayCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl RelayClient for ChannelRelay {
    fn send(&self, command: RelayCommand) {
        let name = command.name();
        match self.tx.try_send(command) {
            Ok(()) => trace!("Queued {}", name),
            Err(TrySendError::Full(_)) => warn!("Relay command queue full, dropping {}", name),
            Err(TrySendError::Closed(_)) => warn!("Relay connection closed, dropping {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlink_proto::custom::CustomData;

    #[test]
    fn commands_arrive_in_order() {
        let (relay, mut rx) = ChannelRelay::channel(4);
        relay.send(RelayCommand::SetActivePlayers(vec![1, 2]));
        relay.send(RelayCommand::Broadcast(CustomData::from_bytes(vec![7u8])));

        assert_eq!(
            rx.try_recv().unwrap(),
            RelayCommand::SetActivePlayers(vec![1, 2])
        );
        assert!(matches!(rx.try_recv().unwrap(), RelayCommand::Broadcast(_)));
    }

    #[test]
    fn full_or_closed_queue_does_not_fail_the_caller() {
        let (relay, rx) = ChannelRelay::channel(1);
        relay.send(RelayCommand::SetActivePlayers(vec![1]));
        relay.send(RelayCommand::SetActivePlayers(vec![2]));
        drop(rx);
        relay.send(RelayCommand::SetActivePlayers(vec![3]));
    }
}
