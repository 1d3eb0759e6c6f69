//! Event pump between the relay and the application.
//!
//! Relay events are applied strictly in arrival order; every derived
//! [`ClientEvent`] is forwarded to the application channel before the next
//! relay event is taken.

use std::sync::Arc;

use couchlink_proto::messages::RelayEvent;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{client::ConsoleClient, event::ClientEvent, relay::RelayClient};

pub struct SessionHandler<R: RelayClient> {
    client: Arc<ConsoleClient<R>>,
    /// Events pushed by the relay.
    event_rx: mpsc::Receiver<RelayEvent>,
    /// Channel to send directory notifications up to the application.
    app_event_tx: mpsc::Sender<ClientEvent>,
}

impl<R: RelayClient> SessionHandler<R> {
    pub fn new(
        client: Arc<ConsoleClient<R>>,
        event_rx: mpsc::Receiver<RelayEvent>,
        app_event_tx: mpsc::Sender<ClientEvent>,
    ) -> Self {
        Self {
            client,
            event_rx,
            app_event_tx,
        }
    }

    /// Client whose directory this handler feeds.
    pub fn client(&self) -> &Arc<ConsoleClient<R>> {
        &self.client
    }

    /// Run until the relay stream or the application channel closes.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                biased;

                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Relay event channel closed");
                        return;
                    };
                    debug!("Received {}", event.name());
                    for app_event in self.client.handle_event(event) {
                        if self.app_event_tx.send(app_event).await.is_err() {
                            debug!("Application event channel closed");
                            return;
                        }
                    }
                }

                _ = self.app_event_tx.closed() => {
                    debug!("Application event channel closed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use couchlink_proto::{constants::SCREEN_DEVICE_ID, device::DeviceState};
    use tokio::time::timeout;

    use super::*;
    use crate::{config::ClientConfig, relay::ChannelRelay};

    type TestHandler = SessionHandler<ChannelRelay>;

    fn handler() -> (TestHandler, mpsc::Sender<RelayEvent>, mpsc::Receiver<ClientEvent>) {
        let (relay, _commands) = ChannelRelay::channel(16);
        let client = Arc::new(ConsoleClient::new(ClientConfig::screen(), relay));
        let (event_tx, event_rx) = mpsc::channel(16);
        let (app_tx, app_rx) = mpsc::channel(16);
        let handler = SessionHandler::new(client, event_rx, app_tx);
        (handler, event_tx, app_rx)
    }

    #[tokio::test]
    async fn forwards_events_until_relay_closes() {
        let (mut handler, event_tx, mut app_rx) = handler();
        event_tx
            .send(RelayEvent::Ready {
                join_code: "4711".to_string(),
                device_id: SCREEN_DEVICE_ID,
                server_time_offset_ms: None,
            })
            .await
            .unwrap();
        event_tx
            .send(RelayEvent::DeviceStateChanged {
                device_id: 2,
                state: Some(DeviceState::new("two")),
            })
            .await
            .unwrap();
        drop(event_tx);

        timeout(Duration::from_secs(1), handler.run())
            .await
            .expect("handler did not stop after the relay closed");

        assert!(handler.client().is_ready());
        drop(handler);
        assert_eq!(
            app_rx.recv().await,
            Some(ClientEvent::Ready {
                join_code: "4711".to_string()
            })
        );
        assert_eq!(app_rx.recv().await, Some(ClientEvent::Connected(2)));
        assert_eq!(
            app_rx.recv().await,
            Some(ClientEvent::DeviceStateChanged(2))
        );
        assert_eq!(app_rx.recv().await, None);
    }

    #[tokio::test]
    async fn stops_when_application_goes_away() {
        let (mut handler, event_tx, app_rx) = handler();
        drop(app_rx);

        timeout(Duration::from_secs(1), handler.run())
            .await
            .expect("handler did not stop after the application channel closed");
        drop(event_tx);
    }

    #[tokio::test]
    async fn stops_when_both_channels_close() {
        let (mut handler, event_tx, app_rx) = handler();
        drop(app_rx);
        drop(event_tx);

        timeout(Duration::from_secs(1), handler.run())
            .await
            .expect("handler did not stop after both channels closed");
    }
}
