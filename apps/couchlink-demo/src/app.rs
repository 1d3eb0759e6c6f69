use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use couchlink_client::{
    ClientConfig, ClientEvent, ConsoleClient, CustomData, DeviceId, DeviceState, LoopbackRelay,
    Role, SCREEN_DEVICE_ID, SessionHandler,
};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tracing::{info, warn};

use crate::args::Args;

const JOIN_CODE: &str = "4711 0815";

/// How long the event stream must stay silent before a script step is done.
const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// Custom state a controller publishes.
#[derive(Serialize, Deserialize, Debug)]
struct PadState {
    ready: bool,
    color: String,
}

/// Messages exchanged between screen and controllers.
#[derive(Serialize, Deserialize, Debug)]
enum DemoMessage {
    RoundStart { round: u32 },
    Buzz,
}

type DemoClient = ConsoleClient<Arc<LoopbackRelay>>;

pub struct App {
    args: Args,
    relay: Arc<LoopbackRelay>,
    client: Arc<DemoClient>,
    app_rx: mpsc::Receiver<ClientEvent>,
    handler_task: JoinHandle<()>,
}

impl App {
    pub fn new(args: Args) -> Self {
        let config = ClientConfig {
            role: args.role,
            synchronize_time: args.server_time_offset.is_some(),
            master_policy: args.master_policy,
        };

        let (relay, event_rx) = LoopbackRelay::new(1024);
        let relay = Arc::new(relay);
        let client = Arc::new(ConsoleClient::new(config, relay.clone()));
        let (app_tx, app_rx) = mpsc::channel(1024);

        let mut handler = SessionHandler::new(client.clone(), event_rx, app_tx);
        let handler_task = tokio::spawn(async move {
            handler.run().await;
        });

        Self {
            args,
            relay,
            client,
            app_rx,
            handler_task,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let controllers = self.join_devices();
        let local = match self.args.role {
            Role::Screen => SCREEN_DEVICE_ID,
            Role::Controller => *controllers
                .first()
                .context("the controller role needs at least one controller")?,
        };

        self.relay
            .ready(JOIN_CODE, local, self.args.server_time_offset);
        self.pump().await;

        match self.args.role {
            Role::Screen => {
                let players = self
                    .client
                    .set_active_players_from_controllers(self.args.max_players)?;
                info!(?players, "Assigned active players");
                self.client
                    .broadcast(CustomData::encode(&DemoMessage::RoundStart { round: 1 })?)?;
            }
            Role::Controller => {
                self.client.set_own_custom_value(&PadState {
                    ready: true,
                    color: "teal".to_string(),
                })?;
                // Stand in for the remote screen.
                let slots: Vec<Option<DeviceId>> = controllers
                    .iter()
                    .take(self.args.max_players)
                    .map(|id| Some(*id))
                    .collect();
                self.relay.push_active_players(&slots);
                self.relay.deliver(
                    SCREEN_DEVICE_ID,
                    CustomData::encode(&DemoMessage::RoundStart { round: 1 })?,
                );
                self.client
                    .message(SCREEN_DEVICE_ID, CustomData::encode(&DemoMessage::Buzz)?)?;
            }
        }
        self.pump().await;

        for (to, data) in self.relay.take_outbox() {
            info!(to, bytes = data.len(), "Relay delivered message");
        }

        let own = self.client.device_id();
        if let Some(last) = controllers.last().copied().filter(|&id| Some(id) != own) {
            self.relay.disconnect(last);
            self.pump().await;
        }

        self.report();
        self.handler_task.abort();
        Ok(())
    }

    fn join_devices(&self) -> Vec<DeviceId> {
        self.relay
            .connect_screen(DeviceState::new("screen-0").with_nickname("Living room"));

        (0..self.args.controllers)
            .map(|i| {
                let mut state = DeviceState::new(format!("phone-{i}")).with_login(i % 2 == 0);
                if i % 3 != 2 {
                    state = state.with_nickname(format!("Player {}", i + 1));
                }
                if i == 1 {
                    state = state
                        .with_premium(true)
                        .with_picture(format!("https://avatars.couchlink.test/{i}.png"));
                }
                self.relay.connect_controller(state)
            })
            .collect()
    }

    /// Handle application events until the session goes quiet.
    async fn pump(&mut self) {
        while let Ok(Some(event)) = timeout(QUIET_PERIOD, self.app_rx.recv()).await {
            self.on_event(event);
        }
    }

    fn on_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Ready { join_code } => {
                info!(join_code = %join_code, device_id = ?self.client.device_id(), "Ready");
            }
            ClientEvent::Connected(device_id) => {
                info!(
                    device_id,
                    nickname = ?self.client.nickname(device_id),
                    "Device connected"
                );
            }
            ClientEvent::Disconnected(device_id) => info!(device_id, "Device disconnected"),
            ClientEvent::DeviceStateChanged(_) => {}
            ClientEvent::CustomStateChanged { device_id, data } => {
                let pad = data.as_ref().map(|d| d.decode::<PadState>());
                match pad {
                    Some(Ok(pad)) => info!(device_id, ?pad, "Custom state changed"),
                    Some(Err(e)) => warn!(device_id, "Undecodable custom state: {}", e),
                    None => info!(device_id, "Custom state cleared"),
                }
            }
            ClientEvent::Premium(device_id) => info!(device_id, "Device is premium"),
            ClientEvent::ActivePlayersChanged { player_number } => {
                info!(?player_number, "Active players changed");
            }
            ClientEvent::Message { from, data } => match data.decode::<DemoMessage>() {
                Ok(message) => info!(from, ?message, "Message received"),
                Err(e) => warn!(from, "Undecodable message: {}", e),
            },
        }
    }

    fn report(&self) {
        let client = &self.client;
        // One lock for a consistent snapshot.
        let (controllers, players, master) = client.with_directory(|dir| {
            (
                dir.controller_ids(),
                dir.active_player_ids().to_vec(),
                dir.master_controller_id(),
            )
        });
        info!(
            join_code = ?client.join_code(),
            ?controllers,
            ?players,
            ?master,
            server_time = ?client.server_time(),
            "Session summary"
        );
        for device_id in controllers {
            info!(
                device_id,
                nickname = ?client.nickname(device_id),
                player_number = ?client.device_to_player_number(device_id),
                premium = ?client.is_premium(device_id),
                logged_in = ?client.is_user_logged_in(device_id),
                picture = ?client.profile_picture(device_id),
                "Controller"
            );
        }
    }
}
