//! Session client.
//!
//! [`ConsoleClient`] owns the session directory behind a single mutex and the
//! injected relay transport. Relay events go through
//! [`ConsoleClient::handle_event`], which applies them in order and derives
//! the [`ClientEvent`]s the application sees. Commands are sent
//! fire-and-forget; their effect shows up when the relay echoes them.

use couchlink_proto::{
    custom::CustomData,
    device::{DeviceId, DeviceState, Role},
    messages::{RelayCommand, RelayEvent},
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{ClientConfig, MasterPolicy},
    directory::{DeviceChange, SessionDirectory},
    error::ClientError,
    event::ClientEvent,
    relay::RelayClient,
};

/// Session client: a directory fed by relay events plus an outbound relay.
pub struct ConsoleClient<R: RelayClient> {
    relay: R,
    directory: Mutex<SessionDirectory>,
}

impl<R: RelayClient> ConsoleClient<R> {
    /// Create a client that has not completed the ready handshake.
    pub fn new(config: ClientConfig, relay: R) -> Self {
        Self {
            directory: Mutex::new(SessionDirectory::new(&config)),
            relay,
        }
    }

    /// Outbound relay transport.
    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Run a closure with read access to the directory.
    pub fn with_directory<T>(&self, f: impl FnOnce(&SessionDirectory) -> T) -> T {
        f(&self.directory.lock())
    }

    /// Apply one relay event and return the resulting application events.
    pub fn handle_event(&self, event: RelayEvent) -> Vec<ClientEvent> {
        let mut dir = self.directory.lock();
        match event {
            RelayEvent::Ready {
                join_code,
                device_id,
                server_time_offset_ms,
            } => {
                if let Err(e) = dir.mark_ready(join_code.clone(), device_id, server_time_offset_ms)
                {
                    warn!("Ignoring ready signal: {}", e);
                    return Vec::new();
                }
                // Devices accumulated before the handshake become visible now.
                let mut events = vec![ClientEvent::Ready { join_code }];
                events.extend(
                    dir.device_ids()
                        .into_iter()
                        .filter(|id| *id != device_id)
                        .map(ClientEvent::Connected),
                );
                events
            }
            RelayEvent::DeviceStateChanged { device_id, state } => {
                let custom = state.as_ref().and_then(|s| s.custom.clone());
                let premium = state.as_ref().is_some_and(|s| s.premium);
                let change = dir.record_device_update(device_id, state);
                if !dir.is_ready() {
                    return Vec::new();
                }
                let is_local = dir.device_id() == Some(device_id);
                device_change_events(device_id, change, is_local, custom, premium)
            }
            RelayEvent::ActivePlayersChanged { slots } => {
                dir.apply_active_slots(&slots);
                if !dir.is_ready() {
                    return Vec::new();
                }
                vec![ClientEvent::ActivePlayersChanged {
                    player_number: dir.own_player_number(),
                }]
            }
            RelayEvent::Message { from, data } => {
                if !dir.is_ready() {
                    debug!(from, "Dropping message received before ready");
                    return Vec::new();
                }
                vec![ClientEvent::Message { from, data }]
            }
        }
    }

    /// Role of the local device.
    pub fn role(&self) -> Role {
        self.directory.lock().role()
    }

    /// Whether the ready handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.directory.lock().is_ready()
    }

    /// Join code of the session, once ready.
    pub fn join_code(&self) -> Option<String> {
        self.directory.lock().join_code().map(str::to_owned)
    }

    /// Handle of the local device, once ready.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.directory.lock().device_id()
    }

    /// Switch the master controller policy.
    pub fn set_master_policy(&self, policy: MasterPolicy) {
        self.directory.lock().set_master_policy(policy);
    }

    /// Snapshot of a present device's record.
    pub fn device(&self, device_id: DeviceId) -> Option<DeviceState> {
        self.directory.lock().device(device_id).cloned()
    }

    /// Last confirmed custom state of a present device.
    pub fn custom_state(&self, device_id: DeviceId) -> Option<CustomData> {
        self.directory.lock().custom_state(device_id).cloned()
    }

    pub fn uid(&self, device_id: DeviceId) -> Option<String> {
        self.directory.lock().uid(device_id).map(str::to_owned)
    }

    /// Nickname of a present device, with the guest fallback.
    pub fn nickname(&self, device_id: DeviceId) -> Option<String> {
        self.directory.lock().nickname(device_id)
    }

    pub fn profile_picture(&self, device_id: DeviceId) -> Option<String> {
        self.directory
            .lock()
            .profile_picture(device_id)
            .map(str::to_owned)
    }

    pub fn is_premium(&self, device_id: DeviceId) -> Option<bool> {
        self.directory.lock().is_premium(device_id)
    }

    pub fn is_user_logged_in(&self, device_id: DeviceId) -> Option<bool> {
        self.directory.lock().is_user_logged_in(device_id)
    }

    pub fn has_slow_connection(&self, device_id: DeviceId) -> Option<bool> {
        self.directory.lock().has_slow_connection(device_id)
    }

    /// Present handles in arrival order, screen included.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.directory.lock().device_ids()
    }

    /// Present controller handles in arrival order.
    pub fn controller_ids(&self) -> Vec<DeviceId> {
        self.directory.lock().controller_ids()
    }

    /// Controller picked by the master policy.
    pub fn master_controller_id(&self) -> Option<DeviceId> {
        self.directory.lock().master_controller_id()
    }

    /// Active players indexed by player number.
    pub fn active_player_ids(&self) -> Vec<DeviceId> {
        self.directory.lock().active_player_ids().to_vec()
    }

    pub fn player_count(&self) -> usize {
        self.directory.lock().player_count()
    }

    /// Zero-based player number of a handle.
    pub fn device_to_player_number(&self, device_id: DeviceId) -> Option<usize> {
        self.directory.lock().device_to_player_number(device_id)
    }

    /// Handle holding a player number.
    pub fn player_number_to_device(&self, player_number: usize) -> Option<DeviceId> {
        self.directory.lock().player_number_to_device(player_number)
    }

    /// Player number of the local device.
    pub fn own_player_number(&self) -> Option<usize> {
        self.directory.lock().own_player_number()
    }

    /// Server time for a local wall-clock reading, when time sync is on.
    pub fn server_time_at(&self, local_ms: i64) -> Option<i64> {
        self.directory.lock().server_time_at(local_ms)
    }

    /// Server time for the current wall clock.
    pub fn server_time(&self) -> Option<i64> {
        self.server_time_at(current_time_ms())
    }

    /// Ask the relay to replace the local device's custom state.
    ///
    /// The directory keeps the old value until the relay echoes the change.
    pub fn set_own_custom_state(&self, data: CustomData) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        debug!(len = data.len(), "Sending own custom state");
        self.relay.send(RelayCommand::SetCustomState(data));
        Ok(())
    }

    /// Encode `value` and send it as the local device's custom state.
    pub fn set_own_custom_value<T: Serialize>(&self, value: &T) -> Result<(), ClientError> {
        let data = CustomData::encode(value)?;
        self.set_own_custom_state(data)
    }

    /// Assign player slots (screen only). Gaps are allowed and dropped.
    pub fn set_active_players(&self, slots: &[Option<DeviceId>]) -> Result<(), ClientError> {
        let assigned = {
            let mut dir = self.directory.lock();
            dir.require_screen("set_active_players")?;
            if !dir.is_ready() {
                return Err(ClientError::NotReady);
            }
            dir.set_active_slots(slots)?;
            dir.active_player_ids().to_vec()
        };
        info!(players = ?assigned, "Assigning active players");
        self.relay.send(RelayCommand::SetActivePlayers(assigned));
        Ok(())
    }

    /// Make the first `max_players` controllers (arrival order) the active players.
    pub fn set_active_players_from_controllers(
        &self,
        max_players: usize,
    ) -> Result<Vec<DeviceId>, ClientError> {
        let slots: Vec<Option<DeviceId>> = {
            let dir = self.directory.lock();
            dir.require_screen("set_active_players")?;
            dir.controller_ids()
                .into_iter()
                .take(max_players)
                .map(Some)
                .collect()
        };
        self.set_active_players(&slots)?;
        Ok(slots.into_iter().flatten().collect())
    }

    /// Send a message to one device.
    pub fn message(&self, to: DeviceId, data: CustomData) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        self.relay.send(RelayCommand::Message { to, data });
        Ok(())
    }

    /// Send a message to every other device.
    pub fn broadcast(&self, data: CustomData) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        self.relay.send(RelayCommand::Broadcast(data));
        Ok(())
    }
}

fn device_change_events(
    device_id: DeviceId,
    change: DeviceChange,
    is_local: bool,
    custom: Option<CustomData>,
    premium: bool,
) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    match change {
        DeviceChange::Ignored => return events,
        DeviceChange::Joined => {
            if !is_local {
                events.push(ClientEvent::Connected(device_id));
            }
            events.push(ClientEvent::DeviceStateChanged(device_id));
            if custom.is_some() {
                events.push(ClientEvent::CustomStateChanged {
                    device_id,
                    data: custom,
                });
            }
            if premium {
                events.push(ClientEvent::Premium(device_id));
            }
        }
        DeviceChange::Updated {
            custom_changed,
            premium_gained,
        } => {
            events.push(ClientEvent::DeviceStateChanged(device_id));
            if custom_changed {
                events.push(ClientEvent::CustomStateChanged {
                    device_id,
                    data: custom,
                });
            }
            if premium_gained {
                events.push(ClientEvent::Premium(device_id));
            }
        }
        DeviceChange::Left => {
            if !is_local {
                events.push(ClientEvent::Disconnected(device_id));
            }
            events.push(ClientEvent::DeviceStateChanged(device_id));
        }
    }
    events
}

/// Get current wall-clock time in milliseconds.
fn current_time_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
