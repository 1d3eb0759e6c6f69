//! In-process relay.
//!
//! Plays the relay's part for offline sessions and tests: it owns the
//! authoritative device table, hands out handles, and echoes commands back as
//! the events a hosted relay would push. Handles are never reused, so a
//! device that reconnects through [`LoopbackRelay::reconnect`] keeps its
//! handle.

use std::collections::BTreeMap;

use couchlink_proto::{
    constants::SCREEN_DEVICE_ID,
    custom::CustomData,
    device::{DeviceId, DeviceState},
    messages::{RelayCommand, RelayEvent},
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::relay::RelayClient;

#[derive(Debug)]
struct LoopbackState {
    /// Device the attached client runs on.
    local: Option<DeviceId>,
    devices: BTreeMap<DeviceId, DeviceState>,
    departed: BTreeMap<DeviceId, DeviceState>,
    next_controller_id: DeviceId,
    /// Messages addressed to devices other than the local one.
    outbox: Vec<(DeviceId, CustomData)>,
}

pub struct LoopbackRelay {
    events: mpsc::Sender<RelayEvent>,
    state: Mutex<LoopbackState>,
}

impl LoopbackRelay {
    /// Create a relay and the event stream its attached client consumes.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let relay = Self {
            events: tx,
            state: Mutex::new(LoopbackState {
                local: None,
                devices: BTreeMap::new(),
                departed: BTreeMap::new(),
                next_controller_id: SCREEN_DEVICE_ID + 1,
                outbox: Vec::new(),
            }),
        };
        (relay, rx)
    }

    fn emit(&self, event: RelayEvent) {
        let name = event.name();
        if self.events.try_send(event).is_err() {
            warn!("Loopback event stream unavailable, dropping {}", name);
        }
    }

    pub fn connect_screen(&self, state: DeviceState) -> DeviceId {
        self.state
            .lock()
            .devices
            .insert(SCREEN_DEVICE_ID, state.clone());
        self.emit(RelayEvent::DeviceStateChanged {
            device_id: SCREEN_DEVICE_ID,
            state: Some(state),
        });
        SCREEN_DEVICE_ID
    }

    pub fn connect_controller(&self, state: DeviceState) -> DeviceId {
        let device_id = {
            let mut st = self.state.lock();
            let device_id = st.next_controller_id;
            st.next_controller_id += 1;
            st.devices.insert(device_id, state.clone());
            device_id
        };
        debug!(device_id, uid = %state.uid, "Loopback controller connected");
        self.emit(RelayEvent::DeviceStateChanged {
            device_id,
            state: Some(state),
        });
        device_id
    }

    /// Modify a connected device's state and push the result.
    pub fn update(&self, device_id: DeviceId, f: impl FnOnce(&mut DeviceState)) -> bool {
        let state = {
            let mut st = self.state.lock();
            let Some(state) = st.devices.get_mut(&device_id) else {
                return false;
            };
            f(state);
            state.clone()
        };
        self.emit(RelayEvent::DeviceStateChanged {
            device_id,
            state: Some(state),
        });
        true
    }

    pub fn disconnect(&self, device_id: DeviceId) -> bool {
        {
            let mut st = self.state.lock();
            let Some(state) = st.devices.remove(&device_id) else {
                return false;
            };
            st.departed.insert(device_id, state);
        }
        self.emit(RelayEvent::DeviceStateChanged {
            device_id,
            state: None,
        });
        true
    }

    /// Bring a departed device back under its original handle.
    pub fn reconnect(&self, device_id: DeviceId) -> bool {
        let state = {
            let mut st = self.state.lock();
            let Some(state) = st.departed.remove(&device_id) else {
                return false;
            };
            st.devices.insert(device_id, state.clone());
            state
        };
        self.emit(RelayEvent::DeviceStateChanged {
            device_id,
            state: Some(state),
        });
        true
    }

    /// Complete the handshake for the client running on `local`.
    pub fn ready(
        &self,
        join_code: impl Into<String>,
        local: DeviceId,
        server_time_offset_ms: Option<i64>,
    ) {
        self.state.lock().local = Some(local);
        self.emit(RelayEvent::Ready {
            join_code: join_code.into(),
            device_id: local,
            server_time_offset_ms,
        });
    }

    /// Push a slot assignment made by a remote screen.
    pub fn push_active_players(&self, slots: &[Option<DeviceId>]) {
        self.emit(RelayEvent::ActivePlayersChanged {
            slots: slots.to_vec(),
        });
    }

    /// Deliver a message from `from` to the local device.
    pub fn deliver(&self, from: DeviceId, data: CustomData) {
        self.emit(RelayEvent::Message { from, data });
    }

    /// Drain messages the local device sent to other devices.
    pub fn take_outbox(&self) -> Vec<(DeviceId, CustomData)> {
        std::mem::take(&mut self.state.lock().outbox)
    }
}

impl RelayClient for LoopbackRelay {
    fn send(&self, command: RelayCommand) {
        match command {
            RelayCommand::SetCustomState(data) => {
                let echoed = {
                    let mut st = self.state.lock();
                    let Some(local) = st.local else {
                        warn!("Custom state sent before the handshake, dropping");
                        return;
                    };
                    st.devices.get_mut(&local).map(|state| {
                        state.custom = Some(data);
                        (local, state.clone())
                    })
                };
                match echoed {
                    Some((device_id, state)) => self.emit(RelayEvent::DeviceStateChanged {
                        device_id,
                        state: Some(state),
                    }),
                    None => warn!("Local device is not connected, dropping custom state"),
                }
            }
            RelayCommand::SetActivePlayers(device_ids) => {
                self.emit(RelayEvent::ActivePlayersChanged {
                    slots: device_ids.into_iter().map(Some).collect(),
                });
            }
            RelayCommand::Message { to, data } => {
                self.state.lock().outbox.push((to, data));
            }
            RelayCommand::Broadcast(data) => {
                let mut st = self.state.lock();
                let local = st.local;
                let targets: Vec<DeviceId> = st
                    .devices
                    .keys()
                    .copied()
                    .filter(|id| Some(*id) != local)
                    .collect();
                for to in targets {
                    st.outbox.push((to, data.clone()));
                }
            }
        }
    }
}
