//! Relay contract.
//!
//! [`RelayEvent`]s are pushed by the relay in emission order and are the only
//! source of directory mutations. [`RelayCommand`]s are fire-and-forget; their
//! effect becomes visible when the matching event loops back.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    custom::CustomData,
    device::{DeviceId, DeviceState},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum RelayEvent {
    /// Handshake completed. Sent once per session.
    Ready {
        join_code: String,
        /// Handle the relay assigned to the local device.
        device_id: DeviceId,
        /// Offset to add to the local wall clock (ms) to get server time.
        server_time_offset_ms: Option<i64>,
    },
    /// A device joined, changed state, or left (`state == None`).
    DeviceStateChanged {
        device_id: DeviceId,
        state: Option<DeviceState>,
    },
    /// The screen assigned player slots. Gaps are `None`.
    ActivePlayersChanged { slots: Vec<Option<DeviceId>> },
    /// A device sent a message to the local device.
    Message { from: DeviceId, data: CustomData },
}

impl RelayEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum RelayCommand {
    /// Replace the local device's custom state.
    SetCustomState(CustomData),
    /// Replace the session's player slots (screen only).
    SetActivePlayers(Vec<DeviceId>),
    /// Send a payload to one device.
    Message { to: DeviceId, data: CustomData },
    /// Send a payload to every other device.
    Broadcast(CustomData),
}

impl RelayCommand {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_variants() {
        let event = RelayEvent::DeviceStateChanged {
            device_id: 3,
            state: None,
        };
        assert_eq!(event.name(), "DeviceStateChanged");
        assert_eq!(
            RelayCommand::SetActivePlayers(vec![1, 2]).name(),
            "SetActivePlayers"
        );
    }

    #[test]
    fn device_state_event_survives_postcard() {
        let event = RelayEvent::DeviceStateChanged {
            device_id: 7,
            state: Some(
                DeviceState::new("abc")
                    .with_custom(CustomData::from_bytes(vec![9u8, 8, 7]))
                    .with_premium(true),
            ),
        };
        let bytes = postcard::to_stdvec(&event).unwrap();
        let decoded: RelayEvent = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}
