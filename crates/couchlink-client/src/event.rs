use couchlink_proto::{custom::CustomData, device::DeviceId};

/// Notifications surfaced to the application after the directory has
/// applied a relay event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The ready handshake completed.
    Ready {
        join_code: String,
    },
    /// Another device joined the session.
    Connected(DeviceId),
    /// Another device left the session.
    Disconnected(DeviceId),
    /// Any change to a device record, including joins and leaves.
    DeviceStateChanged(DeviceId),
    /// A device's custom state changed. `None` when it was cleared.
    CustomStateChanged {
        device_id: DeviceId,
        data: Option<CustomData>,
    },
    /// A device became premium.
    Premium(DeviceId),
    /// The screen reassigned player slots. Carries the local player number.
    ActivePlayersChanged {
        player_number: Option<usize>,
    },
    /// Message from another device.
    Message {
        from: DeviceId,
        data: CustomData,
    },
}
