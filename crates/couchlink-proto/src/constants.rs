use crate::device::DeviceId;

/// Handle of the screen device.
/// Every session has exactly one screen and it always owns this handle.
pub const SCREEN_DEVICE_ID: DeviceId = 0;

/// Maximum encoded size of a custom-data payload, in bytes.
/// The relay drops larger device states, so encoding refuses them up front.
pub const MAX_CUSTOM_PAYLOAD: usize = 4 * 1024;

/// Prefix used when a present device has no nickname.
pub const GUEST_NICKNAME_PREFIX: &str = "Guest";
