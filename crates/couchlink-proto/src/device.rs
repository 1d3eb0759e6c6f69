use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{constants::SCREEN_DEVICE_ID, custom::CustomData};

/// Session-local device handle assigned by the relay.
///
/// A handle is bound to one physical device for the whole session, including
/// across reconnects.
pub type DeviceId = u32;

/// Role a device plays in a session.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    /// The shared display. Owns [`SCREEN_DEVICE_ID`] and assigns player slots.
    Screen,
    /// A player's handheld device.
    #[default]
    Controller,
}

impl Role {
    /// Role implied by a device handle.
    pub fn of_device(device_id: DeviceId) -> Self {
        if device_id == SCREEN_DEVICE_ID {
            Self::Screen
        } else {
            Self::Controller
        }
    }

    pub fn is_screen(self) -> bool {
        matches!(self, Self::Screen)
    }
}

/// State the relay reports for one device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceState {
    /// Globally unique identifier of the physical device or account.
    pub uid: String,
    /// Application-defined state, passed through undecoded.
    pub custom: Option<CustomData>,
    pub nickname: Option<String>,
    /// Set by the relay while the device's connection is degraded.
    pub slow_connection: Option<bool>,
    /// Profile picture reference.
    pub picture: Option<String>,
    pub premium: bool,
    pub login: bool,
}

impl DeviceState {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    pub fn with_custom(mut self, custom: CustomData) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    pub fn with_premium(mut self, premium: bool) -> Self {
        self.premium = premium;
        self
    }

    pub fn with_login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_follows_reserved_handle() {
        assert_eq!(Role::of_device(SCREEN_DEVICE_ID), Role::Screen);
        assert_eq!(Role::of_device(4), Role::Controller);
        assert!(Role::Screen.is_screen());
        assert!(!Role::Controller.is_screen());
    }

    #[test]
    fn role_parses_from_cli_text() {
        assert_eq!("screen".parse::<Role>().unwrap(), Role::Screen);
        assert_eq!("Controller".parse::<Role>().unwrap(), Role::Controller);
        assert!("spectator".parse::<Role>().is_err());
        assert_eq!(Role::Screen.to_string(), "screen");
    }

    #[test]
    fn builder_sets_fields() {
        let state = DeviceState::new("uid-1")
            .with_nickname("Ada")
            .with_premium(true)
            .with_login(true);
        assert_eq!(state.uid, "uid-1");
        assert_eq!(state.nickname.as_deref(), Some("Ada"));
        assert!(state.premium);
        assert!(state.login);
        assert!(state.custom.is_none());
        assert!(state.slow_connection.is_none());
    }
}
