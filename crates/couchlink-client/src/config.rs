use couchlink_proto::device::Role;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the master controller is picked among present controllers.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum MasterPolicy {
    /// The earliest-arrived controller.
    #[default]
    ArrivalOrder,
    /// Premium controllers first, then arrival order.
    PremiumFirst,
}

/// Configuration for a session client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Role of the local device. Privileged calls are checked against it.
    pub role: Role,
    /// Keep the relay's server time offset from the ready handshake.
    pub synchronize_time: bool,
    pub master_policy: MasterPolicy,
}

impl ClientConfig {
    pub fn screen() -> Self {
        Self {
            role: Role::Screen,
            ..Self::default()
        }
    }

    pub fn controller() -> Self {
        Self {
            role: Role::Controller,
            ..Self::default()
        }
    }

    pub fn with_time_sync(mut self, enabled: bool) -> Self {
        self.synchronize_time = enabled;
        self
    }

    pub fn with_master_policy(mut self, policy: MasterPolicy) -> Self {
        self.master_policy = policy;
        self
    }
}
