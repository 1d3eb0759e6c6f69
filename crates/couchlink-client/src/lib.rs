//! Couchlink session client
//!
//! Client-side view of a screen/controller relay session: which devices are
//! present, what state they report, which of them are active players, and
//! which controller is the master. All session logic lives in the relay; this
//! crate only caches what the relay pushes and forwards commands to it.
//!
//! # Architecture
//!
//! - [`directory`]: the session directory (membership, state, player slots)
//! - [`client`]: explicit client object with injected relay and lifecycle
//! - [`handler`]: async pump from relay events to application events
//! - [`relay`]: the outbound relay trait and a channel-backed implementation
//! - [`loopback`]: an in-process relay for offline sessions and tests
//! - [`error`]: error types

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod handler;
pub mod loopback;
pub mod relay;

// Re-export commonly used types
pub use client::ConsoleClient;
pub use config::{ClientConfig, MasterPolicy};
pub use couchlink_proto::constants::SCREEN_DEVICE_ID;
pub use couchlink_proto::{CustomData, DeviceId, DeviceState, RelayCommand, RelayEvent, Role};
pub use directory::{DeviceChange, Phase, SessionDirectory};
pub use error::ClientError;
pub use event::ClientEvent;
pub use handler::SessionHandler;
pub use loopback::LoopbackRelay;
pub use relay::{ChannelRelay, RelayClient};
