//! Boundary types shared between a couchlink client and the relay service.
//!
//! - [`device`]: device handles, roles and per-device state records
//! - [`custom`]: the opaque application payload carried by states and messages
//! - [`messages`]: relay push events and outbound relay commands
//! - [`error`]: error types

pub mod constants;
pub mod custom;
pub mod device;
pub mod error;
pub mod messages;

pub use custom::CustomData;
pub use device::{DeviceId, DeviceState, Role};
pub use error::ProtoError;
pub use messages::{RelayCommand, RelayEvent};
