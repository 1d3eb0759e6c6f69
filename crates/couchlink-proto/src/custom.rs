//! Opaque application payloads.
//!
//! Device custom state and device-to-device messages use an
//! application-defined schema. The relay and the session directory pass them
//! through untouched; only the application decodes them.

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{constants::MAX_CUSTOM_PAYLOAD, error::ProtoError};

/// Application-defined payload, kept as raw bytes at the boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct CustomData(Bytes);

impl CustomData {
    /// Wrap already-encoded bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Encode a serde value with postcard.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, ProtoError> {
        let bytes = postcard::to_stdvec(value)?;
        if bytes.len() > MAX_CUSTOM_PAYLOAD {
            return Err(ProtoError::PayloadTooLarge(bytes.len()));
        }
        Ok(Self(Bytes::from(bytes)))
    }

    /// Decode the payload as a value previously written by [`CustomData::encode`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtoError> {
        Ok(postcard::from_bytes(&self.0)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
