//! Client error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{operation} is only available to the screen")]
    PermissionDenied { operation: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("session is not ready yet")]
    NotReady,

    #[error("session is already ready")]
    AlreadyReady,

    #[error("protocol error: {0}")]
    Proto(#[from] couchlink_proto::error::ProtoError),
}
