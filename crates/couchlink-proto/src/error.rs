use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("payload too large: {0}")]
    PayloadTooLarge(usize),
    #[error("postcard codec error: {0}")]
    Postcard(#[from] postcard::Error),
}
