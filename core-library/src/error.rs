use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Catalog request failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("Catalog response contained no songs")]
    EmptyCatalog,

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Cache error: {0}")]
    CacheError(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
