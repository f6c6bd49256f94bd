//! Anonymous device identity for the TechInsights client.
//!
//! A device id is a UUIDv4 string generated once per local store and reused
//! for the lifetime of that store. It is attached to browser-runtime requests
//! as `X-Device-Id`. Server-runtime clients have no persistent store and
//! report an empty id, which callers treat as "omit the header".

mod identity;
mod keys;
mod store;

pub use identity::{generate_device_id, DeviceIdentity};
pub use keys::StorageKeys;
pub use store::{DeviceStore, FileDeviceStore, MemoryDeviceStore};

use thiserror::Error;

/// Error type for device store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store cannot be used at all (disabled, locked, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored document is not a JSON object of strings
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
