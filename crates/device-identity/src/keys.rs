//! Storage key constants.

/// Keys used in the local device store.
pub struct StorageKeys;

impl StorageKeys {
    /// Anonymous device identifier.
    pub const DEVICE_ID: &'static str = "ti_device_id";
}
