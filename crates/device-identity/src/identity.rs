use crate::{DeviceStore, StorageKeys, StorageResult};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Source of the anonymous device id for one client runtime.
#[derive(Clone)]
pub enum DeviceIdentity {
    /// Client with a persistent local store.
    Browser { store: Arc<dyn DeviceStore> },
    /// Server-side rendering context; never has a device id.
    Server,
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceIdentity::Browser { .. } => f.write_str("DeviceIdentity::Browser"),
            DeviceIdentity::Server => f.write_str("DeviceIdentity::Server"),
        }
    }
}

impl DeviceIdentity {
    pub fn browser(store: Arc<dyn DeviceStore>) -> Self {
        DeviceIdentity::Browser { store }
    }

    pub fn server() -> Self {
        DeviceIdentity::Server
    }

    /// Return the persisted device id, creating it on first access.
    ///
    /// Never fails. The server runtime gets an empty string. If the store
    /// cannot be read or written, a fresh id is returned without being
    /// persisted, so successive calls then differ.
    pub fn device_id(&self) -> String {
        match self {
            DeviceIdentity::Server => String::new(),
            DeviceIdentity::Browser { store } => match read_or_create(store.as_ref()) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Device store unavailable, using ephemeral device id");
                    generate_device_id()
                }
            },
        }
    }

    /// Forget the persisted device id; the next access generates a new one.
    ///
    /// Returns whether an id was stored. The server runtime has nothing to
    /// forget.
    pub fn reset(&self) -> StorageResult<bool> {
        match self {
            DeviceIdentity::Server => Ok(false),
            DeviceIdentity::Browser { store } => {
                let existed = store.delete(StorageKeys::DEVICE_ID)?;
                debug!(existed, "Device id reset");
                Ok(existed)
            }
        }
    }
}

fn read_or_create(store: &dyn DeviceStore) -> StorageResult<String> {
    if let Some(existing) = store.get(StorageKeys::DEVICE_ID)? {
        if !existing.trim().is_empty() {
            return Ok(existing);
        }
    }

    let id = generate_device_id();
    store.set(StorageKeys::DEVICE_ID, &id)?;
    debug!(device_id = %id, "Generated new device id");
    Ok(id)
}

/// Generate a random UUIDv4 string.
///
/// Uses the OS CSPRNG when it is available and a time-seeded PRNG otherwise.
/// Either way the version nibble is 4 and the variant bits are `10`.
pub fn generate_device_id() -> String {
    let mut bytes = [0u8; 16];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        warn!(error = %e, "OS random source unavailable, falling back to seeded generator");
        bytes = fallback_random_bytes();
    }
    format_v4(bytes)
}

fn fallback_random_bytes() -> [u8; 16] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let seed = nanos ^ counter.rotate_left(32) ^ u64::from(std::process::id());

    let mut bytes = [0u8; 16];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes
}

fn format_v4(bytes: [u8; 16]) -> String {
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
