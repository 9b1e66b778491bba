//! Server-side sessions.
//!
//! A [`SessionManager`] binds clients to sessions through a cookie. The sessions themselves live in a
//! [`Provider`], looked up by name from the process-wide registry when the manager is built. Only the
//! in-memory provider ships today; other stores plug in by implementing [`Provider`] and calling
//! [`register`] during startup.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

mod clock;
mod error;
mod manager;
pub mod providers;
mod registry;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub(crate) use clock::ManualClock;
pub use error::SessionError;
pub use manager::SessionManager;
pub use registry::{ProviderRegistry, lookup, register};

/// Longest idle lifetime, in seconds, that timestamps and cookie ages can represent.
pub const MAX_IDLE_SECS: u64 = (i64::MAX / 1000) as u64;

/// Shared handle to one session's state.
pub type Session = Arc<dyn SessionStore>;

/// Field access for a single session. Every call except [`SessionStore::id`] counts as activity and
/// refreshes the session's idle clock.
pub trait SessionStore: Send + Sync {
    /// Inserts or overwrites `key`.
    fn set(&self, key: &str, value: Value);

    /// Returns `None` when `key` was never set or has been deleted.
    fn get(&self, key: &str) -> Option<Value>;

    /// Removing an absent key is a no-op.
    fn delete(&self, key: &str);

    fn id(&self) -> &str;
}

impl dyn SessionStore + '_ {
    /// Reads `key` and converts it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, SessionError> {
        let value = self
            .get(key)
            .ok_or_else(|| SessionError::MissingField(key.to_string()))?;
        serde_json::from_value(value).map_err(|source| SessionError::FieldType {
            key: key.to_string(),
            source,
        })
    }
}

/// A backing store for sessions.
///
/// A provider is the only thing allowed to create or drop sessions. Implementations must be safe to
/// call from any number of request handlers at once.
pub trait Provider: Send + Sync {
    /// Creates an empty session under `id`.
    fn init(&self, id: &str) -> Session;

    /// Looks up a live session. Never creates one.
    fn read(&self, id: &str) -> Option<Session>;

    /// Drops the session if it exists.
    fn destroy(&self, id: &str);

    /// Removes every session idle for longer than `max_idle_secs` and returns how many went.
    fn sweep(&self, max_idle_secs: u64) -> usize;
}
