//! In-memory session provider.
//!
//! All live sessions sit in one [`RecencyList`] behind a single mutex. Each session keeps its own
//! field map behind its own mutex and reaches back into the provider to refresh its position whenever
//! it is used. The two locks are never held at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::TimeDelta;
use parking_lot::Mutex;
use serde_json::Value;

use crate::session::{Clock, Provider, Session, SessionStore, SystemClock};

mod recency;

use recency::RecencyList;

/// Name the memory provider registers under.
pub const NAME: &str = "memory";

/// Registers a fresh [`MemoryProvider`] under [`NAME`] in the process-wide registry.
pub fn register() -> bool {
    crate::session::register(NAME, Arc::new(MemoryProvider::new()))
}

struct Shared {
    sessions: Mutex<RecencyList<Arc<MemorySession>>>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn touch(&self, id: &str) {
        let mut sessions = self.sessions.lock();
        sessions.touch(id, self.clock.now());
    }
}

pub struct MemoryProvider {
    shared: Arc<Shared>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                sessions: Mutex::new(RecencyList::default()),
                clock,
            }),
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.shared.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for MemoryProvider {
    fn init(&self, id: &str) -> Session {
        let session = Arc::new(MemorySession {
            id: id.to_string(),
            values: Mutex::new(HashMap::new()),
            shared: Arc::downgrade(&self.shared),
        });
        let mut sessions = self.shared.sessions.lock();
        let now = self.shared.clock.now();
        sessions.push_front(id.to_string(), Arc::clone(&session), now);
        session
    }

    fn read(&self, id: &str) -> Option<Session> {
        let sessions = self.shared.sessions.lock();
        sessions
            .get(id)
            .map(|session| Arc::clone(session) as Session)
    }

    fn destroy(&self, id: &str) {
        self.shared.sessions.lock().remove(id);
    }

    fn sweep(&self, max_idle_secs: u64) -> usize {
        // Windows longer than a timestamp can span never expire anything.
        let Some(max_idle) = i64::try_from(max_idle_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
        else {
            return 0;
        };
        let mut sessions = self.shared.sessions.lock();
        let now = self.shared.clock.now();
        let evicted = sessions.evict_idle(now, max_idle);
        if !evicted.is_empty() {
            tracing::debug!(
                evicted = evicted.len(),
                remaining = sessions.len(),
                "memory provider swept idle sessions"
            );
        }
        evicted.len()
    }
}

struct MemorySession {
    id: String,
    values: Mutex<HashMap<String, Value>>,
    shared: Weak<Shared>,
}

impl MemorySession {
    fn touch(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.touch(&self.id);
        }
    }
}

impl SessionStore for MemorySession {
    fn set(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
        self.touch();
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.touch();
        self.values.lock().get(key).cloned()
    }

    fn delete(&self, key: &str) {
        self.values.lock().remove(key);
        self.touch();
    }

    fn id(&self) -> &str {
        &self.id
    }
}
