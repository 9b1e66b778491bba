use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MAX_IDLE_SECS, Provider, Session, SessionError, registry};

const SESSION_ID_BYTES: usize = 32;

/// Entry point for request handlers.
///
/// Binds clients to provider sessions through a single HTTP-only cookie and runs the periodic idle
/// sweep. Starting, destroying and sweeping are serialized per manager so a client can never end up
/// with two sessions from racing requests.
pub struct SessionManager {
    provider: Arc<dyn Provider>,
    cookie_name: String,
    max_idle_secs: u64,
    lock: Mutex<()>,
}

impl SessionManager {
    /// Builds a manager over the provider registered as `provider_name`.
    pub fn new(
        provider_name: &str,
        cookie_name: &str,
        max_idle_secs: u64,
    ) -> Result<Self, SessionError> {
        let provider = registry::lookup(provider_name)
            .ok_or_else(|| SessionError::UnknownProvider(provider_name.to_string()))?;
        Self::with_provider(provider, cookie_name, max_idle_secs)
    }

    /// Builds a manager over an explicit provider, bypassing the registry.
    pub fn with_provider(
        provider: Arc<dyn Provider>,
        cookie_name: &str,
        max_idle_secs: u64,
    ) -> Result<Self, SessionError> {
        if max_idle_secs == 0 || max_idle_secs > MAX_IDLE_SECS {
            return Err(SessionError::InvalidLifetime);
        }
        Ok(Self {
            provider,
            cookie_name: cookie_name.to_string(),
            max_idle_secs,
            lock: Mutex::new(()),
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn max_idle_secs(&self) -> u64 {
        self.max_idle_secs
    }

    /// Returns the session named by the request cookie, or starts a new one.
    ///
    /// A live session is returned as is and the jar is left untouched. Otherwise a fresh id is minted
    /// and the returned jar carries the cookie for it.
    pub fn session_start(&self, jar: CookieJar) -> Result<(CookieJar, Session), SessionError> {
        let _guard = self.lock.lock();
        if let Some(session) = self.session_check(&jar) {
            return Ok((jar, session));
        }

        let id = new_session_id()?;
        let session = self.provider.init(&id);
        tracing::debug!("started new session");

        let max_age = i64::try_from(self.max_idle_secs).unwrap_or(i64::MAX);
        let cookie = Cookie::build((self.cookie_name.clone(), urlencoding::encode(&id).into_owned()))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::seconds(max_age));
        Ok((jar.add(cookie), session))
    }

    /// Looks up the session named by the request cookie without creating anything.
    pub fn session_check(&self, jar: &CookieJar) -> Option<Session> {
        let id = self.cookie_session_id(jar)?;
        self.provider.read(&id)
    }

    /// Drops the session named by the request cookie and tells the client to discard the cookie.
    /// Without a cookie this does nothing.
    pub fn session_destroy(&self, jar: CookieJar) -> CookieJar {
        if jar
            .get(&self.cookie_name)
            .is_none_or(|cookie| cookie.value().is_empty())
        {
            return jar;
        }

        let _guard = self.lock.lock();
        if let Some(id) = self.cookie_session_id(&jar) {
            self.provider.destroy(&id);
            tracing::debug!("destroyed session");
        }
        jar.remove(
            Cookie::build(self.cookie_name.clone())
                .path("/")
                .http_only(true),
        )
    }

    /// Runs one idle sweep over the provider and returns how many sessions it removed.
    pub fn gc(&self) -> usize {
        let _guard = self.lock.lock();
        let removed = self.provider.sweep(self.max_idle_secs);
        if removed > 0 {
            tracing::info!(removed, "expired idle sessions");
        }
        removed
    }

    /// Spawns the background sweep loop.
    ///
    /// The loop sweeps once immediately, then waits `max_idle_secs` after each sweep finishes before
    /// starting the next one. It runs until `shutdown` is cancelled.
    pub fn spawn_gc(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let period = Duration::from_secs(self.max_idle_secs);
        tokio::spawn(async move {
            tracing::info!(period_secs = period.as_secs(), "session gc started");
            loop {
                self.gc();
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }
            }
            tracing::info!("session gc stopped");
        })
    }

    fn cookie_session_id(&self, jar: &CookieJar) -> Option<String> {
        let cookie = jar.get(&self.cookie_name)?;
        if cookie.value().is_empty() {
            return None;
        }
        urlencoding::decode(cookie.value())
            .ok()
            .map(|id| id.into_owned())
    }
}

/// 32 bytes from the OS random source, URL-safe base64 encoded.
fn new_session_id() -> Result<String, SessionError> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE.encode(bytes))
}
