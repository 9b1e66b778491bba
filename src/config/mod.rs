use std::env;
use std::time::Duration;

use crate::session::MAX_IDLE_SECS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("SESSION_MAX_IDLE_SECS must be between 1 and {max}, got {0}", max = MAX_IDLE_SECS)]
    SessionLifetimeOutOfRange(u64),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub session_provider: String,
    pub session_cookie_name: String,
    pub session_max_idle_secs: u64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let session_max_idle_secs =
            session_lifetime(parse_or("SESSION_MAX_IDLE_SECS", 3600)?)?;

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 8080)?,
            session_provider: env::var("SESSION_PROVIDER").unwrap_or_else(|_| "memory".into()),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "sessionid".into()),
            session_max_idle_secs,
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    pub fn session_max_idle(&self) -> Duration {
        Duration::from_secs(self.session_max_idle_secs)
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn session_lifetime(secs: u64) -> Result<u64, ConfigError> {
    if secs == 0 || secs > MAX_IDLE_SECS {
        return Err(ConfigError::SessionLifetimeOutOfRange(secs));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifetime_bounds() {
        assert_eq!(session_lifetime(1).unwrap(), 1);
        assert_eq!(session_lifetime(3600).unwrap(), 3600);
        assert_eq!(session_lifetime(MAX_IDLE_SECS).unwrap(), MAX_IDLE_SECS);

        for secs in [0, MAX_IDLE_SECS + 1, u64::MAX] {
            assert!(matches!(
                session_lifetime(secs),
                Err(ConfigError::SessionLifetimeOutOfRange(got)) if got == secs
            ));
        }
    }
}
