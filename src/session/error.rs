#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session provider {0:?} (was it registered at startup?)")]
    UnknownProvider(String),

    #[error("session idle lifetime must be between 1 and {} seconds", crate::session::MAX_IDLE_SECS)]
    InvalidLifetime,

    #[error("failed to read from the system random source: {0}")]
    Entropy(#[from] rand::Error),

    #[error("session field {0:?} is not set")]
    MissingField(String),

    #[error("session field {key:?} has an unexpected shape: {source}")]
    FieldType {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
