use thiserror::Error;

/// Failure talking to the GA service. Every variant names the endpoint so the
/// message is usable as-is in the UI.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("{endpoint}: request failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint}: HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// A 2xx response carrying the service's own `{"error": ...}` envelope.
    #[error("{endpoint}: {message}")]
    Service { endpoint: String, message: String },

    #[error("{endpoint}: unexpected response: {message}")]
    Decode { endpoint: String, message: String },
}

impl ClientError {
    pub fn endpoint(&self) -> &str {
        match self {
            ClientError::Transport { endpoint, .. }
            | ClientError::Status { endpoint, .. }
            | ClientError::Service { endpoint, .. }
            | ClientError::Decode { endpoint, .. } => endpoint,
        }
    }

    /// True when the service could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("target phrase must not be empty")]
    EmptyTarget,

    #[error("a session is already running; stop or reset it first")]
    AlreadyRunning,

    /// The session was stopped, reset or restarted while `initialize` was in flight.
    #[error("session start was superseded")]
    Superseded,

    #[error(transparent)]
    Client(#[from] ClientError),
}
