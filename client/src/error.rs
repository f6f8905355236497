use thiserror::Error;

/// Client-side failure taxonomy. Network-layer problems stay distinct from
/// messages the server reported, so callers can phrase them differently.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request timed out. Check your connection.")]
    Timeout,
    #[error("Could not reach the server.")]
    Connection,
    #[error("Session expired. Log in again.")]
    SessionExpired,
    #[error("Not logged in.")]
    NoSession,
    /// Message reported by the server (validation, permissions, …).
    #[error("{0}")]
    Server(String),
    #[error("Local storage: {0}")]
    Storage(String),
}

impl ClientError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connection
        } else {
            ClientError::Server(err.to_string())
        }
    }
}
