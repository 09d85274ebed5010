use std::fmt;

use crate::management::StoreError;

/// Failures of the popup bridge, the session and the access resolver.
///
/// Only [`AuthError::Timeout`] is meant to reach UI callers as an error; the
/// session and resolver turn every other variant into a failed
/// [`AuthResult`](crate::types::AuthResult).
#[derive(Debug)]
pub enum AuthError {
    Network(String),
    PopupBlocked,
    Timeout,
    Superseded,
    Store(StoreError),
    ChannelClosed,
}

impl AuthError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Timeout)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Network(msg) => write!(f, "Network error: {}", msg),
            AuthError::PopupBlocked => {
                write!(f, "Popup blocked. Please allow popups and try again.")
            }
            AuthError::Timeout => write!(f, "Authentication timeout"),
            AuthError::Superseded => write!(f, "Authentication superseded by a newer attempt"),
            AuthError::Store(e) => write!(f, "Session storage failed: {}", e),
            AuthError::ChannelClosed => write!(f, "Message channel closed"),
        }
    }
}

impl std::error::Error for AuthError {}
