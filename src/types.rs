use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationRequest {
    #[serde(rename = "authUrl")]
    pub auth_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Free,
    Premium,
    Open,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// The provider's user object. Fields this crate does not interpret are kept
/// in `extra` so the stored profile matches what the provider sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyUserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<SpotifyImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SpotifyUserProfile {
    /// Premium is the only tier with playback capability.
    pub fn is_premium(&self) -> bool {
        self.product == Some(Product::Premium)
    }
}

/// Payload the popup's callback page posts back to the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthResultMessage {
    #[serde(rename_all = "camelCase")]
    Success {
        user_id: String,
        access_token: String,
        user_data: SpotifyUserProfile,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_in: Option<u64>,
    },
    Error {
        error: String,
    },
}

/// A message as it arrives on the bus: payload plus the origin the transport
/// attributed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub origin: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub user_id: String,
    pub access_token: String,
    pub user_data: SpotifyUserProfile,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(AuthSuccess),
    Failure { error: String },
}

/// Result shape handed to callers that render an inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
}

impl Default for PopupFeatures {
    fn default() -> Self {
        Self {
            width: 500,
            height: 700,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub success: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user_data: Option<SpotifyUserProfile>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub user_data: Option<SpotifyUserProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// What the backend token endpoint said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFetch {
    Token {
        access_token: String,
        user_data: Option<SpotifyUserProfile>,
    },
    NeedsLinking,
    Failed {
        status: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub access_token: String,
    pub user: SpotifyUserProfile,
    pub spotify_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedTokenRecord {
    pub user_id: String,
    pub spotify_user_id: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: i64,
    pub user_data: SpotifyUserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UmbrellaSession {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub identities: Vec<Identity>,
}

impl UmbrellaSession {
    pub fn has_spotify_identity(&self) -> bool {
        self.identities.iter().any(|i| i.provider == "spotify")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMethod {
    None,
    Primary,
    Linked,
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMethod::None => write!(f, "none"),
            AccessMethod::Primary => write!(f, "primary"),
            AccessMethod::Linked => write!(f, "linked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccess {
    pub access_method: AccessMethod,
    pub access_token: Option<String>,
    pub profile: Option<SpotifyUserProfile>,
}

impl ResolvedAccess {
    pub fn empty(access_method: AccessMethod) -> Self {
        Self {
            access_method,
            access_token: None,
            profile: None,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_premium())
    }

    pub fn is_usable(&self) -> bool {
        self.access_method != AccessMethod::None && self.access_token.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<SpotifyUserProfile>,
    pub access_token: Option<String>,
}

/// Notification sent after the persisted session changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn { spotify_user_id: String },
    SignedOut,
    Linked { user_id: String },
}

#[derive(Tabled)]
pub struct StatusTableRow {
    pub key: String,
    pub value: String,
}
