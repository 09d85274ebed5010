use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    AuthError,
    backend::AuthApi,
    bridge::PopupAuthBridge,
    window::WindowOpener,
};
use crate::{
    management::{KeyValueStore, SessionStore},
    types::{
        AccessMethod, AuthChange, AuthOutcome, AuthResult, AuthSuccess, LinkedTokenRecord,
        PersistedSession, ResolvedAccess, TokenFetch, UmbrellaSession,
    },
    warning,
};

/// Token lifetime assumed when the provider does not report one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Decides how a user reaches Spotify.
///
/// A Spotify entry in the umbrella identities wins over a linked record.
pub fn access_method(has_spotify_identity: bool, has_linked_record: bool) -> AccessMethod {
    match (has_spotify_identity, has_linked_record) {
        (true, _) => AccessMethod::Primary,
        (false, true) => AccessMethod::Linked,
        (false, false) => AccessMethod::None,
    }
}

/// Builds the record stored after a successful account link.
pub fn linked_record(user_id: &str, success: &AuthSuccess, now: DateTime<Utc>) -> LinkedTokenRecord {
    let lifetime = success.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    LinkedTokenRecord {
        user_id: user_id.to_string(),
        spotify_user_id: success.user_id.clone(),
        access_token: success.access_token.clone(),
        refresh_token: success.refresh_token.clone(),
        expires_at: now.timestamp() + lifetime as i64,
        user_data: success.user_data.clone(),
    }
}

/// Resolves Spotify access for an umbrella session.
///
/// Three paths lead to a Spotify token:
///
/// | Method | Condition | Token source |
/// |---|---|---|
/// | `None` | no Spotify identity, no linked record | - |
/// | `Primary` | umbrella identities contain `spotify` | `GET /tokens` |
/// | `Linked` | another provider plus a linked record | `GET /tokens` |
///
/// The method is recomputed on every call from the session passed in and
/// the linked record currently in storage; nothing is cached across a sign
/// in or sign out.
pub struct SpotifyAccessResolver<A, O, S> {
    bridge: Arc<PopupAuthBridge<A, O>>,
    store: Arc<SessionStore<S>>,
}

impl<A, O, S> SpotifyAccessResolver<A, O, S>
where
    A: AuthApi,
    O: WindowOpener,
    S: KeyValueStore,
{
    pub fn new(bridge: Arc<PopupAuthBridge<A, O>>, store: Arc<SessionStore<S>>) -> Self {
        Self { bridge, store }
    }

    pub async fn current_method(&self, session: Option<&UmbrellaSession>) -> AccessMethod {
        let Some(session) = session else {
            return AccessMethod::None;
        };
        let has_linked = self.has_linked_record(&session.user_id).await;
        access_method(session.has_spotify_identity(), has_linked)
    }

    /// Fetches the Spotify token and profile for the session.
    ///
    /// A `409` carrying `SPOTIFY_PRIMARY_AUTH_DETECTED` means a primary
    /// Spotify user still has to link; that and every other failure resolve
    /// without a token instead of erroring.
    pub async fn resolve(&self, session: Option<&UmbrellaSession>) -> ResolvedAccess {
        let method = self.current_method(session).await;
        let Some(session) = session else {
            return ResolvedAccess::empty(method);
        };

        match method {
            AccessMethod::None => ResolvedAccess::empty(method),
            AccessMethod::Primary | AccessMethod::Linked => {
                match self.bridge.api().spotify_token(&session.access_token).await {
                    Ok(TokenFetch::Token {
                        access_token,
                        user_data,
                    }) => ResolvedAccess {
                        access_method: method,
                        access_token: Some(access_token),
                        profile: user_data,
                    },
                    Ok(TokenFetch::NeedsLinking) => ResolvedAccess::empty(method),
                    Ok(TokenFetch::Failed { status }) => {
                        warning!("Spotify token endpoint returned status {}", status);
                        ResolvedAccess::empty(method)
                    }
                    Err(e) => {
                        warning!("Failed to fetch Spotify token: {}", e);
                        ResolvedAccess::empty(method)
                    }
                }
            }
        }
    }

    /// Makes sure the session can reach Spotify, linking an account if not.
    ///
    /// Only a timeout (or a broken message channel) is returned as `Err`.
    pub async fn ensure_access(&self, session: &UmbrellaSession) -> Result<AuthResult, AuthError> {
        if self.resolve(Some(session)).await.is_usable() {
            return Ok(AuthResult::ok());
        }

        let success = match self.bridge.login_with_popup().await {
            Ok(AuthOutcome::Success(success)) => success,
            Ok(AuthOutcome::Failure { error }) => return Ok(AuthResult::failed(error)),
            Err(e @ (AuthError::Timeout | AuthError::ChannelClosed)) => return Err(e),
            Err(e) => {
                if matches!(e, AuthError::Network(_)) {
                    warning!("Spotify account linking failed: {}", e);
                }
                return Ok(AuthResult::failed(e.to_string()));
            }
        };

        let record = linked_record(&session.user_id, &success, Utc::now());
        if let Err(e) = self
            .bridge
            .api()
            .store_linked_token(&session.access_token, &record)
            .await
        {
            warning!("Failed to store linked Spotify account: {}", e);
            return Ok(AuthResult::failed(e.to_string()));
        }

        match self.persist_link(&record).await {
            Ok(()) => Ok(AuthResult::ok()),
            Err(e) => {
                warning!("Failed to persist linked Spotify account: {}", e);
                Ok(AuthResult::failed(e.to_string()))
            }
        }
    }

    /// Drops the linked account and the Spotify session that came with it.
    pub async fn unlink(&self, session: &UmbrellaSession) -> Result<(), AuthError> {
        self.store.remove_linked_record(&session.user_id).await?;
        self.store.clear_session(AuthChange::SignedOut).await?.publish();
        Ok(())
    }

    async fn persist_link(&self, record: &LinkedTokenRecord) -> Result<(), AuthError> {
        self.store.save_linked_record(record).await?;

        let session = PersistedSession {
            access_token: record.access_token.clone(),
            user: record.user_data.clone(),
            spotify_user_id: record.spotify_user_id.clone(),
        };
        let change = AuthChange::Linked {
            user_id: record.user_id.clone(),
        };
        self.store.write_session(&session, change).await?.publish();
        Ok(())
    }

    async fn has_linked_record(&self, user_id: &str) -> bool {
        match self.store.linked_record(user_id).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warning!("Ignoring unreadable linked Spotify record: {}", e);
                false
            }
        }
    }
}
