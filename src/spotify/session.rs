use std::sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::broadcast;

use super::{
    AuthError,
    backend::AuthApi,
    bridge::PopupAuthBridge,
    window::WindowOpener,
};
use crate::{
    management::{KeyValueStore, SessionStore},
    types::{AuthChange, AuthOutcome, AuthResult, PersistedSession, SessionState},
    warning,
};

/// Durable Spotify session built on the popup bridge.
///
/// Holds the in-memory view (`is_authenticated`, user, access token) and
/// keeps it in step with the persisted tuple in [`SessionStore`]. Other parts
/// of the application learn about changes through [`subscribe`](Self::subscribe)
/// and re-read the store; nothing here shares state with them directly.
///
/// The session never looks at authorization codes. Only the popup's callback
/// page exchanges a code, and the session merely consumes the bridge's
/// result, so a single-use code cannot be redeemed twice.
pub struct SpotifyAuthSession<A, O, S> {
    bridge: Arc<PopupAuthBridge<A, O>>,
    store: Arc<SessionStore<S>>,
    state: RwLock<SessionState>,
    authenticating: AtomicUsize,
}

impl<A, O, S> SpotifyAuthSession<A, O, S>
where
    A: AuthApi,
    O: WindowOpener,
    S: KeyValueStore,
{
    pub fn new(bridge: Arc<PopupAuthBridge<A, O>>, store: Arc<SessionStore<S>>) -> Self {
        Self {
            bridge,
            store,
            state: RwLock::new(SessionState::default()),
            authenticating: AtomicUsize::new(0),
        }
    }

    /// Rehydrates the in-memory state from storage.
    ///
    /// Corrupted or half-written entries are removed and the session falls
    /// back to unauthenticated. Never fails.
    pub async fn initialize(&self) {
        let state = match self.store.read_session().await {
            Ok(Some(session)) => SessionState {
                is_authenticated: true,
                user: Some(session.user),
                access_token: Some(session.access_token),
            },
            Ok(None) => SessionState::default(),
            Err(e) => {
                warning!("Discarding persisted Spotify session: {}", e);
                if let Err(e) = self.store.discard_session().await {
                    warning!("Failed to clear persisted Spotify session: {}", e);
                }
                SessionState::default()
            }
        };
        self.set_state(state);
    }

    /// Signs in through the popup and persists the result.
    ///
    /// Returns `Err` only for a timeout or a broken message channel; every
    /// other failure (blocked popup, cancel, provider error, network, a newer
    /// attempt taking over) comes back as a failed [`AuthResult`] and leaves
    /// the session untouched.
    pub async fn login(&self) -> Result<AuthResult, AuthError> {
        let _authenticating = Authenticating::begin(&self.authenticating);

        let success = match self.bridge.login_with_popup().await {
            Ok(AuthOutcome::Success(success)) => success,
            Ok(AuthOutcome::Failure { error }) => return Ok(AuthResult::failed(error)),
            Err(e @ (AuthError::Timeout | AuthError::ChannelClosed)) => return Err(e),
            Err(e) => {
                if matches!(e, AuthError::Network(_)) {
                    warning!("Spotify login failed: {}", e);
                }
                return Ok(AuthResult::failed(e.to_string()));
            }
        };

        let session = PersistedSession {
            access_token: success.access_token,
            user: success.user_data,
            spotify_user_id: success.user_id,
        };
        let change = AuthChange::SignedIn {
            spotify_user_id: session.spotify_user_id.clone(),
        };

        let notice = match self.store.write_session(&session, change).await {
            Ok(notice) => notice,
            Err(e) => {
                warning!("Failed to persist Spotify session: {}", e);
                return Ok(AuthResult::failed(e.to_string()));
            }
        };
        self.set_state(SessionState {
            is_authenticated: true,
            user: Some(session.user),
            access_token: Some(session.access_token),
        });
        notice.publish();

        Ok(AuthResult::ok())
    }

    /// Forgets the session locally and on the server.
    ///
    /// Memory is cleared only once the persisted session is gone, so a failed
    /// storage write leaves the session signed in everywhere.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(user) = self.state().user {
            if let Err(e) = self.bridge.api().logout(&user.id).await {
                warning!("Failed to sign out of Spotify on the server: {}", e);
            }
        }

        let notice = self.store.clear_session(AuthChange::SignedOut).await?;
        self.set_state(SessionState::default());
        notice.publish();
        Ok(())
    }

    /// Re-reads the store on every change until the channel closes.
    pub async fn follow_changes(&self, mut changes: broadcast::Receiver<AuthChange>) {
        loop {
            match changes.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => self.initialize().await,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.store.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_authenticated
    }

    pub fn is_authenticating(&self) -> bool {
        self.authenticating.load(Ordering::SeqCst) > 0
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Counts an in-flight login for as long as it lives.
struct Authenticating<'a>(&'a AtomicUsize);

impl<'a> Authenticating<'a> {
    fn begin(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Authenticating<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
