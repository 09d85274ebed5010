use tokio::sync::broadcast;

use super::store::{KeyValueStore, StoreError};
use crate::types::{AuthChange, LinkedTokenRecord, PersistedSession, SpotifyUserProfile};

pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
pub const USER_KEY: &str = "spotify_user";
pub const CONNECTED_KEY: &str = "spotify_connected";
pub const USER_ID_KEY: &str = "spotify_user_id";
pub const LINKED_TOKEN_PREFIX: &str = "spotify_linked_token:";

const EVENT_CHANNEL_CAPACITY: usize = 32;

const SESSION_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, USER_KEY, CONNECTED_KEY, USER_ID_KEY];

/// Observable store for the persisted Spotify session.
///
/// This is the only writer of the session keys. Every write stores the whole
/// tuple in one `set_many` and every clear removes it in one `remove_many`.
/// Subscribers are notified only after the storage call returned, so a
/// subscriber that re-reads on notification sees the new tuple.
pub struct SessionStore<S> {
    store: S,
    events: broadcast::Sender<AuthChange>,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { store, events }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    /// Reads the persisted tuple. Absent means none of the four keys is
    /// set; any other mix of present and missing keys is corrupted.
    pub async fn read_session(&self) -> Result<Option<PersistedSession>, StoreError> {
        let token = self.store.get(ACCESS_TOKEN_KEY).await?;
        let user = self.store.get(USER_KEY).await?;
        let connected = self.store.get(CONNECTED_KEY).await?;
        let user_id = self.store.get(USER_ID_KEY).await?;

        let (access_token, user, connected, spotify_user_id) = match (token, user, connected, user_id)
        {
            (None, None, None, None) => return Ok(None),
            (Some(token), Some(user), Some(connected), Some(user_id)) => {
                (token, user, connected, user_id)
            }
            (token, user, connected, user_id) => {
                let missing: Vec<&str> = [
                    (ACCESS_TOKEN_KEY, token.is_none()),
                    (USER_KEY, user.is_none()),
                    (CONNECTED_KEY, connected.is_none()),
                    (USER_ID_KEY, user_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, missing)| missing.then_some(key))
                .collect();
                return Err(StoreError::Corrupted(format!(
                    "partial session, missing {}",
                    missing.join(", ")
                )));
            }
        };

        if connected != "true" {
            return Err(StoreError::Corrupted(format!(
                "unexpected connected flag {:?}",
                connected
            )));
        }

        let user: SpotifyUserProfile = serde_json::from_str(&user)
            .map_err(|e| StoreError::Corrupted(format!("profile is not valid JSON: {}", e)))?;

        Ok(Some(PersistedSession {
            access_token,
            user,
            spotify_user_id,
        }))
    }

    /// Writes the whole session tuple in one call.
    ///
    /// The returned notice publishes `change` when it is published or
    /// dropped, so callers can update their own view of the session between
    /// the write and the notification.
    pub async fn write_session(
        &self,
        session: &PersistedSession,
        change: AuthChange,
    ) -> Result<ChangeNotice<'_>, StoreError> {
        let user = serde_json::to_string(&session.user)?;
        self.store
            .set_many(vec![
                (ACCESS_TOKEN_KEY.to_string(), session.access_token.clone()),
                (USER_KEY.to_string(), user),
                (CONNECTED_KEY.to_string(), "true".to_string()),
                (USER_ID_KEY.to_string(), session.spotify_user_id.clone()),
            ])
            .await?;
        Ok(self.notice(change))
    }

    pub async fn clear_session(&self, change: AuthChange) -> Result<ChangeNotice<'_>, StoreError> {
        self.discard_session().await?;
        Ok(self.notice(change))
    }

    /// Removes the session tuple without telling anyone. Used when the
    /// stored data turned out to be unreadable.
    pub async fn discard_session(&self) -> Result<(), StoreError> {
        self.store
            .remove_many(SESSION_KEYS.iter().map(|k| k.to_string()).collect())
            .await
    }

    pub async fn linked_record(
        &self,
        user_id: &str,
    ) -> Result<Option<LinkedTokenRecord>, StoreError> {
        let Some(raw) = self.store.get(&linked_key(user_id)).await? else {
            return Ok(None);
        };

        let record: LinkedTokenRecord = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupted(format!("linked token record: {}", e)))?;
        if record.user_id != user_id {
            return Ok(None);
        }
        Ok(Some(record))
    }

    pub async fn save_linked_record(&self, record: &LinkedTokenRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        self.store
            .set_many(vec![(linked_key(&record.user_id), json)])
            .await
    }

    pub async fn remove_linked_record(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.remove_many(vec![linked_key(user_id)]).await
    }

    fn notice(&self, change: AuthChange) -> ChangeNotice<'_> {
        ChangeNotice {
            events: &self.events,
            change: Some(change),
        }
    }
}

/// A pending change notification, created only by a completed write.
#[must_use = "dropping the notice publishes it immediately"]
pub struct ChangeNotice<'a> {
    events: &'a broadcast::Sender<AuthChange>,
    change: Option<AuthChange>,
}

impl ChangeNotice<'_> {
    pub fn publish(self) {
        drop(self);
    }
}

impl Drop for ChangeNotice<'_> {
    fn drop(&mut self) {
        if let Some(change) = self.change.take() {
            // no subscribers is fine
            let _ = self.events.send(change);
        }
    }
}

fn linked_key(user_id: &str) -> String {
    format!("{}{}", LINKED_TOKEN_PREFIX, user_id)
}
