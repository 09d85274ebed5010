mod common;

use std::{sync::Arc, time::Duration};

use bandruption::{
    management::{
        ACCESS_TOKEN_KEY, CONNECTED_KEY, FileStore, KeyValueStore, MemoryStore, SessionStore,
        USER_ID_KEY, USER_KEY,
    },
    spotify::{AuthError, SpotifyAuthSession},
    types::{AuthChange, AuthResult, PersistedSession, Product},
};
use common::*;
use serde_json::{Value, json};
use tokio::{sync::broadcast::error::TryRecvError, time::sleep};

struct Fixture {
    bridge: Arc<TestBridge>,
    store: Arc<SessionStore<MemoryStore>>,
    session: TestSession,
    opener: FakeOpener,
    api: Arc<FakeApi>,
}

fn fixture(api: FakeApi, opener: FakeOpener, memory: MemoryStore) -> Fixture {
    let api = Arc::new(api);
    let bridge = bridge(Arc::clone(&api), opener.clone());
    let store = store(memory);
    let session = SpotifyAuthSession::new(Arc::clone(&bridge), Arc::clone(&store));
    Fixture {
        bridge,
        store,
        session,
        opener,
        api,
    }
}

fn persisted_entries() -> MemoryStore {
    let user = serde_json::to_string(&profile("u1", Some(Product::Premium))).unwrap();
    MemoryStore::with_entries([
        (ACCESS_TOKEN_KEY, "tok".to_string()),
        (USER_KEY, user),
        (CONNECTED_KEY, "true".to_string()),
        (USER_ID_KEY, "u1".to_string()),
    ])
}

#[tokio::test]
async fn test_initialize_rehydrates_persisted_session() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), persisted_entries());

    f.session.initialize().await;

    let state = f.session.state();
    assert!(state.is_authenticated);
    assert_eq!(state.access_token.as_deref(), Some("tok"));
    assert_eq!(state.user, Some(profile("u1", Some(Product::Premium))));
}

#[tokio::test]
async fn test_initialize_discards_corrupted_profile() {
    let memory = MemoryStore::with_entries([
        (ACCESS_TOKEN_KEY, "tok"),
        (USER_KEY, "{not json"),
        (CONNECTED_KEY, "true"),
    ]);
    let f = fixture(FakeApi::new(), FakeOpener::default(), memory);

    f.session.initialize().await;

    assert!(!f.session.is_authenticated());
    assert_eq!(f.store.backend().get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(f.store.backend().get(USER_KEY).await.unwrap(), None);
    assert_eq!(f.store.backend().get(CONNECTED_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_initialize_discards_token_without_profile() {
    let memory = MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "tok")]);
    let f = fixture(FakeApi::new(), FakeOpener::default(), memory);

    f.session.initialize().await;

    assert!(!f.session.is_authenticated());
    assert!(f.store.backend().snapshot().is_empty());
}

#[tokio::test]
async fn test_initialize_without_data_is_unauthenticated() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), MemoryStore::new());

    f.session.initialize().await;

    assert!(!f.session.is_authenticated());
    assert_eq!(f.store.backend().write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_login_persists_exact_result() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), MemoryStore::new());
    let mut changes = f.session.subscribe();
    let mut message = success_message("u1", "tok", "premium");
    message["userData"]["followers"] = json!({ "href": null, "total": 3 });

    let driver = async {
        wait_for_windows(&f.opener, 1).await;
        assert!(f.session.is_authenticating());
        f.bridge.bus().post(ORIGIN, message.clone());
    };
    let (result, ()) = tokio::join!(f.session.login(), driver);

    assert_eq!(result.expect("login resolves"), AuthResult::ok());
    assert!(!f.session.is_authenticating());

    let stored = f.store.backend().snapshot();
    assert_eq!(stored[ACCESS_TOKEN_KEY], "tok");
    assert_eq!(stored[CONNECTED_KEY], "true");
    assert_eq!(stored[USER_ID_KEY], "u1");
    let user: Value = serde_json::from_str(&stored[USER_KEY]).unwrap();
    assert_eq!(user, message["userData"]);
    // the whole tuple went out in one write
    assert_eq!(f.store.backend().write_count(), 1);

    let state = f.session.state();
    assert!(state.is_authenticated);
    assert_eq!(state.access_token.as_deref(), Some("tok"));
    assert_eq!(
        changes.try_recv().unwrap(),
        AuthChange::SignedIn {
            spotify_user_id: "u1".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_login_failure_leaves_state_untouched() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), MemoryStore::new());
    let mut changes = f.session.subscribe();

    let driver = async {
        wait_for_windows(&f.opener, 1).await;
        f.bridge.bus().post(ORIGIN, error_message("access_denied"));
    };
    let (result, ()) = tokio::join!(f.session.login(), driver);

    assert_eq!(
        result.expect("provider error is a value"),
        AuthResult::failed("access_denied")
    );
    assert!(!f.session.is_authenticated());
    assert!(!f.session.is_authenticating());
    assert!(f.store.backend().snapshot().is_empty());
    assert_eq!(changes.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_login_blocked_popup_is_failure_value() {
    let f = fixture(FakeApi::new(), FakeOpener::blocked(), MemoryStore::new());

    let result = f.session.login().await.expect("blocked is a value");

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Popup blocked"));
    assert!(!f.session.is_authenticating());
}

#[tokio::test(start_paused = true)]
async fn test_login_network_error_is_failure_value() {
    let f = fixture(FakeApi::unreachable(), FakeOpener::default(), MemoryStore::new());

    let result = f.session.login().await.expect("network failure is a value");

    assert!(!result.success);
    assert!(result.error.unwrap().contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_login_timeout_propagates() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), MemoryStore::new());

    let result = f.session.login().await;

    assert!(matches!(result, Err(AuthError::Timeout)));
    assert!(!f.session.is_authenticating());
    assert!(f.store.backend().snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_everything() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), persisted_entries());
    f.session.initialize().await;
    let mut changes = f.session.subscribe();

    f.session.logout().await.expect("logout succeeds");

    assert!(!f.session.is_authenticated());
    assert_eq!(f.session.state().user, None);
    assert!(f.store.backend().snapshot().is_empty());
    assert_eq!(*f.api.logouts.lock().unwrap(), vec!["u1".to_string()]);
    assert_eq!(changes.try_recv().unwrap(), AuthChange::SignedOut);
}

#[tokio::test]
async fn test_failed_logout_keeps_session() {
    let dir = std::env::temp_dir().join(format!("bandruption-logout-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("storage.json");

    let api = Arc::new(FakeApi::new());
    let bridge = bridge(Arc::clone(&api), FakeOpener::default());
    let store = Arc::new(SessionStore::new(FileStore::new(&path)));
    store
        .write_session(
            &PersistedSession {
                access_token: "tok".to_string(),
                user: profile("u1", Some(Product::Premium)),
                spotify_user_id: "u1".to_string(),
            },
            AuthChange::SignedIn {
                spotify_user_id: "u1".to_string(),
            },
        )
        .await
        .unwrap()
        .publish();
    let session = SpotifyAuthSession::new(bridge, Arc::clone(&store));
    session.initialize().await;
    assert!(session.is_authenticated());

    // storage becomes unwritable
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    let mut changes = session.subscribe();

    let result = session.logout().await;

    assert!(matches!(result, Err(AuthError::Store(_))));
    assert!(session.is_authenticated());
    assert_eq!(session.state().access_token.as_deref(), Some("tok"));
    assert_eq!(changes.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_independent_session_follows_changes() {
    let f = fixture(FakeApi::new(), FakeOpener::default(), MemoryStore::new());
    let follower = Arc::new(SpotifyAuthSession::new(
        Arc::clone(&f.bridge),
        Arc::clone(&f.store),
    ));
    let changes = follower.subscribe();
    let handle = tokio::spawn({
        let follower = Arc::clone(&follower);
        async move { follower.follow_changes(changes).await }
    });

    let driver = async {
        wait_for_windows(&f.opener, 1).await;
        f.bridge
            .bus()
            .post(ORIGIN, success_message("u1", "tok", "free"));
    };
    let (result, ()) = tokio::join!(f.session.login(), driver);
    assert!(result.unwrap().success);

    while !follower.is_authenticated() {
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(follower.state().access_token.as_deref(), Some("tok"));

    handle.abort();
}
