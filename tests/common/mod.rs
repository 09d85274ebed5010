#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use bandruption::{
    management::{MemoryStore, SessionStore},
    spotify::{
        AuthApi, AuthError, BridgeConfig, MessageBus, PopupAuthBridge, PopupWindow,
        SpotifyAccessResolver, SpotifyAuthSession, WindowOpener,
    },
    types::{
        AuthorizationRequest, CallbackResponse, Identity, LinkedTokenRecord, PopupFeatures,
        Product, SpotifyUserProfile, TokenFetch, UmbrellaSession,
    },
};
use serde_json::{Value, json};

pub const ORIGIN: &str = "http://127.0.0.1:8888";
pub const AUTH_URL: &str = "https://provider/auth?client=x";

pub struct FakeApi {
    pub auth_url: Mutex<Option<String>>,
    pub token: Mutex<Result<TokenFetch, String>>,
    pub callback: Mutex<CallbackResponse>,
    pub exchanges: Mutex<Vec<(String, String)>>,
    pub stored_links: Mutex<Vec<(String, LinkedTokenRecord)>>,
    pub fail_link: AtomicBool,
    pub logouts: Mutex<Vec<String>>,
    pub token_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            auth_url: Mutex::new(Some(AUTH_URL.to_string())),
            token: Mutex::new(Ok(TokenFetch::Token {
                access_token: "spotify-token".to_string(),
                user_data: Some(profile("u1", Some(Product::Premium))),
            })),
            callback: Mutex::new(CallbackResponse::default()),
            exchanges: Mutex::new(Vec::new()),
            stored_links: Mutex::new(Vec::new()),
            fail_link: AtomicBool::new(false),
            logouts: Mutex::new(Vec::new()),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let api = Self::new();
        *api.auth_url.lock().unwrap() = None;
        api
    }

    pub fn set_token(&self, token: Result<TokenFetch, String>) {
        *self.token.lock().unwrap() = token;
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

impl AuthApi for FakeApi {
    async fn authorization_request(&self) -> Result<AuthorizationRequest, AuthError> {
        match self.auth_url.lock().unwrap().clone() {
            Some(auth_url) => Ok(AuthorizationRequest { auth_url }),
            None => Err(AuthError::Network("connection refused".to_string())),
        }
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<CallbackResponse, AuthError> {
        self.exchanges
            .lock()
            .unwrap()
            .push((code.to_string(), state.to_string()));
        Ok(self.callback.lock().unwrap().clone())
    }

    async fn spotify_token(&self, _bearer: &str) -> Result<TokenFetch, AuthError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.token
            .lock()
            .unwrap()
            .clone()
            .map_err(AuthError::Network)
    }

    async fn store_linked_token(
        &self,
        bearer: &str,
        record: &LinkedTokenRecord,
    ) -> Result<(), AuthError> {
        if self.fail_link.load(Ordering::SeqCst) {
            return Err(AuthError::Network("link endpoint unavailable".to_string()));
        }
        self.stored_links
            .lock()
            .unwrap()
            .push((bearer.to_string(), record.clone()));
        Ok(())
    }

    async fn logout(&self, spotify_user_id: &str) -> Result<(), AuthError> {
        self.logouts
            .lock()
            .unwrap()
            .push(spotify_user_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct WindowState {
    url: String,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeWindow {
    state: Arc<WindowState>,
}

impl FakeWindow {
    pub fn url(&self) -> String {
        self.state.url.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    /// The user closing the popup, as opposed to the bridge closing it.
    pub fn close_by_user(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

impl PopupWindow for FakeWindow {
    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct OpenerState {
    blocked: AtomicBool,
    windows: Mutex<Vec<FakeWindow>>,
    features: Mutex<Vec<PopupFeatures>>,
    previous_closed_at_open: Mutex<Vec<bool>>,
}

#[derive(Clone, Default)]
pub struct FakeOpener {
    state: Arc<OpenerState>,
}

impl FakeOpener {
    pub fn blocked() -> Self {
        let opener = Self::default();
        opener.state.blocked.store(true, Ordering::SeqCst);
        opener
    }

    pub fn window_count(&self) -> usize {
        self.state.windows.lock().unwrap().len()
    }

    pub fn window(&self, index: usize) -> FakeWindow {
        self.state.windows.lock().unwrap()[index].clone()
    }

    pub fn features(&self) -> Vec<PopupFeatures> {
        self.state.features.lock().unwrap().clone()
    }

    /// For each open: were all earlier popups already closed at that moment.
    pub fn previous_closed_at_open(&self) -> Vec<bool> {
        self.state.previous_closed_at_open.lock().unwrap().clone()
    }
}

impl WindowOpener for FakeOpener {
    fn open(&self, url: &str, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>> {
        if self.state.blocked.load(Ordering::SeqCst) {
            return None;
        }

        let mut windows = self.state.windows.lock().unwrap();
        let all_closed = windows.iter().all(|w| w.is_closed());
        self.state
            .previous_closed_at_open
            .lock()
            .unwrap()
            .push(all_closed);
        self.state.features.lock().unwrap().push(*features);

        let window = FakeWindow {
            state: Arc::new(WindowState {
                url: url.to_string(),
                ..Default::default()
            }),
        };
        windows.push(window.clone());
        Some(Box::new(window))
    }
}

pub type TestBridge = PopupAuthBridge<FakeApi, FakeOpener>;
pub type TestSession = SpotifyAuthSession<FakeApi, FakeOpener, MemoryStore>;
pub type TestResolver = SpotifyAccessResolver<FakeApi, FakeOpener, MemoryStore>;

pub fn bridge(api: Arc<FakeApi>, opener: FakeOpener) -> Arc<TestBridge> {
    Arc::new(PopupAuthBridge::new(
        api,
        opener,
        MessageBus::new(),
        BridgeConfig::new(ORIGIN),
    ))
}

pub fn store(memory: MemoryStore) -> Arc<SessionStore<MemoryStore>> {
    Arc::new(SessionStore::new(memory))
}

pub fn profile(id: &str, product: Option<Product>) -> SpotifyUserProfile {
    SpotifyUserProfile {
        id: id.to_string(),
        display_name: Some(format!("{} display", id)),
        email: None,
        images: Vec::new(),
        country: Some("NL".to_string()),
        product,
        extra: Default::default(),
    }
}

pub fn success_message(user_id: &str, token: &str, product: &str) -> Value {
    json!({
        "type": "success",
        "userId": user_id,
        "accessToken": token,
        "userData": { "id": user_id, "product": product }
    })
}

pub fn error_message(error: &str) -> Value {
    json!({ "type": "error", "error": error })
}

pub fn umbrella(user_id: &str, providers: &[&str]) -> UmbrellaSession {
    UmbrellaSession {
        user_id: user_id.to_string(),
        access_token: format!("{}-bearer", user_id),
        identities: providers
            .iter()
            .map(|p| Identity {
                provider: p.to_string(),
            })
            .collect(),
    }
}

/// Waits until the opener has handed out `count` popups.
pub async fn wait_for_windows(opener: &FakeOpener, count: usize) {
    while opener.window_count() < count {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
