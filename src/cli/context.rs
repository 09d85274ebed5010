use std::sync::Arc;

use crate::{
    management::{FileStore, SessionStore, UmbrellaSessionManager},
    server::{self, PopupChannel},
    spotify::{
        BridgeConfig, BrowserOpener, HttpBackend, MessageBus, PopupAuthBridge,
        SpotifyAccessResolver, SpotifyAuthSession,
    },
    types::UmbrellaSession,
    warning,
};

/// Everything a command needs, wired against the real backend, browser and
/// on-disk storage.
pub(crate) struct Context {
    pub backend: Arc<HttpBackend>,
    pub channel: PopupChannel,
    pub session: SpotifyAuthSession<HttpBackend, BrowserOpener, FileStore>,
    pub resolver: SpotifyAccessResolver<HttpBackend, BrowserOpener, FileStore>,
}

impl Context {
    pub async fn from_env() -> Self {
        let backend = Arc::new(HttpBackend::from_env());
        let channel = PopupChannel {
            bus: MessageBus::new(),
            opener: BrowserOpener::new(),
        };
        let bridge = Arc::new(PopupAuthBridge::new(
            Arc::clone(&backend),
            channel.opener.clone(),
            channel.bus.clone(),
            BridgeConfig::from_env(),
        ));
        let store = Arc::new(SessionStore::new(FileStore::default_location()));

        let session = SpotifyAuthSession::new(Arc::clone(&bridge), Arc::clone(&store));
        session.initialize().await;
        let resolver = SpotifyAccessResolver::new(bridge, store);

        Self {
            backend,
            channel,
            session,
            resolver,
        }
    }

    /// Starts the callback server the popup reports back to.
    pub fn spawn_callback_server(&self) {
        let app = server::router(Arc::clone(&self.backend), self.channel.clone());
        tokio::spawn(async move {
            if let Err(e) = server::start_api_server(app).await {
                warning!("Callback server stopped: {}", e);
            }
        });
    }
}

pub(crate) async fn load_umbrella() -> Option<UmbrellaSession> {
    UmbrellaSessionManager::load()
        .await
        .ok()
        .map(|m| m.session().clone())
}
