use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::{
    api, config,
    spotify::{AuthApi, BrowserOpener, MessageBus},
};

/// What the popup endpoints need to reach the waiting bridge.
#[derive(Clone)]
pub struct PopupChannel {
    pub bus: MessageBus,
    pub opener: BrowserOpener,
}

pub fn router<A: AuthApi>(backend: Arc<A>, channel: PopupChannel) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback::<A>))
        .route("/message", post(api::message))
        .route("/closed", post(api::closed))
        .layer(Extension(backend))
        .layer(Extension(channel))
}

pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app).await
}

pub async fn start_api_server(app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(config::server_addr()).await?;
    serve(listener, app).await
}
