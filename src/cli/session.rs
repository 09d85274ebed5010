use crate::{
    error,
    management::UmbrellaSessionManager,
    success,
    types::{Identity, UmbrellaSession},
};

pub async fn set_session(user_id: String, access_token: String, providers: Vec<String>) {
    let session = UmbrellaSession {
        user_id,
        access_token,
        identities: providers
            .into_iter()
            .map(|provider| Identity { provider })
            .collect(),
    };

    if let Err(e) = UmbrellaSessionManager::new(session).persist().await {
        error!("Failed to save application session: {}", e);
    }
    success!("Application session saved.");
}

pub async fn clear_session() {
    if let Err(e) = UmbrellaSessionManager::clear().await {
        error!("Failed to remove application session: {}", e);
    }
    success!("Application session removed.");
}
