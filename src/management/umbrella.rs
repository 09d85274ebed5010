use std::path::PathBuf;

use crate::{config, types::UmbrellaSession};

/// Persists the umbrella application session the Spotify flows run under.
pub struct UmbrellaSessionManager {
    session: UmbrellaSession,
}

impl UmbrellaSessionManager {
    pub fn new(session: UmbrellaSession) -> Self {
        UmbrellaSessionManager { session }
    }

    pub async fn load() -> Result<Self, String> {
        let path = Self::session_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        let session: UmbrellaSession = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { session })
    }

    pub async fn persist(&self) -> Result<(), String> {
        let path = Self::session_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.session).map_err(|e| e.to_string())?;
        async_fs::write(&path, json)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn clear() -> Result<(), String> {
        match async_fs::remove_file(Self::session_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn session(&self) -> &UmbrellaSession {
        &self.session
    }

    fn session_path() -> PathBuf {
        config::data_dir().join("session.json")
    }
}
