//! Configuration management for the Bandruption auth bridge.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage the backend
//! endpoints, the local callback server address, the application origin used to
//! validate popup messages, and the popup timing parameters.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf, time::Duration};

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from `bandruption/.env` inside the platform-specific
/// local data directory. A missing file is not an error; every setting has a
/// default.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/bandruption/.env`
/// - macOS: `~/Library/Application Support/bandruption/.env`
/// - Windows: `%LOCALAPPDATA%/bandruption/.env`
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Returns the directory holding the persisted storage and umbrella session.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("bandruption");
    path
}

/// Returns the address the local callback server binds to.
///
/// # Example
///
/// ```
/// let addr = server_addr(); // e.g., "127.0.0.1:8888"
/// ```
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8888".to_string())
}

/// Returns this application's own origin.
///
/// Popup messages are accepted only when their origin equals this value
/// exactly. Defaults to `http://<SERVER_ADDRESS>`.
pub fn app_origin() -> String {
    env::var("BANDRUPTION_APP_ORIGIN").unwrap_or_else(|_| format!("http://{}", server_addr()))
}

/// Returns the base URL of the auth service (`/auth/login`, `/auth/callback`).
///
/// # Example
///
/// ```
/// let base = auth_base_url(); // e.g., "http://localhost:3001"
/// ```
pub fn auth_base_url() -> String {
    env::var("BANDRUPTION_AUTH_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Returns the base URL of the application API (`/tokens`).
pub fn api_base_url() -> String {
    env::var("BANDRUPTION_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001/api".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Returns the absolute time a popup attempt may stay open.
pub fn popup_timeout() -> Duration {
    let secs = env::var("BANDRUPTION_POPUP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(300);
    Duration::from_secs(secs)
}

/// Returns how often the popup's closed state is polled.
pub fn popup_poll_interval() -> Duration {
    let millis = env::var("BANDRUPTION_POPUP_POLL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(1000);
    Duration::from_millis(millis)
}
