//! Bandruption Auth Bridge Library
//!
//! This library drives the Spotify side of Bandruption's authentication: a
//! popup-based OAuth handshake, a durable Spotify session that independent
//! parts of the application observe, and the resolver that decides whether a
//! user reaches Spotify through their primary identity, a linked account, or
//! not at all.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints served to the popup's callback page
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `management` - Durable storage and the observable session store
//! - `server` - Local HTTP server hosting the callback endpoints
//! - `spotify` - Popup bridge, session, access resolver and backend client
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use bandruption::{config, cli};
//!
//! #[tokio::main]
//! async fn main() {
//!     if let Err(e) = config::load_env().await {
//!         bandruption::error!("Cannot load environment. Err: {}", e);
//!     }
//!     cli::status().await;
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Opening Spotify authorization...");
/// info!("Resolved access method: {}", method);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Connected to Spotify as {}", user.id);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only command implementations use this macro. Library code reports
/// recoverable failures with [`warning!`] and returns a value instead.
///
/// # Example
///
/// ```
/// error!("Failed to load umbrella session: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues: failed token lookups, backend calls that
/// could not be completed, corrupted persisted state that was discarded.
///
/// # Example
///
/// ```
/// warning!("Token endpoint returned {}", status);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
