//! # CLI Module
//!
//! This module provides the command-line interface layer for Bandruption's
//! Spotify authentication. Each command wires the library's flows against the
//! real backend, the system browser and on-disk storage, and presents the
//! outcome.
//!
//! ## Command Categories
//!
//! ### Spotify Session
//!
//! - [`login`] - Signs in through the browser popup and stores the session
//! - [`logout`] - Forgets the Spotify session locally and on the server
//!
//! ### Access
//!
//! - [`status`] - Shows the Spotify session and the resolved access method
//! - [`token`] - Prints the Spotify access token for the application session
//! - [`link`] - Links a Spotify account when no access is available yet
//! - [`unlink`] - Removes a linked Spotify account
//!
//! ### Application Session
//!
//! - [`set_session`] - Stores the umbrella session the access commands use
//! - [`clear_session`] - Removes it
//!
//! ## Usage Patterns
//!
//! ```bash
//! bandruption session set --user-id u1 --token eyJ... --provider google
//! bandruption link
//! bandruption status
//! ```

mod access;
mod auth;
mod context;
mod session;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use access::link;
pub use access::status;
pub use access::token;
pub use access::unlink;
pub use auth::login;
pub use auth::logout;
pub use session::clear_session;
pub use session::set_session;

fn waiting_spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
