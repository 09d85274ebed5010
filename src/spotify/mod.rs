//! # Spotify Authentication Module
//!
//! This module implements the Spotify side of Bandruption's authentication:
//! a popup-based OAuth handshake, the durable session built on top of it, and
//! the resolver that decides which of three paths gives a user Spotify access.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI)
//!          ↓
//! SpotifyAuthSession          SpotifyAccessResolver
//!   login / logout              resolve / ensure_access
//!          ↘                   ↙
//!           PopupAuthBridge
//!     ├── AuthApi (backend endpoints)
//!     ├── WindowOpener / PopupWindow
//!     └── MessageBus (origin-checked messages)
//!          ↓
//! SessionStore (persisted tuple + change notifications)
//! ```
//!
//! ## Core Modules
//!
//! ### Popup Bridge
//!
//! [`bridge`] - Drives one handshake at a time through the phases
//! `Idle → AwaitingAuthUrl → PopupOpen → Settled`:
//! - **Authorization URL**: fetched from `GET <auth-base>/auth/login`
//! - **Popup**: opened at a fixed 500x700 size; no handle means blocked
//! - **Messages**: only exact-origin, well-formed results are accepted
//! - **Cancellation**: a closed popup resolves as "Authentication cancelled"
//! - **Timeout**: five minutes by default, configurable through the environment
//! - **Supersession**: a new attempt ends the pending one before opening
//!
//! ### Session
//!
//! [`session`] - Turns a successful handshake into durable state:
//! - **Rehydration**: restores the session at startup, discarding corrupt data
//! - **Atomic Writes**: token, profile, connected flag and user id together
//! - **Write Then Notify**: subscribers hear about a change after it is stored
//!
//! ### Access Resolution
//!
//! [`access`] - Chooses between primary, linked and no Spotify access:
//! - **Primary Wins**: a Spotify identity takes precedence over a linked record
//! - **Needs Linking**: `409 SPOTIFY_PRIMARY_AUTH_DETECTED` resolves empty
//! - **Linking**: runs the popup and stores a linked-token record
//!
//! ## Error Handling Philosophy
//!
//! Expected outcomes are values. Cancel, blocked, provider errors, needs
//! linking and network failures all come back as a failed
//! [`AuthResult`](crate::types::AuthResult) so callers can branch on
//! `success`. Only a timeout (and a broken message channel, which indicates a
//! programming error) is returned as [`AuthError`].
//!
//! ## Concurrency
//!
//! All flows are async and cooperate on one runtime. The bridge owns at most
//! one popup and one listener at any time; the store serializes writes and
//! publishes each change after its write completed.

pub mod access;
pub mod backend;
pub mod bridge;
pub mod session;
pub mod window;

mod error;

pub use access::SpotifyAccessResolver;
pub use backend::{AuthApi, HttpBackend};
pub use bridge::{BridgeConfig, BridgePhase, PopupAuthBridge};
pub use error::AuthError;
pub use session::SpotifyAuthSession;
pub use window::{BrowserOpener, MessageBus, PopupWindow, WindowOpener};
