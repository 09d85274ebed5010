//! # API Module
//!
//! HTTP endpoints served by the local Bandruption server to the popup's
//! callback page.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`callback`] - The OAuth redirect target. Redeems the authorization code
//!   through the backend (`POST <auth-base>/auth/callback`) and renders a page
//!   that reports the result back to the application.
//! - [`message`] - Cross-window message transport. The JSON body is published
//!   on the [`MessageBus`](crate::spotify::MessageBus) with the request's
//!   `Origin` header as its provenance; the bridge drops anything whose
//!   origin is not its own.
//! - [`closed`] - Beacon marking the popup as closed by the user.
//!
//! ### Monitoring
//!
//! - [`health`] - Status and version information.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use bandruption::server;
//!
//! let app = server::router(backend, channel);
//! server::start_api_server(app).await?;
//! ```

mod callback;
mod health;
mod message;

pub use callback::callback;
pub use health::health;
pub use message::closed;
pub use message::message;
