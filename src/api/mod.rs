//! # API Module
//!
//! HTTP endpoints of the short-lived local server that runs during
//! `shufflecli auth`.
//!
//! ## Endpoints
//!
//! - [`callback`] - Spotify redirects here after the user granted access. The
//!   handler exchanges the authorization code, together with the PKCE
//!   verifier held in shared state, for an access token and stores it for
//!   [`crate::spotify::auth::auth`] to pick up.
//! - [`health`] - Reports service name, version and whether a token has
//!   been obtained yet.
//!
//! Both are plain axum handlers; routing lives in [`crate::server`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
