//! # CLI Module
//!
//! User-facing commands. Each one wires configuration, the token cache and
//! the file-backed stores to the library and reports the outcome with the
//! crate's output macros. Fatal outcomes end the process through `error!`;
//! everything below this layer returns errors instead.
//!
//! ## Commands
//!
//! - [`auth`] - OAuth 2.0 PKCE authorization; caches the token locally.
//! - [`shuffle`] - One shuffle run: triage new playlists and artists,
//!   collect tracks from every enabled source, shuffle and rewrite the
//!   shuffle playlist. See [`crate::orchestrator`].
//! - [`preferences`] - Lists stored triage decisions.
//! - [`reset_preferences`] - Forgets them so the next run asks again.
//!
//! ## Usage
//!
//! ```bash
//! shufflecli auth                          # once
//! shufflecli shuffle                       # every time you want a fresh order
//! shufflecli shuffle --skip-artists --dry-run
//! shufflecli preferences --playlists
//! shufflecli preferences reset --artists
//! ```

mod auth;
mod preferences;
mod shuffle;

pub use auth::auth;
pub use preferences::{preferences, reset_preferences};
pub use shuffle::{ShuffleSettings, shuffle};
