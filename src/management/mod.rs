//! File-backed state under the local data directory: the cached OAuth token
//! and the operator's triage decisions.

mod auth;
mod preferences;

pub use auth::TokenManager;
pub use preferences::{PreferenceManager, PreferenceStore};
