//! Configuration management for the Spotify Shuffle CLI.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, the target playlist, server
//! settings and engine tuning knobs.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf};

use crate::{Res, engine::PageFailurePolicy};

/// Retry attempts per remote call before giving up on a rate limit.
pub const MAX_ATTEMPTS: u32 = 10;

/// Maximum number of tracks per playlist write call.
pub const WRITE_CHUNK_SIZE: usize = 100;

/// Tracks kept per followed artist after sorting by popularity.
pub const TOP_TRACKS_PER_ARTIST: usize = 25;

/// Page size for library, artist and album endpoints.
pub const LIBRARY_PAGE_SIZE: u32 = 50;

/// Page size for playlist item listings.
pub const PLAYLIST_PAGE_SIZE: u32 = 100;

/// Maximum ids per "get several tracks" request.
pub const TRACK_DETAIL_BATCH_SIZE: usize = 50;

/// Default cap on concurrently in-flight requests per fan-out point.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SCOPE: &str = "playlist-read-private playlist-read-collaborative playlist-modify-private playlist-modify-public user-library-read user-follow-read ugc-image-upload";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist. A missing
/// `.env` file is fine: every variable can also come from the process
/// environment.
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/shufflecli/.env`
/// - macOS: `~/Library/Application Support/shufflecli/.env`
/// - Windows: `%LOCALAPPDATA%/shufflecli/.env`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or if the `.env`
/// file exists but cannot be parsed.
pub async fn load_env() -> Res<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path)?;
    }
    Ok(())
}

/// Root of everything this application stores locally.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("shufflecli");
    path
}

fn required(name: &str) -> Res<String> {
    env::var(name).map_err(|_| format!("{} must be set", name).into())
}

fn or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Returns the server address for the local OAuth callback server.
pub fn server_addr() -> String {
    or_default("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Returns the Spotify API client ID for authentication.
///
/// # Errors
///
/// Fails if `SPOTIFY_API_AUTH_CLIENT_ID` is not set.
pub fn spotify_client_id() -> Res<String> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the id of the playlist that is rebuilt on every run.
///
/// Accepts a bare id, a `spotify:playlist:` URI or an open.spotify.com link.
///
/// # Errors
///
/// Fails if `SHUFFLE_PLAYLIST_ID` is not set.
pub fn shuffle_playlist_id() -> Res<String> {
    let raw = required("SHUFFLE_PLAYLIST_ID")?;
    Ok(crate::utils::normalize_playlist_id(&raw))
}

/// Returns the Spotify OAuth redirect URI.
///
/// Must match the redirect URI registered in the Spotify application settings.
pub fn spotify_redirect_uri() -> String {
    or_default("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Returns the Spotify API scope permissions.
pub fn spotify_scope() -> String {
    or_default("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

/// Returns the Spotify OAuth authorization URL.
pub fn spotify_apiauth_url() -> String {
    or_default("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

/// Returns the Spotify Web API base URL.
pub fn spotify_apiurl() -> String {
    or_default("SPOTIFY_API_URL", DEFAULT_API_URL)
}

/// Returns the Spotify OAuth token exchange URL.
pub fn spotify_apitoken_url() -> String {
    or_default("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Optional JPEG uploaded as the shuffle playlist cover after each run.
pub fn cover_image_path() -> Option<PathBuf> {
    env::var("SHUFFLE_COVER_IMAGE")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// Where triage decisions are stored.
pub fn preferences_path() -> PathBuf {
    env::var("SHUFFLE_PREFERENCES_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("preferences.json"))
}

/// Cap on concurrent requests per fan-out. Falls back to the default on
/// missing, zero or unparsable values.
pub fn max_in_flight() -> usize {
    env::var("SHUFFLE_MAX_IN_FLIGHT")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_IN_FLIGHT)
}

/// Whether a failed page aborts the whole fetch instead of being dropped.
pub fn page_failure_policy() -> PageFailurePolicy {
    match env::var("SHUFFLE_STRICT_PAGES") {
        Ok(v) if matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes") => {
            PageFailurePolicy::Abort
        }
        _ => PageFailurePolicy::Skip,
    }
}
