//! # Spotify Integration Module
//!
//! This module is the integration layer between the shuffle engine and
//! Spotify's Web API: the OAuth 2.0 PKCE flow and an HTTP client that maps
//! every endpoint the engine needs onto the [`Catalog`] trait.
//!
//! ## Architecture
//!
//! ```text
//! Engine / Sources / Orchestrator
//!          ↓
//!     Catalog trait
//!          ↓
//!     SpotifyClient (reqwest, JSON)
//!          ↓
//!     Spotify Web API
//! ```
//!
//! The engine never sees HTTP. It only knows the [`Catalog`] surface, which
//! reports rate limiting as [`RemoteError::RateLimited`] carrying the
//! server-provided delay; retrying is the engine's job, not the client's.
//!
//! ## API Coverage
//!
//! - `GET /playlists/{id}` - track total of a playlist
//! - `GET /playlists/{id}/tracks` - playlist items (offset pagination)
//! - `PUT /playlists/{id}/tracks` - replace playlist items
//! - `POST /playlists/{id}/tracks` - append up to 100 items
//! - `PUT /playlists/{id}/images` - upload a JPEG cover
//! - `GET /me/playlists` - the user's playlists
//! - `GET /me/tracks` - liked songs
//! - `GET /me/albums` - saved albums
//! - `GET /me/following` - followed artists (cursor pagination)
//! - `GET /artists/{id}/albums` - albums and singles of an artist
//! - `GET /albums/{id}/tracks` - tracks of an album
//! - `GET /tracks` - up to 50 full tracks, for popularity
//!
//! ## Authentication
//!
//! [`auth`] implements OAuth 2.0 with PKCE: a random verifier, its SHA256
//! challenge, a local callback server and the code exchange. The resulting
//! token is cached by [`crate::management::TokenManager`], which refreshes it
//! before a run starts.

pub mod auth;
mod client;

use async_trait::async_trait;

pub use client::SpotifyClient;

use crate::{
    error::RemoteError,
    types::{AlbumRef, ItemRef, Page, RemoteEntity, TrackDetail},
};

/// The remote catalog as seen by the engine.
///
/// Implementations perform exactly one request per call and never retry.
/// Offset-paginated listings return `total`; cursor-paginated listings
/// return `next`, which is passed back verbatim as `cursor`.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Number of tracks in a playlist.
    async fn playlist_total(&self, playlist_id: &str) -> Result<u32, RemoteError>;

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError>;

    /// Playlists owned or followed by the current user.
    async fn current_user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError>;

    /// Liked songs.
    async fn saved_tracks(&self, offset: u32, limit: u32) -> Result<Page<ItemRef>, RemoteError>;

    async fn saved_albums(&self, offset: u32, limit: u32) -> Result<Page<AlbumRef>, RemoteError>;

    async fn followed_artists(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError>;

    /// Albums and singles credited to an artist.
    async fn artist_albums(
        &self,
        artist_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<AlbumRef>, RemoteError>;

    async fn album_tracks(
        &self,
        album_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError>;

    /// Full track objects for at most 50 tracks. Unknown ids are left out.
    async fn tracks(&self, items: &[ItemRef]) -> Result<Vec<TrackDetail>, RemoteError>;

    /// Replaces the whole playlist with `items` (at most 100).
    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError>;

    /// Appends `items` (at most 100) to the playlist.
    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError>;

    /// Uploads a base64 encoded JPEG as playlist cover.
    async fn upload_playlist_cover(
        &self,
        playlist_id: &str,
        jpeg_base64: &str,
    ) -> Result<(), RemoteError>;
}
