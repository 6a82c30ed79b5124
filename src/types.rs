use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// Identifier of a playable track, kept as its full `spotify:track:<id>` URI.
///
/// Two refs are equal when the URIs are equal; nothing else is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemRef(String);

impl ItemRef {
    pub const TRACK_PREFIX: &'static str = "spotify:track:";

    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Builds a ref from a bare track id or passes a full URI through.
    pub fn from_track_id(id: &str) -> Self {
        if id.starts_with(Self::TRACK_PREFIX) {
            Self(id.to_string())
        } else {
            Self(format!("{}{}", Self::TRACK_PREFIX, id))
        }
    }

    pub fn uri(&self) -> &str {
        &self.0
    }

    /// The bare id: everything after the last `:`.
    pub fn id(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A triaged playlist or artist, persisted so the operator is asked once.
///
/// Identity is the `id` alone: a playlist renamed on Spotify is still the
/// same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRecord {
    pub id: String,
    pub name: String,
    pub include_in_shuffle: bool,
}

impl PartialEq for TriageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TriageRecord {}

impl Hash for TriageRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A playlist the operator has triaged.
pub type CollectionRef = TriageRecord;

/// A followed artist the operator has triaged.
pub type CreatorRef = TriageRecord;

/// Everything the operator has decided so far. Playlists and artists are
/// separate identity spaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub playlists: Vec<CollectionRef>,
    #[serde(default)]
    pub artists: Vec<CreatorRef>,
}

/// A playlist or artist as currently listed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntity {
    pub id: String,
    pub name: String,
    /// Number of tracks, when the listing endpoint reports it.
    pub track_total: Option<u32>,
}

/// An album reference returned by album listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
    pub artist: Option<String>,
}

/// A track together with its popularity score (0-100).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDetail {
    pub item: ItemRef,
    pub popularity: u32,
}

/// One page of a paginated endpoint.
///
/// `total` is set by offset-paginated endpoints, `next` is the cursor for
/// the following page (Spotify hands out the full URL of the next page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u32>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: Option<u32>, next: Option<String>) -> Self {
        Self { items, total, next }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            next: self.next,
        }
    }
}

#[derive(Tabled)]
pub struct TriageTableRow {
    pub name: String,
    pub id: String,
    pub shuffle: String,
}

#[derive(Tabled)]
pub struct SourceTableRow {
    pub source: String,
    pub tracks: usize,
    pub new: usize,
    pub status: String,
}

// Spotify Web API wire types. Only the fields the engine reads are mapped.

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub total: Option<u32>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CursorPaging<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowedArtistsResponse {
    pub artists: CursorPaging<Artist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSimplified {
    pub id: String,
    pub name: String,
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    pub tracks: PlaylistTracksRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrack {
    /// Null for removed or local-only entries.
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrack {
    pub track: TrackObject,
}

/// Track or episode object. Local files are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub uri: String,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackSimplified {
    pub id: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FullTrack {
    pub id: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeveralTracksResponse {
    pub tracks: Vec<Option<FullTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumSimplified {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<AlbumArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedAlbum {
    pub album: AlbumSimplified,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItemsRequest<'a> {
    pub uris: Vec<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}
