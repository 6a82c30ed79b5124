#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use shufflecli::{
    error::{PreferenceError, RemoteError},
    management::PreferenceStore,
    prompt::Prompt,
    spotify::Catalog,
    types::{AlbumRef, CollectionRef, CreatorRef, ItemRef, Page, RemoteEntity, TrackDetail, TriageRecord},
};

/// Playlist write as seen by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Replace(Vec<ItemRef>),
    Add(Vec<ItemRef>),
}

#[derive(Default)]
struct State {
    playlists: Vec<RemoteEntity>,
    playlist_items: HashMap<String, Vec<ItemRef>>,
    saved_tracks: Vec<ItemRef>,
    saved_albums: Vec<AlbumRef>,
    album_tracks: HashMap<String, Vec<ItemRef>>,
    followed: Vec<RemoteEntity>,
    artist_albums: HashMap<String, Vec<AlbumRef>>,
    popularity: HashMap<ItemRef, u32>,

    // op -> number of upcoming calls answered with 429
    rate_limits: HashMap<&'static str, u32>,
    // same, for one key only
    keyed_rate_limits: HashMap<(&'static str, u32), u32>,
    // (op, key): key is the offset for paged calls, the call index otherwise
    failures: HashSet<(&'static str, u32)>,

    calls: HashMap<&'static str, u32>,
    writes: Vec<Write>,
    cover: Option<String>,
    latency: Option<Duration>,
}

/// In-memory catalog. Behaves like the real service for the operations the
/// engine uses, counts every call and can inject 429s and failures.
#[derive(Default)]
pub struct MockCatalog {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap()
    }

    pub fn with_playlist(mut self, id: &str, name: &str, items: Vec<ItemRef>) -> Self {
        let state = self.state_mut();
        state.playlists.push(RemoteEntity {
            id: id.to_string(),
            name: name.to_string(),
            track_total: Some(items.len() as u32),
        });
        state.playlist_items.insert(id.to_string(), items);
        self
    }

    pub fn with_saved_tracks(mut self, items: Vec<ItemRef>) -> Self {
        self.state_mut().saved_tracks = items;
        self
    }

    pub fn with_saved_album(mut self, id: &str, tracks: Vec<ItemRef>) -> Self {
        let state = self.state_mut();
        state.saved_albums.push(album(id));
        state.album_tracks.insert(id.to_string(), tracks);
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str, albums: Vec<(&str, Vec<ItemRef>)>) -> Self {
        let state = self.state_mut();
        state.followed.push(RemoteEntity {
            id: id.to_string(),
            name: name.to_string(),
            track_total: None,
        });
        let mut refs = Vec::new();
        for (album_id, tracks) in albums {
            refs.push(album(album_id));
            state.album_tracks.insert(album_id.to_string(), tracks);
        }
        state.artist_albums.insert(id.to_string(), refs);
        self
    }

    pub fn with_popularity(mut self, item: &ItemRef, popularity: u32) -> Self {
        self.state_mut().popularity.insert(item.clone(), popularity);
        self
    }

    pub fn rate_limit(mut self, op: &'static str, times: u32) -> Self {
        self.state_mut().rate_limits.insert(op, times);
        self
    }

    /// Answers the next `times` calls of `op` for `key` with 429.
    pub fn rate_limit_at(mut self, op: &'static str, key: u32, times: u32) -> Self {
        self.state_mut().keyed_rate_limits.insert((op, key), times);
        self
    }

    /// Album track pages take `latency` to arrive.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.state_mut().latency = Some(latency);
        self
    }

    /// Most album track requests that were ever pending at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail(mut self, op: &'static str, key: u32) -> Self {
        self.state_mut().failures.insert((op, key));
        self
    }

    pub fn calls(&self, op: &str) -> u32 {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn playlist(&self, id: &str) -> Vec<ItemRef> {
        self.state
            .lock()
            .unwrap()
            .playlist_items
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn cover(&self) -> Option<String> {
        self.state.lock().unwrap().cover.clone()
    }

    /// Counts the call and applies injected behavior. `key` is the offset
    /// for paged calls; `None` uses the call index.
    fn enter(&self, op: &'static str, key: Option<u32>) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let index = state.calls.get(op).copied().unwrap_or(0);
        state.calls.insert(op, index + 1);

        if let Some(remaining) = state.rate_limits.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::RateLimited {
                    retry_after: Duration::from_secs(1),
                });
            }
        }

        let key = key.unwrap_or(index);
        if let Some(remaining) = state.keyed_rate_limits.get_mut(&(op, key)) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::RateLimited {
                    retry_after: Duration::from_secs(1),
                });
            }
        }

        if state.failures.contains(&(op, key)) {
            return Err(RemoteError::Status {
                operation: op.to_string(),
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn delay(&self) {
        let latency = self.with_state(|s| s.latency);
        if let Some(latency) = latency {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

fn album(id: &str) -> AlbumRef {
    AlbumRef {
        id: id.to_string(),
        name: format!("Album {}", id),
        artist: None,
    }
}

fn page<T: Clone>(all: &[T], offset: u32, limit: u32) -> Page<T> {
    let start = (offset as usize).min(all.len());
    let end = (start + limit as usize).min(all.len());
    let next = (end < all.len()).then(|| end.to_string());
    Page::new(all[start..end].to_vec(), Some(all.len() as u32), next)
}

fn cursor_offset(cursor: Option<&str>) -> u32 {
    cursor.and_then(|c| c.parse().ok()).unwrap_or(0)
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn playlist_total(&self, playlist_id: &str) -> Result<u32, RemoteError> {
        self.enter("playlist_total", None)?;
        self.with_state(|s| match s.playlist_items.get(playlist_id) {
            Some(items) => Ok(items.len() as u32),
            None => Err(RemoteError::Status {
                operation: "playlist_total".to_string(),
                status: 404,
                message: "not found".to_string(),
            }),
        })
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError> {
        self.enter("playlist_items", Some(offset))?;
        self.with_state(|s| {
            let items = s.playlist_items.get(playlist_id).cloned().unwrap_or_default();
            Ok(page(&items, offset, limit))
        })
    }

    async fn current_user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError> {
        self.enter("current_user_playlists", Some(offset))?;
        self.with_state(|s| Ok(page(&s.playlists, offset, limit)))
    }

    async fn saved_tracks(&self, offset: u32, limit: u32) -> Result<Page<ItemRef>, RemoteError> {
        self.enter("saved_tracks", Some(offset))?;
        self.with_state(|s| Ok(page(&s.saved_tracks, offset, limit)))
    }

    async fn saved_albums(&self, offset: u32, limit: u32) -> Result<Page<AlbumRef>, RemoteError> {
        self.enter("saved_albums", Some(offset))?;
        self.with_state(|s| Ok(page(&s.saved_albums, offset, limit)))
    }

    async fn followed_artists(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError> {
        let offset = cursor_offset(cursor);
        self.enter("followed_artists", Some(offset))?;
        self.with_state(|s| Ok(page(&s.followed, offset, limit)))
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<AlbumRef>, RemoteError> {
        let offset = cursor_offset(cursor);
        self.enter("artist_albums", Some(offset))?;
        self.with_state(|s| {
            let albums = s.artist_albums.get(artist_id).cloned().unwrap_or_default();
            Ok(page(&albums, offset, limit))
        })
    }

    async fn album_tracks(
        &self,
        album_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError> {
        self.enter("album_tracks", Some(offset))?;
        self.delay().await;
        self.with_state(|s| {
            let tracks = s.album_tracks.get(album_id).cloned().unwrap_or_default();
            Ok(page(&tracks, offset, limit))
        })
    }

    async fn tracks(&self, items: &[ItemRef]) -> Result<Vec<TrackDetail>, RemoteError> {
        self.enter("tracks", None)?;
        self.with_state(|s| {
            Ok(items
                .iter()
                .map(|item| TrackDetail {
                    item: item.clone(),
                    popularity: s.popularity.get(item).copied().unwrap_or(0),
                })
                .collect())
        })
    }

    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError> {
        self.enter("replace_playlist_items", None)?;
        self.with_state(|s| {
            s.writes.push(Write::Replace(items.to_vec()));
            s.playlist_items.insert(playlist_id.to_string(), items.to_vec());
        });
        Ok(())
    }

    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError> {
        self.enter("add_playlist_items", None)?;
        self.with_state(|s| {
            s.writes.push(Write::Add(items.to_vec()));
            s.playlist_items
                .entry(playlist_id.to_string())
                .or_default()
                .extend(items.iter().cloned());
        });
        Ok(())
    }

    async fn upload_playlist_cover(
        &self,
        _playlist_id: &str,
        jpeg_base64: &str,
    ) -> Result<(), RemoteError> {
        self.enter("upload_playlist_cover", None)?;
        self.with_state(|s| s.cover = Some(jpeg_base64.to_string()));
        Ok(())
    }
}

/// Preference store kept in memory; counts saves.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Vec<CollectionRef>>,
    creators: Mutex<Vec<CreatorRef>>,
    saves: Mutex<u32>,
}

impl MemoryStore {
    pub fn with_collections(records: Vec<CollectionRef>) -> Self {
        Self {
            collections: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn with_creators(records: Vec<CreatorRef>) -> Self {
        Self {
            creators: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn collections(&self) -> Vec<CollectionRef> {
        self.collections.lock().unwrap().clone()
    }

    pub fn creators(&self) -> Vec<CreatorRef> {
        self.creators.lock().unwrap().clone()
    }

    pub fn saves(&self) -> u32 {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn load_collections(&self) -> Result<Vec<CollectionRef>, PreferenceError> {
        Ok(self.collections())
    }

    async fn save_collections(&self, records: &[CollectionRef]) -> Result<(), PreferenceError> {
        *self.collections.lock().unwrap() = records.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load_creators(&self) -> Result<Vec<CreatorRef>, PreferenceError> {
        Ok(self.creators())
    }

    async fn save_creators(&self, records: &[CreatorRef]) -> Result<(), PreferenceError> {
        *self.creators.lock().unwrap() = records.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Answers from a script, then a fixed default. Records every question.
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    default: bool,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn always(answer: bool) -> Self {
        Self::new(Vec::new(), answer)
    }

    pub fn new(answers: Vec<bool>, default: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            default,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn ask(&self, question: &str) -> io::Result<bool> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(self.default))
    }
}

pub fn track(id: &str) -> ItemRef {
    ItemRef::from_track_id(id)
}

pub fn tracks(prefix: &str, count: usize) -> Vec<ItemRef> {
    (0..count).map(|i| track(&format!("{}{}", prefix, i))).collect()
}

pub fn record(id: &str, include: bool) -> TriageRecord {
    TriageRecord {
        id: id.to_string(),
        name: format!("Name {}", id),
        include_in_shuffle: include,
    }
}
